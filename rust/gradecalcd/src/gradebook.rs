use crate::calc::{deserialize_earned, parse_earned, CalcError, Earned};
use serde::{Deserialize, Serialize};
use serde_json::json;

pub const DEFAULT_GOAL: f64 = 80.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CategoryId {
    Exams,
    Quizzes,
    Assignments,
    Attendance,
    Practicums,
}

impl CategoryId {
    pub const ALL: [CategoryId; 5] = [
        CategoryId::Exams,
        CategoryId::Quizzes,
        CategoryId::Assignments,
        CategoryId::Attendance,
        CategoryId::Practicums,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            CategoryId::Exams => "exams",
            CategoryId::Quizzes => "quizzes",
            CategoryId::Assignments => "assignments",
            CategoryId::Attendance => "attendance",
            CategoryId::Practicums => "practicums",
        }
    }

    /// Exact match, like item ids.
    pub fn parse(raw: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|id| id.as_str() == raw)
    }

    pub fn bucket(self) -> Bucket {
        match self {
            CategoryId::Exams | CategoryId::Quizzes => Bucket::ExamsQuizzes,
            CategoryId::Assignments => Bucket::Assignments,
            CategoryId::Attendance => Bucket::Attendance,
            CategoryId::Practicums => Bucket::Excluded,
        }
    }
}

/// Weighted group of categories. Counted weights add up to 100.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Bucket {
    ExamsQuizzes,
    Assignments,
    Attendance,
    Excluded,
}

impl Bucket {
    pub fn weight(self) -> f64 {
        match self {
            Bucket::ExamsQuizzes => 80.0,
            Bucket::Assignments => 10.0,
            Bucket::Attendance => 10.0,
            Bucket::Excluded => 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    pub label: String,
    #[serde(default, deserialize_with = "deserialize_earned")]
    pub earned: Earned,
    pub possible: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub help: Option<String>,
    pub items: Vec<Item>,
}

/// Complete calculator state. Transitions return a new book and leave
/// `self` untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradeBook {
    pub categories: Vec<Category>,
    #[serde(default = "default_goal")]
    pub goal: f64,
}

fn default_goal() -> f64 {
    DEFAULT_GOAL
}

impl Default for GradeBook {
    fn default() -> Self {
        Self::defaults()
    }
}

impl GradeBook {
    pub fn defaults() -> Self {
        GradeBook {
            categories: vec![
                seed(
                    CategoryId::Exams,
                    "Exams (part of 80% bucket)",
                    Some("Exams + Quizzes together are 80% of your final grade. Exams total 200 pts."),
                    EXAMS,
                ),
                seed(
                    CategoryId::Quizzes,
                    "Quizzes (part of 80% bucket)",
                    Some("Quizzes total 50 pts and live in the same 80% bucket as exams."),
                    QUIZZES,
                ),
                seed(
                    CategoryId::Assignments,
                    "Assignments & Activities (10%)",
                    Some("All written work / activities counted in the 10% bucket."),
                    ASSIGNMENTS,
                ),
                seed(
                    CategoryId::Attendance,
                    "Attendance & Professionalism (10%)",
                    Some("Enter earned / possible points (usually 10 / 10)."),
                    ATTENDANCE,
                ),
                seed(
                    CategoryId::Practicums,
                    "Practicums (Pass/Fail — not counted in numeric grade)",
                    None,
                    PRACTICUMS,
                ),
            ],
            goal: DEFAULT_GOAL,
        }
    }

    pub fn category(&self, id: CategoryId) -> Option<&Category> {
        self.categories.iter().find(|c| c.id == id)
    }

    #[allow(dead_code)]
    pub fn item(&self, category: CategoryId, item_id: &str) -> Option<&Item> {
        self.category(category)?
            .items
            .iter()
            .find(|i| i.id == item_id)
    }

    pub fn set_earned(
        &self,
        category_id: &str,
        item_id: &str,
        value: &serde_json::Value,
    ) -> Result<GradeBook, CalcError> {
        self.with_earned(category_id, item_id, parse_earned(value))
    }

    /// Same as `set_earned` for a value that is already parsed.
    pub fn with_earned(
        &self,
        category_id: &str,
        item_id: &str,
        earned: Earned,
    ) -> Result<GradeBook, CalcError> {
        let Some(cid) = CategoryId::parse(category_id) else {
            return Err(CalcError::new("not_found", "category not found")
                .with_details(json!({ "categoryId": category_id })));
        };

        let mut next = self.clone();
        let item = next
            .categories
            .iter_mut()
            .find(|c| c.id == cid)
            .and_then(|c| c.items.iter_mut().find(|i| i.id == item_id));
        let Some(item) = item else {
            return Err(CalcError::new("not_found", "item not found").with_details(json!({
                "categoryId": cid.as_str(),
                "itemId": item_id
            })));
        };
        item.earned = earned;
        Ok(next)
    }

    /// Each fixed category must appear exactly once.
    pub fn check_categories(&self) -> Result<(), CalcError> {
        for id in CategoryId::ALL {
            let count = self.categories.iter().filter(|c| c.id == id).count();
            if count != 1 {
                return Err(CalcError::new(
                    "bad_params",
                    format!("category {} must appear exactly once", id.as_str()),
                )
                .with_details(json!({ "categoryId": id.as_str(), "count": count })));
            }
        }
        Ok(())
    }

    pub fn set_goal(&self, goal: f64) -> GradeBook {
        GradeBook {
            categories: self.categories.clone(),
            goal: if goal.is_finite() { goal } else { 0.0 },
        }
    }
}

pub fn reset() -> GradeBook {
    GradeBook::defaults()
}

// (id, label, seeded earned, possible)
type SeedRow = (&'static str, &'static str, Option<f64>, f64);

const EXAMS: &[SeedRow] = &[
    ("exam1", "Exam 1", None, 50.0),
    ("exam2", "Exam 2", None, 50.0),
    ("exam3", "Exam 3", None, 50.0),
    ("final", "Final Exam", None, 50.0),
];

const QUIZZES: &[SeedRow] = &[
    ("medterm", "Medical Terminology Quiz", Some(20.0), 20.0),
    ("derm", "H&P Derm Quiz", Some(4.5), 5.0),
    ("neuro", "H&P Neuro Quiz", None, 4.0),
    ("heent", "H&P HEENT Quiz", None, 5.0),
    ("cardio", "H&P Cardiology Quiz", None, 4.0),
    ("pulm", "H&P Pulmonology Quiz", None, 4.0),
    ("peds", "H&P Pediatrics Quiz", None, 4.0),
    ("lymph", "Lymphatic Quiz", None, 4.0),
];

const ASSIGNMENTS: &[SeedRow] = &[
    ("dermsoap", "Derm SOAP Note", None, 44.0),
    ("heentlymphsoap", "HEENT Lymph SOAP note", None, 44.0),
    ("neurosoap", "Neuro SOAP note", None, 44.0),
    ("cardiosoap", "Cardiology SOAP note", None, 44.0),
    ("cardiacflow", "Cardiac Blood Flow Worksheet", None, 15.0),
    ("dermmod", "Derm Modules", Some(18.0), 18.0),
    ("eyews", "Eye Worksheet", None, 11.0),
    ("murmur", "Cardiac Murmur Worksheet", None, 9.0),
    (
        "video1",
        "Student Videos #1 — Self Reflection & Provider Satisfaction",
        None,
        10.0,
    ),
    (
        "video2",
        "Video #2 — Graded SOAP Note Provider Satisfaction",
        None,
        44.0,
    ),
    ("gcd3", "GCD Chapter 3", Some(10.0), 11.0),
    ("gcd5", "GCD Chapter 5", None, 17.0),
];

const ATTENDANCE: &[SeedRow] = &[("attn", "Attendance & Professionalism", None, 10.0)];

const PRACTICUMS: &[SeedRow] = &[
    ("finalprac", "Final Practicum", None, 10.0),
    ("gvd", "General VS & Derm Practicum", None, 10.0),
    ("heentlymphprac", "HEENT & Lymph Practicum", None, 10.0),
    ("neuroprac", "Neuro Practicum", None, 10.0),
    ("cardiovesselprac", "Cardiac Vessel & Pulmonary Practicum", None, 10.0),
];

fn seed(id: CategoryId, title: &str, help: Option<&str>, rows: &[SeedRow]) -> Category {
    Category {
        id,
        title: title.to_string(),
        help: help.map(str::to_string),
        items: rows
            .iter()
            .map(|(item_id, label, earned, possible)| Item {
                id: item_id.to_string(),
                label: label.to_string(),
                earned: earned.map(Earned::Value).unwrap_or_default(),
                possible: *possible,
            })
            .collect(),
    }
}
