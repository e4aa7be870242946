use crate::gradebook::{Bucket, CategoryId, GradeBook, Item};
use serde::{Deserialize, Deserializer, Serialize};

/// Grading state of a single item.
///
/// `Ungraded` and `Invalid` both count as 0 earned points in every aggregate;
/// keeping them apart lets a caller tell a blank cell from a typo.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(tag = "state", content = "value", rename_all = "camelCase")]
pub enum Earned {
    #[default]
    Ungraded,
    Invalid(String),
    Value(f64),
}

impl Earned {
    pub fn points(&self) -> f64 {
        match self {
            Earned::Value(v) => *v,
            Earned::Ungraded | Earned::Invalid(_) => 0.0,
        }
    }
}

pub fn parse_earned_str(raw: &str) -> Earned {
    let t = raw.trim();
    if t.is_empty() {
        return Earned::Ungraded;
    }
    match t.parse::<f64>() {
        Ok(v) if v.is_finite() => Earned::Value(v),
        _ => Earned::Invalid(raw.to_string()),
    }
}

/// Blank/null => ungraded, numbers and numeric strings => value,
/// anything else => invalid. Never fails.
pub fn parse_earned(raw: &serde_json::Value) -> Earned {
    match raw {
        serde_json::Value::Null => Earned::Ungraded,
        serde_json::Value::String(s) => parse_earned_str(s),
        serde_json::Value::Number(n) => match n.as_f64() {
            Some(v) if v.is_finite() => Earned::Value(v),
            _ => Earned::Invalid(n.to_string()),
        },
        other => Earned::Invalid(other.to_string()),
    }
}

/// Accepts either the tagged form (`{"state": "value", "value": 4.5}`) or a
/// raw cell value (`4.5`, `"4.5"`, `""`, `null`).
pub fn deserialize_earned<'de, D>(deserializer: D) -> Result<Earned, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    if raw.get("state").is_some() {
        return serde_json::from_value(raw).map_err(serde::de::Error::custom);
    }
    Ok(parse_earned(&raw))
}

#[derive(Debug, Clone, Serialize)]
pub struct CalcError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl CalcError {
    pub fn new(code: &str, message: impl Into<String>) -> Self {
        Self {
            code: code.to_string(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Aggregate {
    pub earned_sum: f64,
    pub possible_sum: f64,
    pub percent: f64,
}

fn possible_points(item: &Item) -> f64 {
    if item.possible.is_finite() {
        item.possible
    } else {
        0.0
    }
}

/// Overflowed or undefined arithmetic reads as 0.
fn finite_or_zero(x: f64) -> f64 {
    if x.is_finite() {
        x
    } else {
        0.0
    }
}

/// `(earned / possible) * 100`, or 0 when there is nothing to divide by.
pub fn percent_of(earned: f64, possible: f64) -> f64 {
    if possible > 0.0 {
        finite_or_zero((earned / possible) * 100.0)
    } else {
        0.0
    }
}

pub fn aggregate_items(items: &[Item]) -> Aggregate {
    let (earned_sum, possible_sum) = items.iter().fold((0.0_f64, 0.0_f64), |(e, p), item| {
        (e + item.earned.points(), p + possible_points(item))
    });
    let earned_sum = finite_or_zero(earned_sum);
    let possible_sum = finite_or_zero(possible_sum);
    Aggregate {
        earned_sum,
        possible_sum,
        percent: percent_of(earned_sum, possible_sum),
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSummary {
    pub id: String,
    pub label: String,
    pub earned: Earned,
    pub possible: f64,
    pub percent: f64,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategorySummary {
    pub id: CategoryId,
    pub title: String,
    pub bucket: Bucket,
    pub excluded: bool,
    pub earned_sum: f64,
    pub possible_sum: f64,
    pub percent: f64,
    pub items: Vec<ItemSummary>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BucketSummary {
    pub bucket: Bucket,
    pub weight: f64,
    pub bucket_earned: f64,
    pub bucket_points: f64,
    pub bucket_pct: f64,
    pub contribution: f64,
}

impl BucketSummary {
    fn pooled(bucket: Bucket, parts: &[&CategorySummary]) -> Self {
        let bucket_earned = finite_or_zero(parts.iter().map(|c| c.earned_sum).sum());
        let bucket_points = finite_or_zero(parts.iter().map(|c| c.possible_sum).sum());
        let bucket_pct = percent_of(bucket_earned, bucket_points);
        let weight = bucket.weight();
        BucketSummary {
            bucket,
            weight,
            bucket_earned,
            bucket_points,
            bucket_pct,
            contribution: finite_or_zero((bucket_pct / 100.0) * weight),
        }
    }
}

/// Rounded strings for the summary card.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryDisplay {
    pub exams_quizzes_pct: String,
    pub exams_quizzes_contribution: String,
    pub assignments_pct: String,
    pub assignments_contribution: String,
    pub attendance_pct: String,
    pub attendance_contribution: String,
    pub overall: String,
    pub needed_bucket_pct: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub categories: Vec<CategorySummary>,
    pub exams_quizzes: BucketSummary,
    pub assignments: BucketSummary,
    pub attendance: BucketSummary,
    pub overall: f64,
    pub goal: f64,
    pub needed_bucket_pct: f64,
    pub display: SummaryDisplay,
}

impl Summary {
    #[allow(dead_code)]
    pub fn category(&self, id: CategoryId) -> Option<&CategorySummary> {
        self.categories.iter().find(|c| c.id == id)
    }
}

fn summarize_category(id: CategoryId, book: &GradeBook) -> CategorySummary {
    let bucket = id.bucket();
    let Some(category) = book.category(id) else {
        return CategorySummary {
            id,
            title: id.as_str().to_string(),
            bucket,
            excluded: bucket == Bucket::Excluded,
            earned_sum: 0.0,
            possible_sum: 0.0,
            percent: 0.0,
            items: Vec::new(),
        };
    };

    let agg = aggregate_items(&category.items);
    let items = category
        .items
        .iter()
        .map(|item| {
            let e = item.earned.points();
            let p = possible_points(item);
            ItemSummary {
                id: item.id.clone(),
                label: item.label.clone(),
                earned: item.earned.clone(),
                possible: item.possible,
                percent: if p > 0.0 { finite_or_zero((100.0 * e) / p) } else { 0.0 },
            }
        })
        .collect();

    CategorySummary {
        id,
        title: category.title.clone(),
        bucket,
        excluded: bucket == Bucket::Excluded,
        earned_sum: agg.earned_sum,
        possible_sum: agg.possible_sum,
        percent: agg.percent,
        items,
    }
}

/// Exams+Quizzes percentage at which the overall grade lands exactly on
/// `goal`. Not clamped: the result may be negative or above 100.
pub fn needed_bucket_pct(assign_pct: f64, attn_pct: f64, goal: f64) -> f64 {
    finite_or_zero((goal - 0.1 * assign_pct - 0.1 * attn_pct) / 0.8)
}

pub fn recompute(book: &GradeBook) -> Summary {
    let categories: Vec<CategorySummary> = CategoryId::ALL
        .iter()
        .map(|id| summarize_category(*id, book))
        .collect();

    let in_bucket = |bucket: Bucket| -> Vec<&CategorySummary> {
        categories.iter().filter(|c| c.bucket == bucket).collect()
    };
    let exams_quizzes = BucketSummary::pooled(Bucket::ExamsQuizzes, &in_bucket(Bucket::ExamsQuizzes));
    let assignments = BucketSummary::pooled(Bucket::Assignments, &in_bucket(Bucket::Assignments));
    let attendance = BucketSummary::pooled(Bucket::Attendance, &in_bucket(Bucket::Attendance));

    let overall = finite_or_zero(
        exams_quizzes.contribution + assignments.contribution + attendance.contribution,
    );
    let needed = needed_bucket_pct(assignments.bucket_pct, attendance.bucket_pct, book.goal);

    let display = SummaryDisplay {
        exams_quizzes_pct: format_percent(exams_quizzes.bucket_pct),
        exams_quizzes_contribution: format!(
            "+{} pts toward 100",
            format_points(exams_quizzes.contribution)
        ),
        assignments_pct: format_percent(assignments.bucket_pct),
        assignments_contribution: format!("+{} pts", format_points(assignments.contribution)),
        attendance_pct: format_percent(attendance.bucket_pct),
        attendance_contribution: format!("+{} pts", format_points(attendance.contribution)),
        overall: format!("{}%", format_points(overall)),
        needed_bucket_pct: format_percent(needed),
    };

    Summary {
        categories,
        exams_quizzes,
        assignments,
        attendance,
        overall,
        goal: book.goal,
        needed_bucket_pct: needed,
        display,
    }
}

/// Two decimals; non-finite renders as `0.00`. Negative zero prints
/// unsigned, small negatives keep their sign (`-0.001` => `-0.00`).
pub fn format_points(n: f64) -> String {
    if !n.is_finite() || n == 0.0 {
        return "0.00".to_string();
    }
    format!("{:.2}", n)
}

pub fn format_percent(n: f64) -> String {
    format!("{}%", format_points(n))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    fn all_ungraded() -> GradeBook {
        let mut book = GradeBook::defaults();
        for c in &mut book.categories {
            for item in &mut c.items {
                item.earned = Earned::Ungraded;
            }
        }
        book
    }

    fn set(book: &GradeBook, cat: &str, item: &str, value: serde_json::Value) -> GradeBook {
        book.set_earned(cat, item, &value).expect("set earned")
    }

    #[test]
    fn parse_tags_blank_invalid_and_numbers() {
        assert_eq!(parse_earned(&json!("")), Earned::Ungraded);
        assert_eq!(parse_earned(&json!("   ")), Earned::Ungraded);
        assert_eq!(parse_earned(&json!(null)), Earned::Ungraded);
        assert_eq!(parse_earned(&json!("4.5")), Earned::Value(4.5));
        assert_eq!(parse_earned(&json!(" 12 ")), Earned::Value(12.0));
        assert_eq!(parse_earned(&json!(4.5)), Earned::Value(4.5));
        assert_eq!(parse_earned(&json!("abc")), Earned::Invalid("abc".to_string()));
        assert_eq!(parse_earned(&json!("inf")), Earned::Invalid("inf".to_string()));
        assert!(matches!(parse_earned(&json!(true)), Earned::Invalid(_)));
    }

    #[test]
    fn ungraded_and_invalid_contribute_nothing() {
        let book = set(&all_ungraded(), "exams", "exam1", json!("abc"));
        let book = set(&book, "exams", "exam2", json!(""));
        let s = recompute(&book);
        let exams = s.category(CategoryId::Exams).expect("exams");
        assert_eq!(exams.earned_sum, 0.0);
        assert_eq!(exams.possible_sum, 200.0);
        assert_eq!(exams.percent, 0.0);
    }

    #[test]
    fn empty_category_percent_is_zero() {
        let mut book = GradeBook::defaults();
        for c in &mut book.categories {
            c.items.clear();
        }
        let s = recompute(&book);
        for c in &s.categories {
            assert_eq!(c.possible_sum, 0.0);
            assert_eq!(c.percent, 0.0);
        }
        assert_eq!(s.exams_quizzes.bucket_pct, 0.0);
        assert_eq!(s.overall, 0.0);
    }

    #[test]
    fn all_ungraded_overall_is_zero() {
        let s = recompute(&all_ungraded());
        assert_eq!(s.overall, 0.0);
        assert_eq!(s.display.overall, "0.00%");
        assert!(close(s.needed_bucket_pct, 100.0));
    }

    #[test]
    fn bucket_pools_points_rather_than_averaging() {
        // One full exam (50/50) and one empty quiz set: pooled 50/250 = 20%,
        // while averaging the two category percents would give 12.5%.
        let book = set(&all_ungraded(), "exams", "exam1", json!(50));
        let book = set(&book, "quizzes", "medterm", json!(0));
        let s = recompute(&book);
        let exams = s.category(CategoryId::Exams).expect("exams");
        let quizzes = s.category(CategoryId::Quizzes).expect("quizzes");
        assert!(close(exams.percent, 25.0));
        assert!(close(quizzes.percent, 0.0));
        assert!(close(s.exams_quizzes.bucket_pct, 20.0));
        assert!(!close(s.exams_quizzes.bucket_pct, (exams.percent + quizzes.percent) / 2.0));
        assert_eq!(s.exams_quizzes.bucket_points, 250.0);
    }

    #[test]
    fn overall_is_weighted_sum_of_buckets() {
        let book = set(&GradeBook::defaults(), "exams", "exam1", json!(41));
        let book = set(&book, "attendance", "attn", json!(9));
        let book = set(&book, "assignments", "eyews", json!(7.25));
        let s = recompute(&book);
        let expected = 0.8 * s.exams_quizzes.bucket_pct
            + 0.1 * s.assignments.bucket_pct
            + 0.1 * s.attendance.bucket_pct;
        assert!(close(s.overall, expected));
    }

    #[test]
    fn practicums_never_move_overall() {
        let base = recompute(&GradeBook::defaults());
        let mut book = GradeBook::defaults();
        for id in ["finalprac", "gvd", "heentlymphprac", "neuroprac", "cardiovesselprac"] {
            book = set(&book, "practicums", id, json!(10));
        }
        let s = recompute(&book);
        let prac = s.category(CategoryId::Practicums).expect("practicums");
        assert!(prac.excluded);
        assert!(close(prac.percent, 100.0));
        assert_eq!(s.overall, base.overall);
    }

    #[test]
    fn needed_bucket_pct_round_trips_to_goal() {
        for (assign, attn, goal) in [(9.0, 0.0, 80.0), (100.0, 100.0, 90.0), (55.5, 70.0, 65.0)] {
            let b = needed_bucket_pct(assign, attn, goal);
            let overall = (b / 100.0) * 80.0 + (assign / 100.0) * 10.0 + (attn / 100.0) * 10.0;
            assert!(close(overall, goal), "goal {goal} got {overall}");
        }
    }

    #[test]
    fn needed_bucket_pct_is_not_clamped() {
        assert!(needed_bucket_pct(100.0, 100.0, 10.0) < 0.0);
        assert!(needed_bucket_pct(0.0, 0.0, 100.0) > 100.0);
        assert_eq!(needed_bucket_pct(0.0, 0.0, f64::NAN), 0.0);
    }

    #[test]
    fn seeded_exams_full_regression_fixture() {
        let mut book = GradeBook::defaults();
        for id in ["exam1", "exam2", "exam3", "final"] {
            book = set(&book, "exams", id, json!(50));
        }
        let s = recompute(&book);
        assert_eq!(s.exams_quizzes.bucket_earned, 224.5);
        assert_eq!(s.exams_quizzes.bucket_points, 250.0);
        assert!(close(s.exams_quizzes.bucket_pct, 89.8));
        assert!(close(s.exams_quizzes.contribution, 71.84));
        assert!(close(s.assignments.bucket_pct, 2800.0 / 311.0));
        assert_eq!(s.attendance.contribution, 0.0);
        assert!(close(s.overall, 71.84 + 280.0 / 311.0));
        assert_eq!(s.display.overall, "72.74%");
        assert_eq!(s.display.exams_quizzes_pct, "89.80%");
        assert_eq!(s.display.exams_quizzes_contribution, "+71.84 pts toward 100");
    }

    #[test]
    fn extra_credit_is_not_clamped() {
        let book = set(&all_ungraded(), "attendance", "attn", json!(15));
        let book = set(&book, "exams", "exam1", json!(500));
        let s = recompute(&book);
        assert!(close(s.attendance.bucket_pct, 150.0));
        assert!(s.exams_quizzes.bucket_pct > 100.0);
        assert!(s.overall > 100.0);
    }

    #[test]
    fn overflowing_sums_stay_finite() {
        let mut book = all_ungraded();
        for (cat, item, v) in [
            ("exams", "exam1", "1e308"),
            ("exams", "exam2", "1e308"),
            ("quizzes", "neuro", "-1e308"),
            ("quizzes", "heent", "-1e308"),
        ] {
            book = set(&book, cat, item, json!(v));
        }
        let s = recompute(&book);
        let numbers = [
            s.overall,
            s.needed_bucket_pct,
            s.exams_quizzes.bucket_earned,
            s.exams_quizzes.bucket_pct,
            s.exams_quizzes.contribution,
        ];
        assert!(numbers.iter().all(|n| n.is_finite()), "{numbers:?}");
        for c in &s.categories {
            assert!(c.earned_sum.is_finite() && c.percent.is_finite());
            assert!(c.items.iter().all(|i| i.percent.is_finite()));
        }

        let text = serde_json::to_value(&s).expect("serialize summary");
        assert!(text.pointer("/overall").and_then(|v| v.as_f64()).is_some());
        assert!(text
            .pointer("/examsQuizzes/bucketPct")
            .and_then(|v| v.as_f64())
            .is_some());
    }

    #[test]
    fn item_rows_carry_their_own_percent() {
        let s = recompute(&GradeBook::defaults());
        let quizzes = s.category(CategoryId::Quizzes).expect("quizzes");
        let derm = quizzes.items.iter().find(|i| i.id == "derm").expect("derm");
        assert!(close(derm.percent, 90.0));
        let neuro = quizzes.items.iter().find(|i| i.id == "neuro").expect("neuro");
        assert_eq!(neuro.percent, 0.0);
    }

    #[test]
    fn formatting_matches_card_strings() {
        assert_eq!(format_points(71.84), "71.84");
        assert_eq!(format_points(f64::INFINITY), "0.00");
        assert_eq!(format_points(-0.0), "0.00");
        assert_eq!(format_points(-0.001), "-0.00");
        assert_eq!(format_points(-12.345678), "-12.35");
        assert_eq!(format_percent(f64::NAN), "0.00%");
        assert_eq!(format_percent(9.003215434), "9.00%");
    }

    #[test]
    fn earned_deserializes_from_raw_or_tagged() {
        let item: Item = serde_json::from_value(json!({
            "id": "x", "label": "X", "earned": "7", "possible": 10
        }))
        .expect("raw earned");
        assert_eq!(item.earned, Earned::Value(7.0));

        let item: Item = serde_json::from_value(json!({
            "id": "x", "label": "X", "earned": {"state": "invalid", "value": "7a"}, "possible": 10
        }))
        .expect("tagged earned");
        assert_eq!(item.earned, Earned::Invalid("7a".to_string()));

        let item: Item = serde_json::from_value(json!({
            "id": "x", "label": "X", "possible": 10
        }))
        .expect("missing earned");
        assert_eq!(item.earned, Earned::Ungraded);
    }
}
