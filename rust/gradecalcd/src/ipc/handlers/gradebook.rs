use crate::calc::{self, parse_earned, Earned};
use crate::gradebook::{self, GradeBook};
use crate::ipc::error::{calc_err, err, ok};
use crate::ipc::types::{AppState, Request};
use serde_json::json;

struct HandlerErr {
    code: &'static str,
    message: String,
    details: Option<serde_json::Value>,
}

impl HandlerErr {
    fn response(self, id: &str) -> serde_json::Value {
        err(id, self.code, self.message, self.details)
    }
}

fn required_str<'a>(req: &'a Request, key: &str) -> Result<&'a str, HandlerErr> {
    req.params
        .get(key)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| HandlerErr {
            code: "bad_params",
            message: format!("missing {}", key),
            details: None,
        })
}

fn book_and_summary(book: &GradeBook) -> serde_json::Value {
    json!({
        "book": book,
        "summary": calc::recompute(book),
    })
}

fn handle_get(state: &mut AppState, req: &Request) -> serde_json::Value {
    ok(&req.id, book_and_summary(&state.book))
}

fn handle_set_earned(state: &mut AppState, req: &Request) -> serde_json::Value {
    let category_id = match required_str(req, "categoryId") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    let item_id = match required_str(req, "itemId") {
        Ok(v) => v,
        Err(e) => return e.response(&req.id),
    };
    // A missing value clears the cell, the same as an empty string.
    let value = req.params.get("value").cloned().unwrap_or(serde_json::Value::Null);

    let earned = parse_earned(&value);
    let next = match state.book.with_earned(category_id, item_id, earned.clone()) {
        Ok(b) => b,
        Err(e) => {
            tracing::warn!(category_id, item_id, code = %e.code, "setEarned rejected");
            return calc_err(&req.id, e);
        }
    };

    if let Earned::Invalid(raw) = &earned {
        tracing::debug!(category_id, item_id, raw = %raw, "non-numeric earned value counted as 0");
    }

    state.book = next;
    let mut result = book_and_summary(&state.book);
    result["earned"] = json!(earned);
    ok(&req.id, result)
}

fn handle_set_goal(state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(raw) = req.params.get("goal") else {
        return HandlerErr {
            code: "bad_params",
            message: "missing goal".to_string(),
            details: None,
        }
        .response(&req.id);
    };
    // Goals coerce like earned cells: blank or junk is 0.
    let goal = parse_earned(raw).points();
    state.book = state.book.set_goal(goal);
    ok(&req.id, book_and_summary(&state.book))
}

fn handle_reset(state: &mut AppState, req: &Request) -> serde_json::Value {
    state.book = gradebook::reset();
    ok(&req.id, book_and_summary(&state.book))
}

/// Stateless: the caller supplies the whole book.
fn handle_compute(_state: &mut AppState, req: &Request) -> serde_json::Value {
    let Some(raw) = req.params.get("book") else {
        return err(&req.id, "bad_params", "missing book", None);
    };
    let book: GradeBook = match serde_json::from_value(raw.clone()) {
        Ok(b) => b,
        Err(e) => {
            return err(
                &req.id,
                "bad_params",
                "book is not a valid grade book",
                Some(json!({ "reason": e.to_string() })),
            )
        }
    };
    if let Err(e) = book.check_categories() {
        return calc_err(&req.id, e);
    }
    ok(&req.id, json!({ "summary": calc::recompute(&book) }))
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "gradebook.get" => Some(handle_get(state, req)),
        "gradebook.setEarned" => Some(handle_set_earned(state, req)),
        "gradebook.setGoal" => Some(handle_set_goal(state, req)),
        "gradebook.reset" => Some(handle_reset(state, req)),
        "gradebook.compute" => Some(handle_compute(state, req)),
        _ => None,
    }
}
