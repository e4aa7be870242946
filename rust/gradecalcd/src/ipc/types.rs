use serde::Deserialize;

use crate::gradebook::GradeBook;

#[derive(Debug, Deserialize, Clone)]
pub struct Request {
    pub id: String,
    pub method: String,
    #[serde(default)]
    pub params: serde_json::Value,
}

/// One session, one book. Replaced wholesale on every transition.
#[derive(Debug, Default)]
pub struct AppState {
    pub book: GradeBook,
}
