use serde::{Deserialize, Serialize};

/// Report visibility scope for an authenticated user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OperatorRole {
    Admin,
    Operator,
}

/// Identity of the person submitting readings.
///
/// Authentication happens outside this crate; the embedder hands the
/// already-verified identity in.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Operator {
    pub id: String,
    pub name: String,
    pub role: OperatorRole,
}

impl Operator {
    pub fn new(id: impl Into<String>, name: impl Into<String>, role: OperatorRole) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            role,
        }
    }
}
