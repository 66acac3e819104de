use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::repo_types::Label;

#[derive(Debug, Deserialize)]
pub struct LabelListQuery {
    pub assigned_only: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LabelRequest {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Serialize)]
pub struct LabelResponse {
    pub id: Uuid,
    pub name: String,
}

impl From<Label> for LabelResponse {
    fn from(l: Label) -> Self {
        Self {
            id: l.id,
            name: l.name,
        }
    }
}
