//! Per-user tags and ingredients. Both live in identical tables, so a single
//! store parameterised by [`LabelKind`] serves the two.

pub mod dto;
pub mod handlers;
pub mod repo;
pub mod repo_types;
pub mod services;

pub use repo_types::{Label, LabelKind};

use crate::state::AppState;
use axum::Router;

pub fn router() -> Router<AppState> {
    handlers::routes()
}
