use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::repo_types::{RecipeFields, RecipeView};
use super::services::RecipeWrite;
use crate::labels::dto::LabelResponse;

#[derive(Debug, Deserialize)]
pub struct LabelName {
    pub name: String,
}

/// Create/update body. Unknown fields, an owner field included, are ignored.
#[derive(Debug, Default, Deserialize)]
pub struct RecipeRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub time_minutes: Option<i32>,
    pub price: Option<Decimal>,
    pub link: Option<String>,
    pub tags: Option<Vec<LabelName>>,
    pub ingredients: Option<Vec<LabelName>>,
}

impl From<RecipeRequest> for RecipeWrite {
    fn from(r: RecipeRequest) -> Self {
        let names = |v: Option<Vec<LabelName>>| -> Option<Vec<String>> {
            v.map(|v| v.into_iter().map(|l| l.name).collect())
        };
        RecipeWrite {
            fields: RecipeFields {
                title: r.title,
                description: r.description,
                time_minutes: r.time_minutes,
                price: r.price,
                link: r.link,
            },
            tags: names(r.tags),
            ingredients: names(r.ingredients),
        }
    }
}

/// List item.
#[derive(Debug, Serialize)]
pub struct RecipeSummary {
    pub id: Uuid,
    pub title: String,
    pub time_minutes: i32,
    pub price: Decimal,
    pub link: String,
    pub tags: Vec<LabelResponse>,
    pub ingredients: Vec<LabelResponse>,
}

#[derive(Debug, Serialize)]
pub struct RecipeDetail {
    #[serde(flatten)]
    pub summary: RecipeSummary,
    pub description: String,
    pub image: Option<String>, // presigned URL
}

#[derive(Debug, Serialize)]
pub struct RecipeImageResponse {
    pub id: Uuid,
    pub image: Option<String>,
}

impl From<RecipeView> for RecipeSummary {
    fn from(v: RecipeView) -> Self {
        Self {
            id: v.recipe.id,
            title: v.recipe.title,
            time_minutes: v.recipe.time_minutes,
            price: v.recipe.price,
            link: v.recipe.link,
            tags: v.tags.into_iter().map(LabelResponse::from).collect(),
            ingredients: v.ingredients.into_iter().map(LabelResponse::from).collect(),
        }
    }
}

impl RecipeDetail {
    pub fn new(view: RecipeView, image: Option<String>) -> Self {
        let description = view.recipe.description.clone();
        Self {
            summary: view.into(),
            description,
            image,
        }
    }
}
