use serde::Deserialize;
use uuid::Uuid;

use crate::error::{AppError, AppResult};

/// Raw list query: `?tags=<id>,<id>&ingredients=<id>`.
#[derive(Debug, Default, Deserialize)]
pub struct RecipeListQuery {
    pub tags: Option<String>,
    pub ingredients: Option<String>,
}

/// A `None` side is unfiltered; a `Some` side keeps recipes linked to any listed id.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RecipeFilter {
    pub tag_ids: Option<Vec<Uuid>>,
    pub ingredient_ids: Option<Vec<Uuid>>,
}

impl TryFrom<RecipeListQuery> for RecipeFilter {
    type Error = AppError;

    fn try_from(q: RecipeListQuery) -> AppResult<Self> {
        Ok(Self {
            tag_ids: parse_id_list("tags", q.tags.as_deref())?,
            ingredient_ids: parse_id_list("ingredients", q.ingredients.as_deref())?,
        })
    }
}

/// Splits a comma-separated id list. Blank segments are skipped and repeated ids kept once.
pub fn parse_id_list(param: &str, raw: Option<&str>) -> AppResult<Option<Vec<Uuid>>> {
    let Some(raw) = raw else {
        return Ok(None);
    };

    let mut ids: Vec<Uuid> = Vec::new();
    for part in raw.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let id = Uuid::parse_str(part)
            .map_err(|_| AppError::validation(format!("{param}: '{part}' is not a valid id")))?;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }

    if ids.is_empty() {
        return Ok(None);
    }
    Ok(Some(ids))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_or_blank_means_no_filter() {
        assert_eq!(parse_id_list("tags", None).unwrap(), None);
        assert_eq!(parse_id_list("tags", Some("")).unwrap(), None);
        assert_eq!(parse_id_list("tags", Some(" , ,")).unwrap(), None);
    }

    #[test]
    fn parses_and_dedups_ids() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let raw = format!("{a}, {b},,{a}");
        assert_eq!(parse_id_list("tags", Some(&raw)).unwrap(), Some(vec![a, b]));
    }

    #[test]
    fn malformed_id_is_validation_error() {
        let err = parse_id_list("ingredients", Some("1,2")).unwrap_err();
        match err {
            AppError::Validation(msg) => assert!(msg.starts_with("ingredients")),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn query_sides_are_independent() {
        let t = Uuid::new_v4();
        let filter = RecipeFilter::try_from(RecipeListQuery {
            tags: Some(t.to_string()),
            ingredients: None,
        })
        .unwrap();
        assert_eq!(filter.tag_ids, Some(vec![t]));
        assert_eq!(filter.ingredient_ids, None);
    }
}
