//! Recipe list filters parsed from query parameters.

use crate::validation::FieldErrors;

/// Restrictions applied to a recipe listing.
///
/// Each axis is independent; `None` means no restriction on that axis, and a
/// recipe matches an axis when it is attached to any of the listed ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RecipeFilter {
    pub tags: Option<Vec<i64>>,
    pub ingredients: Option<Vec<i64>>,
}

impl RecipeFilter {
    /// Build a filter from the raw `tags` / `ingredients` query values.
    ///
    /// A parameter that is blank or only commas applies no restriction.
    pub fn from_params(
        tags: Option<&str>,
        ingredients: Option<&str>,
    ) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::new();
        let tags = parse_axis(&mut errors, "tags", tags);
        let ingredients = parse_axis(&mut errors, "ingredients", ingredients);
        errors.into_result(Self { tags, ingredients })
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_none() && self.ingredients.is_none()
    }
}

fn parse_axis(errors: &mut FieldErrors, field: &str, raw: Option<&str>) -> Option<Vec<i64>> {
    match parse_id_list(raw?) {
        Ok(ids) if ids.is_empty() => None,
        Ok(ids) => Some(ids),
        Err(message) => {
            errors.add(field, message);
            None
        }
    }
}

/// Parse `"1,2, 3"` into ids. Empty segments are skipped, so a trailing
/// comma is harmless; anything non-numeric is an error.
pub fn parse_id_list(raw: &str) -> Result<Vec<i64>, String> {
    let mut ids = Vec::new();
    for segment in raw.split(',') {
        let segment = segment.trim();
        if segment.is_empty() {
            continue;
        }
        let id = segment
            .parse::<i64>()
            .map_err(|_| format!("Invalid id: {:?}. Expected comma-separated integers.", segment))?;
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id_list() {
        assert_eq!(parse_id_list("1,2").unwrap(), vec![1, 2]);
        assert_eq!(parse_id_list(" 3 , 4,").unwrap(), vec![3, 4]);
        assert_eq!(parse_id_list("5,5").unwrap(), vec![5]);
        assert!(parse_id_list("").unwrap().is_empty());
    }

    #[test]
    fn test_parse_id_list_rejects_garbage() {
        assert!(parse_id_list("1,two").is_err());
        assert!(parse_id_list("1.5").is_err());
    }

    #[test]
    fn test_filter_absent_params() {
        let filter = RecipeFilter::from_params(None, None).unwrap();
        assert!(filter.is_empty());
    }

    #[test]
    fn test_filter_axes_independent() {
        let filter = RecipeFilter::from_params(Some("1,2"), None).unwrap();
        assert_eq!(filter.tags, Some(vec![1, 2]));
        assert_eq!(filter.ingredients, None);
    }

    #[test]
    fn test_filter_blank_param_is_unrestricted() {
        let filter = RecipeFilter::from_params(Some(""), Some(",")).unwrap();
        assert!(filter.is_empty());
    }

    #[test]
    fn test_filter_reports_each_bad_axis() {
        let errors = RecipeFilter::from_params(Some("x"), Some("y")).unwrap_err();
        assert!(errors.contains("tags"));
        assert!(errors.contains("ingredients"));
    }
}
