//! Validated write shapes for the recipe aggregate.
//!
//! The server turns wire payloads into these types; stores only ever see
//! values that already passed validation.

use bigdecimal::BigDecimal;

/// Which of the two per-user label tables a name belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LabelKind {
    Tag,
    Ingredient,
}

impl LabelKind {
    /// Singular noun used in error messages ("Tag not found").
    pub fn display_name(self) -> &'static str {
        match self {
            LabelKind::Tag => "Tag",
            LabelKind::Ingredient => "Ingredient",
        }
    }

    /// Payload key holding this relation on a recipe.
    pub fn field(self) -> &'static str {
        match self {
            LabelKind::Tag => "tags",
            LabelKind::Ingredient => "ingredients",
        }
    }
}

/// Everything needed to insert a new recipe.
#[derive(Debug, Clone, PartialEq)]
pub struct RecipeDraft {
    pub title: String,
    pub time_minutes: i32,
    pub price: BigDecimal,
    pub link: String,
    pub description: String,
    pub tags: Vec<String>,
    pub ingredients: Vec<String>,
}

/// A partial update. `None` means "leave untouched".
///
/// For the relations, `Some(vec![])` clears the association set while `None`
/// keeps it as is.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecipeChanges {
    pub title: Option<String>,
    pub time_minutes: Option<i32>,
    pub price: Option<BigDecimal>,
    pub link: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    pub ingredients: Option<Vec<String>>,
}

impl RecipeChanges {
    pub fn labels(&self, kind: LabelKind) -> Option<&[String]> {
        match kind {
            LabelKind::Tag => self.tags.as_deref(),
            LabelKind::Ingredient => self.ingredients.as_deref(),
        }
    }
}

impl RecipeDraft {
    pub fn labels(&self, kind: LabelKind) -> &[String] {
        match kind {
            LabelKind::Tag => &self.tags,
            LabelKind::Ingredient => &self.ingredients,
        }
    }
}

/// Drops repeated names while keeping first-seen order.
///
/// Get-or-create on a repeated name resolves to the same row, so attaching it
/// twice would only produce a duplicate association.
pub fn dedupe_names(names: Vec<String>) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    names
        .into_iter()
        .filter(|name| seen.insert(name.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dedupe_keeps_first_order() {
        let names = vec![
            "b".to_string(),
            "a".to_string(),
            "b".to_string(),
            "c".to_string(),
        ];
        assert_eq!(dedupe_names(names), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_dedupe_is_case_sensitive() {
        let names = vec!["Salt".to_string(), "salt".to_string()];
        assert_eq!(dedupe_names(names).len(), 2);
    }

    #[test]
    fn test_changes_distinguish_absent_from_empty() {
        let untouched = RecipeChanges::default();
        assert_eq!(untouched.labels(LabelKind::Tag), None);

        let cleared = RecipeChanges {
            tags: Some(vec![]),
            ..Default::default()
        };
        assert_eq!(cleared.labels(LabelKind::Tag), Some(&[][..]));
        assert_eq!(cleared.labels(LabelKind::Ingredient), None);
    }
}
