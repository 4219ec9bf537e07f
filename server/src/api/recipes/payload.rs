//! Request body shared by create, full update and partial update.

use bigdecimal::BigDecimal;
use recipebox_core::validation::{self, REQUIRED};
use recipebox_core::{dedupe_names, FieldErrors, LabelKind, RecipeChanges, RecipeDraft};
use serde::Deserialize;
use serde_json::Value;
use std::str::FromStr;
use utoipa::ToSchema;

const INVALID_STRING: &str = "Not a valid string.";
const INVALID_INTEGER: &str = "A valid integer is required.";
const INVALID_NUMBER: &str = "A valid number is required.";
const EXPECTED_LIST: &str = "Expected a list of items.";
const EXPECTED_OBJECT: &str = "Invalid data. Expected an object with a name.";

/// A `{name}` entry in the `tags` / `ingredients` lists
#[derive(Debug, Clone, ToSchema)]
pub struct NamePayload {
    pub name: String,
}

/// Recipe fields accepted on writes.
///
/// Every field is optional at the wire level; which ones are required depends
/// on the operation. Unknown keys such as `user` or `id` are ignored. Values
/// are kept as raw JSON so a wrongly typed field is reported under its own
/// key instead of rejecting the whole body.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct RecipePayload {
    #[schema(value_type = Option<String>, example = "Beef Stew")]
    pub title: Option<Value>,
    /// Whole minutes, as a JSON integer or an integer string
    #[schema(value_type = Option<i64>, example = 30)]
    pub time_minutes: Option<Value>,
    /// Decimal string such as `"5.50"`, or a JSON number
    #[schema(value_type = Option<String>, example = "5.50")]
    pub price: Option<Value>,
    #[schema(value_type = Option<String>)]
    pub link: Option<Value>,
    #[schema(value_type = Option<String>)]
    pub description: Option<Value>,
    /// Replaces all tags when present, `[]` clears them
    #[schema(value_type = Option<Vec<NamePayload>>)]
    pub tags: Option<Value>,
    /// Replaces all ingredients when present, `[]` clears them
    #[schema(value_type = Option<Vec<NamePayload>>)]
    pub ingredients: Option<Value>,
}

/// How strictly to treat missing fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// POST and PUT: title, time_minutes and price must be present
    Full,
    /// PATCH: anything may be omitted
    Partial,
}

/// Strings pass through; numbers are accepted in their decimal form.
fn parse_text(errors: &mut FieldErrors, field: &str, raw: &Value) -> Option<String> {
    match raw {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => {
            errors.add(field, INVALID_STRING);
            None
        }
    }
}

fn parse_integer(errors: &mut FieldErrors, field: &str, raw: &Value) -> Option<i64> {
    let parsed = match raw {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    if parsed.is_none() {
        errors.add(field, INVALID_INTEGER);
    }
    parsed
}

fn parse_price(errors: &mut FieldErrors, raw: &Value) -> Option<BigDecimal> {
    let parsed = match raw {
        Value::String(s) => BigDecimal::from_str(s.trim()).ok(),
        Value::Number(n) => BigDecimal::from_str(&n.to_string()).ok(),
        _ => None,
    };
    match parsed {
        Some(value) => validation::price(errors, &value),
        None => {
            errors.add("price", INVALID_NUMBER);
            None
        }
    }
}

fn label_name(
    errors: &mut FieldErrors,
    kind: LabelKind,
    index: usize,
    entry: &Value,
) -> Option<String> {
    let item = format!("{}[{}]", kind.field(), index);
    let Value::Object(fields) = entry else {
        errors.add(item, EXPECTED_OBJECT);
        return None;
    };

    let field = format!("{}.name", item);
    match fields.get("name") {
        None | Some(Value::Null) => {
            errors.add(field, REQUIRED);
            None
        }
        Some(raw) => {
            let name = parse_text(errors, &field, raw)?;
            validation::label_name(errors, &field, &name)
        }
    }
}

fn label_names(
    errors: &mut FieldErrors,
    kind: LabelKind,
    raw: Option<&Value>,
) -> Option<Vec<String>> {
    let Value::Array(entries) = raw? else {
        errors.add(kind.field(), EXPECTED_LIST);
        return None;
    };

    let names: Vec<String> = entries
        .iter()
        .enumerate()
        .filter_map(|(i, entry)| label_name(errors, kind, i, entry))
        .collect();
    Some(dedupe_names(names))
}

impl RecipePayload {
    /// Validate every present field, collecting all errors.
    pub fn into_changes(self, mode: Mode) -> Result<RecipeChanges, FieldErrors> {
        let mut errors = FieldErrors::new();

        if mode == Mode::Full {
            if self.title.is_none() {
                errors.add("title", REQUIRED);
            }
            if self.time_minutes.is_none() {
                errors.add("time_minutes", REQUIRED);
            }
            if self.price.is_none() {
                errors.add("price", REQUIRED);
            }
        }

        let title = self
            .title
            .as_ref()
            .and_then(|raw| parse_text(&mut errors, "title", raw))
            .and_then(|title| validation::title(&mut errors, &title));
        let time_minutes = self
            .time_minutes
            .as_ref()
            .and_then(|raw| parse_integer(&mut errors, "time_minutes", raw))
            .and_then(|minutes| validation::time_minutes(&mut errors, minutes));
        let price = self
            .price
            .as_ref()
            .and_then(|price| parse_price(&mut errors, price));
        let link = self
            .link
            .as_ref()
            .and_then(|raw| parse_text(&mut errors, "link", raw))
            .and_then(|link| validation::link(&mut errors, &link));
        let description = self
            .description
            .as_ref()
            .and_then(|raw| parse_text(&mut errors, "description", raw))
            .map(|d| d.trim().to_string());
        let tags = label_names(&mut errors, LabelKind::Tag, self.tags.as_ref());
        let ingredients =
            label_names(&mut errors, LabelKind::Ingredient, self.ingredients.as_ref());

        errors.into_result(RecipeChanges {
            title,
            time_minutes,
            price,
            link,
            description,
            tags,
            ingredients,
        })
    }

    /// Validate for creation: required fields present, relations default to empty.
    pub fn into_draft(self) -> Result<RecipeDraft, FieldErrors> {
        let changes = self.into_changes(Mode::Full)?;
        match (changes.title, changes.time_minutes, changes.price) {
            (Some(title), Some(time_minutes), Some(price)) => Ok(RecipeDraft {
                title,
                time_minutes,
                price,
                link: changes.link.unwrap_or_default(),
                description: changes.description.unwrap_or_default(),
                tags: changes.tags.unwrap_or_default(),
                ingredients: changes.ingredients.unwrap_or_default(),
            }),
            // into_changes(Full) already rejected missing required fields
            _ => Err(FieldErrors::single("non_field_errors", REQUIRED)),
        }
    }
}
