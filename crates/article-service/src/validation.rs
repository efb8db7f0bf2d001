use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};
use std::fmt;
use thiserror::Error;

pub const TITLE_MAX_CHARS: usize = 255;

/// Write payload that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ArticleFields {
    pub title: String,
    pub content: String,
    /// `None` when the key was absent from the request body
    pub published: Option<bool>,
}

/// Per-field validation failures, kept in the order the fields were checked.
#[derive(Error, Debug, Default, Clone, PartialEq)]
pub struct ValidationErrors {
    fields: Vec<(&'static str, Vec<String>)>,
}

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, field: &'static str, message: String) {
        match self.fields.iter_mut().find(|(name, _)| *name == field) {
            Some((_, messages)) => messages.push(message),
            None => self.fields.push((field, vec![message])),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.iter().map(|(_, messages)| messages.len()).sum()
    }

    pub fn get(&self, field: &str) -> Option<&[String]> {
        self.fields
            .iter()
            .find(|(name, _)| *name == field)
            .map(|(_, messages)| messages.as_slice())
    }

    pub fn contains(&self, field: &str) -> bool {
        self.get(field).is_some()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let Some(first) = self.fields.first().and_then(|(_, m)| m.first()) else {
            return write!(f, "The given data was invalid.");
        };

        write!(f, "{first}")?;

        match self.len() - 1 {
            0 => Ok(()),
            1 => write!(f, " (and 1 more error)"),
            n => write!(f, " (and {n} more errors)"),
        }
    }
}

impl Serialize for ValidationErrors {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.fields.len()))?;
        for (field, messages) in &self.fields {
            map.serialize_entry(field, messages)?;
        }
        map.end()
    }
}

fn required_message(field: &str) -> String {
    format!("The {field} field is required.")
}

fn string_message(field: &str) -> String {
    format!("The {field} field must be a string.")
}

/// Absent, null, blank strings and empty collections all count as missing.
/// String inputs are trimmed before any other check and stored trimmed.
fn is_missing(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => true,
        Some(Value::String(s)) => s.trim().is_empty(),
        Some(Value::Array(items)) => items.is_empty(),
        Some(Value::Object(entries)) => entries.is_empty(),
        Some(_) => false,
    }
}

fn validate_title(body: &Map<String, Value>, errors: &mut ValidationErrors) -> Option<String> {
    let value = body.get("title");
    if is_missing(value) {
        errors.add("title", required_message("title"));
        return None;
    }

    let Some(Value::String(title)) = value else {
        errors.add("title", string_message("title"));
        return None;
    };

    let title = title.trim();
    if title.chars().count() > TITLE_MAX_CHARS {
        errors.add(
            "title",
            format!("The title field must not be greater than {TITLE_MAX_CHARS} characters."),
        );
        return None;
    }

    Some(title.to_string())
}

fn validate_content(body: &Map<String, Value>, errors: &mut ValidationErrors) -> Option<String> {
    let value = body.get("content");
    if is_missing(value) {
        errors.add("content", required_message("content"));
        return None;
    }

    match value {
        Some(Value::String(content)) => Some(content.trim().to_string()),
        Some(scalar @ (Value::Number(_) | Value::Bool(_))) => Some(scalar.to_string()),
        _ => {
            errors.add("content", string_message("content"));
            None
        }
    }
}

/// Accepts the same literals a form checkbox or JSON client would send.
pub fn coerce_bool(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::Number(n) => match n.as_u64() {
            Some(0) => Some(false),
            Some(1) => Some(true),
            _ => None,
        },
        Value::String(s) => match s.trim() {
            "0" => Some(false),
            "1" => Some(true),
            _ => None,
        },
        _ => None,
    }
}

fn validate_published(
    body: &Map<String, Value>,
    errors: &mut ValidationErrors,
) -> Option<Option<bool>> {
    let Some(value) = body.get("published") else {
        return Some(None);
    };

    match coerce_bool(value) {
        Some(published) => Some(Some(published)),
        None => {
            errors.add(
                "published",
                "The published field must be true or false.".to_string(),
            );
            None
        }
    }
}

/// Checks a create/update body against the article schema. Every field is
/// checked so the caller gets the complete set of failures at once.
pub fn validate_article(body: &Value) -> Result<ArticleFields, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let empty = Map::new();
    let object = match body {
        Value::Object(object) => object,
        _ => &empty,
    };

    let title = validate_title(object, &mut errors);
    let content = validate_content(object, &mut errors);
    let published = validate_published(object, &mut errors);

    match (title, content, published) {
        (Some(title), Some(content), Some(published)) if errors.is_empty() => Ok(ArticleFields {
            title,
            content,
            published,
        }),
        _ => Err(errors),
    }
}
