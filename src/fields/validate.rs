//! Field validation ahead of any create/update.
//!
//! Violations are collected across every supplied field and returned
//! together as field-name -> message list; validation never stops at the
//! first failure. Messages are stable wire contract and safe to display.

use crate::fields::codec::{self, extract_id, normalize_color, parse_date, parse_datetime, parse_time};
use crate::fields::{FieldDefinition, FieldType};
use crate::store::ContentStore;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Per-field validation messages; empty map means the input is valid
pub type ValidationErrors = BTreeMap<String, Vec<String>>;

fn fmt_bound(n: f64) -> String {
    if n.fract() == 0.0 {
        format!("{}", n as i64)
    } else {
        format!("{n}")
    }
}

fn as_number(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn looks_like_email(s: &str) -> bool {
    let mut parts = s.splitn(2, '@');
    let local = parts.next().unwrap_or("");
    let domain = parts.next().unwrap_or("");
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

fn looks_like_url(s: &str) -> bool {
    s.starts_with("http://") || s.starts_with("https://")
}

/// Validates supplied field values against their definitions, checking
/// reference existence through the content store.
#[derive(Clone)]
pub struct FieldValidator {
    store: Arc<dyn ContentStore>,
}

impl FieldValidator {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    /// Validate every supplied value; required-ness is checked for all
    /// definitions, including ones the caller omitted.
    pub async fn validate(
        &self,
        defs: &[FieldDefinition],
        supplied: &Map<String, Value>,
    ) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        for def in defs {
            if def.is_hidden() {
                continue;
            }
            let value = supplied.get(&def.name).unwrap_or(&Value::Null);
            let mut messages = Vec::new();
            self.validate_field(def, value, &mut messages).await;
            if !messages.is_empty() {
                errors.insert(def.name.clone(), messages);
            }
        }
        errors
    }

    /// Validate only the supplied values, for partial updates: omitted
    /// definitions are not checked for required-ness, but an explicitly
    /// supplied empty value on a required field still fails.
    pub async fn validate_supplied(
        &self,
        defs: &[FieldDefinition],
        supplied: &Map<String, Value>,
    ) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        for (name, value) in supplied {
            let Some(def) = defs.iter().find(|d| d.name == *name && !d.is_hidden()) else {
                continue;
            };
            let mut messages = Vec::new();
            self.validate_field(def, value, &mut messages).await;
            if !messages.is_empty() {
                errors.insert(name.clone(), messages);
            }
        }
        errors
    }

    async fn validate_field(&self, def: &FieldDefinition, value: &Value, messages: &mut Vec<String>) {
        let absent = codec::is_absent(value) && !matches!(def.field_type, FieldType::Boolean);
        if absent {
            if def.required {
                messages.push("This field is required.".to_string());
            }
            return;
        }

        match &def.field_type {
            FieldType::Number => {
                let Some(n) = as_number(value) else {
                    messages.push("Please enter a valid number.".to_string());
                    return;
                };
                if let Some(min) = def.min {
                    if n < min {
                        messages.push(format!("Value must be at least {}.", fmt_bound(min)));
                    }
                }
                if let Some(max) = def.max {
                    if n > max {
                        messages.push(format!("Value must be at most {}.", fmt_bound(max)));
                    }
                }
            }
            FieldType::Text | FieldType::Textarea => {
                if let Some(maxlength) = def.maxlength {
                    let len = value.as_str().map(|s| s.chars().count() as u64).unwrap_or(0);
                    if len > maxlength {
                        messages.push(format!(
                            "Text must be at most {maxlength} characters."
                        ));
                    }
                }
            }
            FieldType::Email => {
                if !value.as_str().map(looks_like_email).unwrap_or(false) {
                    messages.push("Please enter a valid email address.".to_string());
                }
            }
            FieldType::Url => {
                if !value.as_str().map(looks_like_url).unwrap_or(false) {
                    messages.push("Please enter a valid URL.".to_string());
                }
            }
            FieldType::Select => {
                if !self.choice_valid(def, value) {
                    messages.push("Please select a valid option.".to_string());
                }
            }
            FieldType::MultiSelect => {
                let all_valid = match value {
                    Value::Array(items) => items.iter().all(|v| self.choice_valid(def, v)),
                    scalar => self.choice_valid(def, scalar),
                };
                if !all_valid {
                    messages.push("One or more selected options are invalid.".to_string());
                }
            }
            FieldType::Date => {
                if value.as_str().and_then(parse_date).is_none() {
                    messages.push("Please enter a valid date.".to_string());
                }
            }
            FieldType::DateTime => {
                if value.as_str().and_then(parse_datetime).is_none() {
                    messages.push("Please enter a valid date and time.".to_string());
                }
            }
            FieldType::Time => {
                if value.as_str().and_then(parse_time).is_none() {
                    messages.push("Please enter a valid time.".to_string());
                }
            }
            FieldType::Color => {
                if value.as_str().and_then(normalize_color).is_none() {
                    messages.push("Please enter a valid hex color.".to_string());
                }
            }
            FieldType::Image | FieldType::File => {
                if !self.media_exists(value).await {
                    messages.push(
                        "Please select a valid file from the media library.".to_string(),
                    );
                }
            }
            FieldType::Gallery => {
                let all_valid = match value {
                    Value::Array(items) => {
                        let mut ok = true;
                        for item in items {
                            if !self.media_exists(item).await {
                                ok = false;
                                break;
                            }
                        }
                        ok
                    }
                    _ => false,
                };
                if !all_valid {
                    messages.push("One or more gallery items are invalid.".to_string());
                }
            }
            FieldType::PostRef => {
                if !self.post_exists(value).await {
                    messages.push("Please select a valid post.".to_string());
                }
            }
            FieldType::PostRefList => {
                let all_valid = match value {
                    Value::Array(items) => {
                        let mut ok = true;
                        for item in items {
                            if !self.post_exists(item).await {
                                ok = false;
                                break;
                            }
                        }
                        ok
                    }
                    scalar => self.post_exists(scalar).await,
                };
                if !all_valid {
                    messages.push("One or more selected posts are invalid.".to_string());
                }
            }
            FieldType::Repeater => {
                let count = value.as_array().map(|a| a.len() as f64).unwrap_or(0.0);
                if let Some(min) = def.min {
                    if count < min {
                        messages.push(format!("At least {} items are required.", fmt_bound(min)));
                    }
                }
                if let Some(max) = def.max {
                    if count > max {
                        messages.push(format!("At most {} items are allowed.", fmt_bound(max)));
                    }
                }
            }
            // boolean coerces, opaque and composite-by-layout types are
            // structurally checked by the codec
            _ => {}
        }
    }

    fn choice_valid(&self, def: &FieldDefinition, value: &Value) -> bool {
        let Some(choices) = &def.choices else {
            // no declared choices: any scalar passes
            return !value.is_object() && !value.is_array();
        };
        let key = match value {
            Value::String(s) => s.clone(),
            Value::Number(n) => n.to_string(),
            _ => return false,
        };
        choices.contains_key(&key)
    }

    async fn media_exists(&self, value: &Value) -> bool {
        match extract_id(value) {
            Some(id) => self.store.get_media(id).await.is_some(),
            None => false,
        }
    }

    async fn post_exists(&self, value: &Value) -> bool {
        match extract_id(value) {
            Some(id) => self.store.get_post(id).await.is_some(),
            None => false,
        }
    }

    /// Type-directed input cleanup applied before storage: trims strings,
    /// coerces numeric strings and truthy flags. Unknown keys pass through.
    pub fn sanitize(&self, defs: &[FieldDefinition], supplied: &Map<String, Value>) -> Map<String, Value> {
        let mut out = Map::new();
        for (name, value) in supplied {
            let sanitized = match defs.iter().find(|d| d.name == *name) {
                Some(def) => match &def.field_type {
                    FieldType::Text | FieldType::Email | FieldType::Url => value
                        .as_str()
                        .map(|s| Value::String(s.trim().to_string()))
                        .unwrap_or_else(|| value.clone()),
                    FieldType::Number => match as_number(value) {
                        Some(n) if n.fract() == 0.0 => Value::from(n as i64),
                        Some(n) => serde_json::Number::from_f64(n)
                            .map(Value::Number)
                            .unwrap_or(Value::Null),
                        None => value.clone(),
                    },
                    FieldType::Boolean => Value::Bool(match value {
                        Value::Bool(b) => *b,
                        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
                        Value::String(s) => !matches!(s.as_str(), "" | "0" | "false" | "no"),
                        _ => false,
                    }),
                    _ => value.clone(),
                },
                None => value.clone(),
            };
            out.insert(name.clone(), sanitized);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn validator() -> FieldValidator {
        FieldValidator::new(Arc::new(MemoryStore::new()))
    }

    fn number_field(name: &str, min: Option<f64>, max: Option<f64>) -> FieldDefinition {
        FieldDefinition {
            name: name.to_string(),
            field_type: FieldType::Number,
            min,
            max,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_range_violation_message() {
        let v = validator();
        let defs = vec![number_field("price", Some(0.0), Some(100.0))];
        let supplied = json!({"price": 999}).as_object().cloned().unwrap();
        let errors = v.validate(&defs, &supplied).await;
        assert_eq!(
            errors.get("price"),
            Some(&vec!["Value must be at most 100.".to_string()])
        );
    }

    #[tokio::test]
    async fn test_in_range_passes() {
        let v = validator();
        let defs = vec![number_field("price", Some(0.0), Some(100.0))];
        let supplied = json!({"price": 12.5}).as_object().cloned().unwrap();
        assert!(v.validate(&defs, &supplied).await.is_empty());
    }

    #[tokio::test]
    async fn test_all_violations_collected() {
        let v = validator();
        let defs = vec![
            FieldDefinition {
                name: "title".to_string(),
                field_type: FieldType::Text,
                required: true,
                ..Default::default()
            },
            number_field("qty", Some(1.0), None),
            FieldDefinition {
                name: "contact".to_string(),
                field_type: FieldType::Email,
                ..Default::default()
            },
        ];
        let supplied = json!({"qty": 0, "contact": "nope"})
            .as_object()
            .cloned()
            .unwrap();
        let errors = v.validate(&defs, &supplied).await;
        assert_eq!(errors.len(), 3);
        assert_eq!(errors["title"], vec!["This field is required."]);
        assert_eq!(errors["qty"], vec!["Value must be at least 1."]);
        assert_eq!(errors["contact"], vec!["Please enter a valid email address."]);
    }

    #[tokio::test]
    async fn test_select_choice_membership() {
        let v = validator();
        let mut choices = Map::new();
        choices.insert("red".to_string(), json!("Red"));
        choices.insert("blue".to_string(), json!("Blue"));
        let defs = vec![FieldDefinition {
            name: "shade".to_string(),
            field_type: FieldType::Select,
            choices: Some(choices),
            ..Default::default()
        }];
        let ok = json!({"shade": "red"}).as_object().cloned().unwrap();
        assert!(v.validate(&defs, &ok).await.is_empty());
        let bad = json!({"shade": "green"}).as_object().cloned().unwrap();
        assert_eq!(
            v.validate(&defs, &bad).await["shade"],
            vec!["Please select a valid option."]
        );
    }

    #[tokio::test]
    async fn test_dangling_ref_rejected() {
        let v = validator();
        let defs = vec![FieldDefinition {
            name: "related".to_string(),
            field_type: FieldType::PostRef,
            ..Default::default()
        }];
        let supplied = json!({"related": 12345}).as_object().cloned().unwrap();
        assert_eq!(
            v.validate(&defs, &supplied).await["related"],
            vec!["Please select a valid post."]
        );
    }

    #[tokio::test]
    async fn test_repeater_row_bounds() {
        let v = validator();
        let defs = vec![FieldDefinition {
            name: "items".to_string(),
            field_type: FieldType::Repeater,
            min: Some(1.0),
            max: Some(2.0),
            ..Default::default()
        }];
        let too_many = json!({"items": [{}, {}, {}]}).as_object().cloned().unwrap();
        assert_eq!(
            v.validate(&defs, &too_many).await["items"],
            vec!["At most 2 items are allowed."]
        );
    }

    #[tokio::test]
    async fn test_maxlength() {
        let v = validator();
        let defs = vec![FieldDefinition {
            name: "summary".to_string(),
            field_type: FieldType::Text,
            maxlength: Some(5),
            ..Default::default()
        }];
        let supplied = json!({"summary": "too long"}).as_object().cloned().unwrap();
        assert_eq!(
            v.validate(&defs, &supplied).await["summary"],
            vec!["Text must be at most 5 characters."]
        );
    }

    #[test]
    fn test_sanitize_coerces() {
        let v = validator();
        let defs = vec![
            number_field("qty", None, None),
            FieldDefinition {
                name: "name".to_string(),
                field_type: FieldType::Text,
                ..Default::default()
            },
        ];
        let supplied = json!({"qty": "5", "name": "  padded  ", "extra": true})
            .as_object()
            .cloned()
            .unwrap();
        let out = v.sanitize(&defs, &supplied);
        assert_eq!(out["qty"], json!(5));
        assert_eq!(out["name"], json!("padded"));
        assert_eq!(out["extra"], json!(true));
    }
}
