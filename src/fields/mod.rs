//! Field schema model: typed field definitions and their wire schema.
//!
//! Field definitions come from an external schema provider and are read-only
//! here. A definition's type tag determines which constraints and
//! sub-definitions are meaningful; unknown tags pass through opaquely so
//! third-party field types survive the gateway unmodified.

pub mod codec;
pub mod schema;
pub mod validate;

pub use codec::FieldCodec;
pub use schema::SchemaResolver;
pub use validate::FieldValidator;

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

/// Wrapper-class marker hiding a field from the API
pub const HIDDEN_CLASS_MARKER: &str = "hide-in-app";
/// Inline instruction-text marker hiding a field from the API
pub const HIDDEN_TEXT_MARKER: &str = "[hide_in_app]";

/// Field type tag.
///
/// An open set: tags the gateway does not recognize are carried as
/// `Other` and their values pass through the codec unmodified.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FieldType {
    #[default]
    Text,
    Textarea,
    RichText,
    Email,
    Url,
    Number,
    Boolean,
    Date,
    DateTime,
    Time,
    Color,
    Image,
    Gallery,
    File,
    Select,
    MultiSelect,
    TermRef,
    PostRef,
    PostRefList,
    UserRef,
    Group,
    Repeater,
    Flexible,
    Link,
    Map,
    Embed,
    /// Unrecognized type tag, passed through opaquely
    Other(String),
}

impl FieldType {
    /// Stable tag string for this type
    pub fn as_tag(&self) -> &str {
        match self {
            FieldType::Text => "text",
            FieldType::Textarea => "textarea",
            FieldType::RichText => "richtext",
            FieldType::Email => "email",
            FieldType::Url => "url",
            FieldType::Number => "number",
            FieldType::Boolean => "boolean",
            FieldType::Date => "date",
            FieldType::DateTime => "datetime",
            FieldType::Time => "time",
            FieldType::Color => "color",
            FieldType::Image => "image",
            FieldType::Gallery => "gallery",
            FieldType::File => "file",
            FieldType::Select => "select",
            FieldType::MultiSelect => "multi_select",
            FieldType::TermRef => "term_ref",
            FieldType::PostRef => "post_ref",
            FieldType::PostRefList => "post_ref_list",
            FieldType::UserRef => "user_ref",
            FieldType::Group => "group",
            FieldType::Repeater => "repeater",
            FieldType::Flexible => "flexible",
            FieldType::Link => "link",
            FieldType::Map => "map",
            FieldType::Embed => "embed",
            FieldType::Other(tag) => tag,
        }
    }

    /// Parse a tag string; unrecognized tags become `Other`
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "text" => FieldType::Text,
            "textarea" => FieldType::Textarea,
            "richtext" => FieldType::RichText,
            "email" => FieldType::Email,
            "url" => FieldType::Url,
            "number" => FieldType::Number,
            "boolean" => FieldType::Boolean,
            "date" => FieldType::Date,
            "datetime" => FieldType::DateTime,
            "time" => FieldType::Time,
            "color" => FieldType::Color,
            "image" => FieldType::Image,
            "gallery" => FieldType::Gallery,
            "file" => FieldType::File,
            "select" => FieldType::Select,
            "multi_select" => FieldType::MultiSelect,
            "term_ref" => FieldType::TermRef,
            "post_ref" => FieldType::PostRef,
            "post_ref_list" => FieldType::PostRefList,
            "user_ref" => FieldType::UserRef,
            "group" => FieldType::Group,
            "repeater" => FieldType::Repeater,
            "flexible" => FieldType::Flexible,
            "link" => FieldType::Link,
            "map" => FieldType::Map,
            "embed" => FieldType::Embed,
            other => FieldType::Other(other.to_string()),
        }
    }

    /// Whether values of this type are scalar (string/number/bool).
    ///
    /// List views only carry scalar values to bound payload size.
    pub fn is_scalar(&self) -> bool {
        matches!(
            self,
            FieldType::Text
                | FieldType::Textarea
                | FieldType::RichText
                | FieldType::Email
                | FieldType::Url
                | FieldType::Number
                | FieldType::Boolean
                | FieldType::Date
                | FieldType::DateTime
                | FieldType::Time
                | FieldType::Color
                | FieldType::Select
                | FieldType::Embed
        )
    }
}

impl From<String> for FieldType {
    fn from(tag: String) -> Self {
        FieldType::from_tag(&tag)
    }
}

impl From<FieldType> for String {
    fn from(ft: FieldType) -> Self {
        ft.as_tag().to_string()
    }
}

/// A named layout inside a variant-group ("flexible content") field
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldLayout {
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub sub_fields: Vec<FieldDefinition>,
}

/// Schema for one custom field, as declared by the schema provider.
///
/// Which constraint fields are meaningful depends on `field_type`;
/// the rest deserialize to their defaults and are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(rename = "type", default)]
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    #[serde(default)]
    pub instructions: Option<String>,
    #[serde(default)]
    pub wrapper_class: Option<String>,
    /// Choice map (value -> display label) for select/multi-select
    #[serde(default)]
    pub choices: Option<Map<String, Value>>,
    #[serde(default)]
    pub min: Option<f64>,
    #[serde(default)]
    pub max: Option<f64>,
    #[serde(default)]
    pub step: Option<f64>,
    #[serde(default)]
    pub maxlength: Option<u64>,
    /// Content types a post-ref field may point at
    #[serde(default)]
    pub related_types: Vec<String>,
    /// Taxonomy slug for term-ref fields
    #[serde(default)]
    pub taxonomy: Option<String>,
    #[serde(default)]
    pub allow_multiple: bool,
    /// Sub-definitions for group/repeating types
    #[serde(default)]
    pub sub_fields: Vec<FieldDefinition>,
    /// Named layouts for variant-group types
    #[serde(default)]
    pub layouts: Vec<FieldLayout>,
    #[serde(default)]
    pub prepend: Option<String>,
    #[serde(default)]
    pub append: Option<String>,
    #[serde(default)]
    pub return_format: Option<String>,
}

impl FieldDefinition {
    /// Whether this field is hidden from the API.
    ///
    /// A field is hidden by the `hide-in-app` wrapper class or the
    /// `[hide_in_app]` marker anywhere in its instructions.
    pub fn is_hidden(&self) -> bool {
        if let Some(class) = &self.wrapper_class {
            if class.contains(HIDDEN_CLASS_MARKER) {
                return true;
            }
        }
        if let Some(instructions) = &self.instructions {
            if instructions.contains(HIDDEN_TEXT_MARKER) {
                return true;
            }
        }
        false
    }

    /// Instructions with the hide marker stripped and trimmed, or None
    /// when nothing readable remains.
    pub fn clean_instructions(&self) -> Option<String> {
        let instructions = self.instructions.as_deref()?;
        let cleaned = instructions.replace(HIDDEN_TEXT_MARKER, "");
        let cleaned = cleaned.trim();
        if cleaned.is_empty() {
            None
        } else {
            Some(cleaned.to_string())
        }
    }

    /// Layout lookup by name (variant-group types)
    pub fn layout(&self, name: &str) -> Option<&FieldLayout> {
        self.layouts.iter().find(|l| l.name == name)
    }

    /// Wire schema for this field, recursing into visible sub-definitions.
    ///
    /// Key names (fieldType, isRequired, subFields, ...) are part of the
    /// wire contract and mirror the schema responses exactly.
    pub fn schema_json(&self) -> Value {
        let mut schema = Map::new();
        schema.insert("name".into(), json!(self.name));
        schema.insert(
            "label".into(),
            json!(if self.label.is_empty() {
                &self.name
            } else {
                &self.label
            }),
        );
        schema.insert("fieldType".into(), json!(self.field_type.as_tag()));
        schema.insert("isRequired".into(), json!(self.required));
        schema.insert("isHidden".into(), json!(false));
        schema.insert("instructions".into(), json!(self.clean_instructions()));

        if let Some(choices) = &self.choices {
            if !choices.is_empty() {
                schema.insert("choices".into(), Value::Object(choices.clone()));
            }
        }

        match self.field_type {
            FieldType::PostRef | FieldType::PostRefList => {
                schema.insert("relatedPostTypes".into(), json!(self.related_types));
            }
            FieldType::TermRef => {
                if let Some(taxonomy) = &self.taxonomy {
                    schema.insert("taxonomy".into(), json!(taxonomy));
                }
                schema.insert("allowMultiple".into(), json!(self.allow_multiple));
            }
            FieldType::Number => {
                if let Some(min) = self.min {
                    schema.insert("min".into(), json!(min));
                }
                if let Some(max) = self.max {
                    schema.insert("max".into(), json!(max));
                }
                if let Some(step) = self.step {
                    schema.insert("step".into(), json!(step));
                }
            }
            _ => {}
        }

        if !self.sub_fields.is_empty() {
            let subs: Map<String, Value> = self
                .sub_fields
                .iter()
                .filter(|f| !f.is_hidden())
                .map(|f| (f.name.clone(), f.schema_json()))
                .collect();
            schema.insert("subFields".into(), Value::Object(subs));
        }

        if matches!(self.field_type, FieldType::Flexible) && !self.layouts.is_empty() {
            let layouts: Vec<Value> = self
                .layouts
                .iter()
                .map(|layout| {
                    let subs: Map<String, Value> = layout
                        .sub_fields
                        .iter()
                        .filter(|f| !f.is_hidden())
                        .map(|f| (f.name.clone(), f.schema_json()))
                        .collect();
                    json!({
                        "name": layout.name,
                        "label": layout.label,
                        "subFields": subs,
                    })
                })
                .collect();
            schema.insert("layouts".into(), json!(layouts));
        }

        if let Some(prepend) = &self.prepend {
            schema.insert("prepend".into(), json!(prepend));
        }
        if let Some(append) = &self.append {
            schema.insert("append".into(), json!(append));
        }
        if let Some(format) = &self.return_format {
            schema.insert("returnFormat".into(), json!(format));
        }

        Value::Object(schema)
    }
}
