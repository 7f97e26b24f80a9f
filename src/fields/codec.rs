//! Field value codec: raw stored values <-> normalized wire values.
//!
//! Encoding resolves references and assets to summaries and normalizes
//! scalars to canonical forms; decoding collapses summaries back to ids.
//! Both directions are total: malformed input degrades to null (or
//! passthrough for opaque types), never to an error. Validation of
//! unparseable input happens before the codec runs.

use crate::fields::{FieldDefinition, FieldLayout, FieldType};
use crate::store::ContentStore;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use serde_json::{json, Map, Value};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

/// Tag key carried by each variant-group row
pub const LAYOUT_TAG_KEY: &str = "layout";

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%Y%m%d", "%d/%m/%Y", "%Y/%m/%d"];
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%Y%m%d%H%M%S",
];
const TIME_FORMATS: &[&str] = &["%H:%M:%S", "%H:%M", "%I:%M %p"];

/// Permissive date parse covering the formats clients actually send
pub fn parse_date(input: &str) -> Option<NaiveDate> {
    let input = input.trim();
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(input, format) {
            return Some(date);
        }
    }
    parse_datetime(input).map(|dt| dt.date())
}

/// Permissive datetime parse; bare dates become midnight
pub fn parse_datetime(input: &str) -> Option<NaiveDateTime> {
    let input = input.trim();
    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(input) {
        return Some(dt.naive_utc());
    }
    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(input, format) {
            return Some(dt);
        }
    }
    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(input, format) {
            return date.and_hms_opt(0, 0, 0);
        }
    }
    None
}

/// Permissive time-of-day parse
pub fn parse_time(input: &str) -> Option<NaiveTime> {
    let input = input.trim();
    for format in TIME_FORMATS {
        if let Ok(time) = NaiveTime::parse_from_str(input, format) {
            return Some(time);
        }
    }
    None
}

/// Normalize a color to `#RRGGBB` / `#RGB`, or None when not hex
pub fn normalize_color(input: &str) -> Option<String> {
    let hex = input.trim().trim_start_matches('#');
    if (hex.len() == 3 || hex.len() == 6) && hex.chars().all(|c| c.is_ascii_hexdigit()) {
        Some(format!("#{hex}"))
    } else {
        None
    }
}

/// Absent raw input: null, empty string, false, empty list.
/// Boolean fields are exempt and always encode to a concrete bool.
pub(crate) fn is_absent(raw: &Value) -> bool {
    match raw {
        Value::Null => true,
        Value::Bool(b) => !b,
        Value::String(s) => s.is_empty(),
        Value::Array(items) => items.is_empty(),
        _ => false,
    }
}

fn truthy(raw: &Value) -> bool {
    match raw {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
        Value::String(s) => !matches!(s.as_str(), "" | "0" | "false" | "no"),
        Value::Array(items) => !items.is_empty(),
        Value::Object(_) => true,
    }
}

/// Entity id from a raw reference value: bare number, numeric string,
/// or an object carrying an `id` key.
pub fn extract_id(raw: &Value) -> Option<u64> {
    match raw {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse().ok(),
        Value::Object(map) => map.get("id").and_then(extract_id),
        _ => None,
    }
}

fn coerce_string(raw: &Value) -> Value {
    match raw {
        Value::String(_) => raw.clone(),
        Value::Number(n) => Value::String(n.to_string()),
        other => other.clone(),
    }
}

fn coerce_number(raw: &Value) -> Value {
    match raw {
        Value::Number(_) => raw.clone(),
        Value::String(s) => {
            let s = s.trim();
            if let Ok(int) = s.parse::<i64>() {
                return json!(int);
            }
            match s.parse::<f64>() {
                Ok(float) => serde_json::Number::from_f64(float)
                    .map(Value::Number)
                    .unwrap_or(Value::Null),
                Err(_) => Value::Null,
            }
        }
        _ => Value::Null,
    }
}

fn coerce_f64(raw: &Value) -> Option<f64> {
    match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

type BoxedValue<'a> = Pin<Box<dyn Future<Output = Value> + Send + 'a>>;

/// Bidirectional field value transform, resolving references through the
/// content store at encode time.
#[derive(Clone)]
pub struct FieldCodec {
    store: Arc<dyn ContentStore>,
}

impl FieldCodec {
    pub fn new(store: Arc<dyn ContentStore>) -> Self {
        Self { store }
    }

    /// Encode a raw stored value to its wire form
    pub async fn encode(&self, def: &FieldDefinition, raw: &Value) -> Value {
        self.encode_inner(def, raw).await
    }

    fn encode_inner<'a>(&'a self, def: &'a FieldDefinition, raw: &'a Value) -> BoxedValue<'a> {
        Box::pin(async move {
            if matches!(def.field_type, FieldType::Boolean) {
                return Value::Bool(truthy(raw));
            }
            if is_absent(raw) {
                return Value::Null;
            }
            match &def.field_type {
                FieldType::Text
                | FieldType::Textarea
                | FieldType::RichText
                | FieldType::Email
                | FieldType::Url
                | FieldType::Select
                | FieldType::Embed => coerce_string(raw),
                FieldType::Boolean => Value::Bool(truthy(raw)),
                FieldType::Number => coerce_number(raw),
                FieldType::Date => self.encode_date(raw),
                FieldType::DateTime => self.encode_datetime(raw),
                FieldType::Time => self.encode_time(raw),
                FieldType::Color => raw
                    .as_str()
                    .and_then(normalize_color)
                    .map(Value::String)
                    .unwrap_or(Value::Null),
                FieldType::MultiSelect => self.encode_multi_select(raw),
                FieldType::Image => self.encode_image(raw).await,
                FieldType::Gallery => self.encode_gallery(raw).await,
                FieldType::File => self.encode_file(raw).await,
                FieldType::PostRef => self.encode_post_ref(raw).await,
                FieldType::PostRefList => self.encode_post_ref_list(raw).await,
                FieldType::TermRef => self.encode_term_ref(def, raw).await,
                FieldType::UserRef => self.encode_user_ref(raw).await,
                FieldType::Link => self.encode_link(raw),
                FieldType::Map => self.encode_map(raw),
                FieldType::Group => self.encode_record(&def.sub_fields, raw).await,
                FieldType::Repeater => self.encode_rows(&def.sub_fields, raw).await,
                FieldType::Flexible => self.encode_variant_rows(def, raw).await,
                FieldType::Other(_) => raw.clone(),
            }
        })
    }

    fn encode_date(&self, raw: &Value) -> Value {
        raw.as_str()
            .and_then(parse_date)
            .map(|d| Value::String(d.format("%Y%m%d").to_string()))
            .unwrap_or(Value::Null)
    }

    fn encode_datetime(&self, raw: &Value) -> Value {
        raw.as_str()
            .and_then(parse_datetime)
            .map(|dt| Value::String(dt.format("%Y-%m-%d %H:%M:%S").to_string()))
            .unwrap_or(Value::Null)
    }

    fn encode_time(&self, raw: &Value) -> Value {
        raw.as_str()
            .and_then(parse_time)
            .map(|t| Value::String(t.format("%H:%M:%S").to_string()))
            .unwrap_or(Value::Null)
    }

    fn encode_multi_select(&self, raw: &Value) -> Value {
        match raw {
            Value::Array(items) => Value::Array(items.clone()),
            scalar => Value::Array(vec![scalar.clone()]),
        }
    }

    async fn encode_image(&self, raw: &Value) -> Value {
        let Some(id) = extract_id(raw) else {
            return Value::Null;
        };
        match self.store.get_media(id).await {
            Some(media) => {
                let thumbnail = media.sizes.get("thumbnail").cloned();
                let medium = media.sizes.get("medium").cloned();
                json!({
                    "id": media.id,
                    "url": media.url,
                    "thumbnail": thumbnail.unwrap_or_else(|| media.url.clone()),
                    "medium": medium.unwrap_or_else(|| media.url.clone()),
                    "alt": media.alt,
                    "title": media.title,
                    "filename": media.filename,
                })
            }
            None => Value::Null,
        }
    }

    async fn encode_gallery(&self, raw: &Value) -> Value {
        let Value::Array(items) = raw else {
            return Value::Null;
        };
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            let resolved = self.encode_image(item).await;
            if !resolved.is_null() {
                out.push(resolved);
            }
        }
        Value::Array(out)
    }

    async fn encode_file(&self, raw: &Value) -> Value {
        let Some(id) = extract_id(raw) else {
            return Value::Null;
        };
        match self.store.get_media(id).await {
            Some(media) => json!({
                "id": media.id,
                "url": media.url,
                "filename": media.filename,
                "filesize": media.filesize,
                "mime_type": media.mime_type,
            }),
            None => Value::Null,
        }
    }

    async fn encode_post_ref(&self, raw: &Value) -> Value {
        let Some(id) = extract_id(raw) else {
            return Value::Null;
        };
        match self.store.get_post(id).await {
            Some(post) => json!({
                "id": post.id,
                "title": post.title,
                "type": post.post_type,
                "status": post.status.as_str(),
            }),
            None => Value::Null,
        }
    }

    async fn encode_post_ref_list(&self, raw: &Value) -> Value {
        let Value::Array(items) = raw else {
            return self.encode_post_ref(raw).await;
        };
        let mut out = Vec::with_capacity(items.len());
        for item in items {
            let resolved = self.encode_post_ref(item).await;
            if !resolved.is_null() {
                out.push(resolved);
            }
        }
        Value::Array(out)
    }

    async fn encode_term_summary(&self, raw: &Value) -> Value {
        let Some(id) = extract_id(raw) else {
            return Value::Null;
        };
        match self.store.get_term(id).await {
            Some(term) => json!({
                "id": term.id,
                "name": term.name,
                "slug": term.slug,
                "taxonomy": term.taxonomy,
            }),
            None => Value::Null,
        }
    }

    async fn encode_term_ref(&self, def: &FieldDefinition, raw: &Value) -> Value {
        if def.allow_multiple {
            let items: Vec<Value> = match raw {
                Value::Array(items) => items.clone(),
                scalar => vec![scalar.clone()],
            };
            let mut out = Vec::with_capacity(items.len());
            for item in &items {
                let resolved = self.encode_term_summary(item).await;
                if !resolved.is_null() {
                    out.push(resolved);
                }
            }
            Value::Array(out)
        } else {
            // a list raw value collapses to its first entry
            let single = match raw {
                Value::Array(items) => items.first().cloned().unwrap_or(Value::Null),
                other => other.clone(),
            };
            self.encode_term_summary(&single).await
        }
    }

    async fn encode_user_ref(&self, raw: &Value) -> Value {
        let Some(id) = extract_id(raw) else {
            return Value::Null;
        };
        match self.store.get_user(id).await {
            Some(user) => json!({
                "id": user.id,
                "name": user.name,
                "email": user.email,
            }),
            None => Value::Null,
        }
    }

    fn encode_link(&self, raw: &Value) -> Value {
        match raw {
            Value::String(url) => json!({
                "url": url,
                "title": "",
                "target": "_self",
            }),
            Value::Object(map) => {
                let url = map.get("url").and_then(Value::as_str).unwrap_or("");
                if url.is_empty() {
                    return Value::Null;
                }
                let title = map.get("title").and_then(Value::as_str).unwrap_or("");
                let target = map
                    .get("target")
                    .and_then(Value::as_str)
                    .filter(|t| !t.is_empty())
                    .unwrap_or("_self");
                json!({ "url": url, "title": title, "target": target })
            }
            _ => Value::Null,
        }
    }

    fn encode_map(&self, raw: &Value) -> Value {
        let Value::Object(map) = raw else {
            return Value::Null;
        };
        let Some(lat) = map.get("lat").and_then(coerce_f64) else {
            return Value::Null;
        };
        let Some(lng) = map.get("lng").and_then(coerce_f64) else {
            return Value::Null;
        };
        let mut out = Map::new();
        out.insert("lat".to_string(), json!(lat));
        out.insert("lng".to_string(), json!(lng));
        out.insert(
            "address".to_string(),
            json!(map.get("address").and_then(Value::as_str).unwrap_or("")),
        );
        out.insert(
            "zoom".to_string(),
            map.get("zoom")
                .and_then(coerce_f64)
                .map(|z| json!(z as i64))
                .unwrap_or(json!(14)),
        );
        // forward compatibility: unknown keys pass through
        for (key, value) in map {
            if !out.contains_key(key) {
                out.insert(key.clone(), value.clone());
            }
        }
        Value::Object(out)
    }

    /// Encode one record against a set of sub-definitions; unknown keys
    /// pass through unmodified.
    async fn encode_record(&self, sub_fields: &[FieldDefinition], raw: &Value) -> Value {
        let Value::Object(map) = raw else {
            return Value::Null;
        };
        let mut out = Map::new();
        for sub in sub_fields {
            if sub.is_hidden() {
                continue;
            }
            let sub_raw = map.get(&sub.name).unwrap_or(&Value::Null);
            out.insert(sub.name.clone(), self.encode_inner(sub, sub_raw).await);
        }
        for (key, value) in map {
            if !out.contains_key(key) && !sub_fields.iter().any(|s| s.name == *key) {
                out.insert(key.clone(), value.clone());
            }
        }
        Value::Object(out)
    }

    async fn encode_rows(&self, sub_fields: &[FieldDefinition], raw: &Value) -> Value {
        let Value::Array(rows) = raw else {
            return Value::Null;
        };
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(self.encode_record(sub_fields, row).await);
        }
        Value::Array(out)
    }

    async fn encode_variant_rows(&self, def: &FieldDefinition, raw: &Value) -> Value {
        let Value::Array(rows) = raw else {
            return Value::Null;
        };
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(self.encode_variant_row(def, row).await);
        }
        Value::Array(out)
    }

    async fn encode_variant_row(&self, def: &FieldDefinition, row: &Value) -> Value {
        let Value::Object(map) = row else {
            return row.clone();
        };
        let Some(tag) = map.get(LAYOUT_TAG_KEY).and_then(Value::as_str) else {
            return row.clone();
        };
        // unknown layout tags pass through unmodified
        let Some(layout) = def.layout(tag) else {
            return row.clone();
        };
        let tag = tag.to_string();
        let encoded = self.encode_record(&layout.sub_fields, row).await;
        match encoded {
            Value::Object(mut fields) => {
                fields.insert(LAYOUT_TAG_KEY.to_string(), Value::String(tag));
                Value::Object(fields)
            }
            other => other,
        }
    }

    /// Decode a wire value back to its raw stored form.
    ///
    /// Reference and asset summaries collapse to ids; canonical scalar
    /// strings are already valid raw input, so decode(encode(v)) == v.
    pub fn decode(&self, def: &FieldDefinition, value: &Value) -> Value {
        if matches!(def.field_type, FieldType::Boolean) {
            return Value::Bool(truthy(value));
        }
        if value.is_null() {
            return Value::Null;
        }
        match &def.field_type {
            FieldType::Image | FieldType::File | FieldType::PostRef | FieldType::UserRef => {
                extract_id(value).map(|id| json!(id)).unwrap_or(Value::Null)
            }
            FieldType::Gallery | FieldType::PostRefList => self.decode_id_list(value),
            FieldType::TermRef => {
                if def.allow_multiple {
                    self.decode_id_list(value)
                } else {
                    extract_id(value).map(|id| json!(id)).unwrap_or(Value::Null)
                }
            }
            FieldType::Group => self.decode_record(&def.sub_fields, value),
            FieldType::Repeater => self.decode_rows(&def.sub_fields, value),
            FieldType::Flexible => self.decode_variant_rows(def, value),
            _ => value.clone(),
        }
    }

    fn decode_id_list(&self, value: &Value) -> Value {
        match value {
            Value::Array(items) => Value::Array(
                items
                    .iter()
                    .filter_map(extract_id)
                    .map(|id| json!(id))
                    .collect(),
            ),
            other => extract_id(other)
                .map(|id| json!([id]))
                .unwrap_or(Value::Null),
        }
    }

    fn decode_record(&self, sub_fields: &[FieldDefinition], value: &Value) -> Value {
        let Value::Object(map) = value else {
            return Value::Null;
        };
        let mut out = Map::new();
        for (key, sub_value) in map {
            match sub_fields.iter().find(|s| s.name == *key) {
                Some(sub) => {
                    out.insert(key.clone(), self.decode(sub, sub_value));
                }
                None => {
                    out.insert(key.clone(), sub_value.clone());
                }
            }
        }
        Value::Object(out)
    }

    fn decode_rows(&self, sub_fields: &[FieldDefinition], value: &Value) -> Value {
        let Value::Array(rows) = value else {
            return Value::Null;
        };
        Value::Array(
            rows.iter()
                .map(|row| self.decode_record(sub_fields, row))
                .collect(),
        )
    }

    fn decode_variant_rows(&self, def: &FieldDefinition, value: &Value) -> Value {
        let Value::Array(rows) = value else {
            return Value::Null;
        };
        Value::Array(
            rows.iter()
                .map(|row| self.decode_variant_row(def, row))
                .collect(),
        )
    }

    fn decode_variant_row(&self, def: &FieldDefinition, row: &Value) -> Value {
        let Value::Object(map) = row else {
            return row.clone();
        };
        let layout: Option<&FieldLayout> = map
            .get(LAYOUT_TAG_KEY)
            .and_then(Value::as_str)
            .and_then(|tag| def.layout(tag));
        match layout {
            Some(layout) => {
                let decoded = self.decode_record(&layout.sub_fields, row);
                match decoded {
                    Value::Object(mut fields) => {
                        if let Some(tag) = map.get(LAYOUT_TAG_KEY) {
                            fields.insert(LAYOUT_TAG_KEY.to_string(), tag.clone());
                        }
                        Value::Object(fields)
                    }
                    other => other,
                }
            }
            None => row.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MediaRecord, MemoryStore, PostRecord, PostStatus, TypeRecord};
    use chrono::Utc;

    fn codec_with_store() -> (FieldCodec, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (FieldCodec::new(store.clone()), store)
    }

    fn def(field_type: FieldType) -> FieldDefinition {
        FieldDefinition {
            name: "f".to_string(),
            field_type,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_absent_inputs_encode_to_null() {
        let (codec, _) = codec_with_store();
        for raw in [json!(null), json!(""), json!(false), json!([])] {
            assert_eq!(codec.encode(&def(FieldType::Text), &raw).await, json!(null));
        }
    }

    #[tokio::test]
    async fn test_boolean_always_concrete() {
        let (codec, _) = codec_with_store();
        let d = def(FieldType::Boolean);
        assert_eq!(codec.encode(&d, &json!(null)).await, json!(false));
        assert_eq!(codec.encode(&d, &json!("1")).await, json!(true));
        assert_eq!(codec.encode(&d, &json!(0)).await, json!(false));
    }

    #[tokio::test]
    async fn test_date_formats_normalize() {
        let (codec, _) = codec_with_store();
        let d = def(FieldType::Date);
        assert_eq!(codec.encode(&d, &json!("2026-03-15")).await, json!("20260315"));
        assert_eq!(codec.encode(&d, &json!("20260315")).await, json!("20260315"));
        let dt = def(FieldType::DateTime);
        assert_eq!(
            codec.encode(&dt, &json!("2026-03-15T08:30:00")).await,
            json!("2026-03-15 08:30:00")
        );
        let t = def(FieldType::Time);
        assert_eq!(codec.encode(&t, &json!("8:30 AM")).await, json!("08:30:00"));
    }

    #[tokio::test]
    async fn test_color_leading_hash() {
        let (codec, _) = codec_with_store();
        let d = def(FieldType::Color);
        assert_eq!(codec.encode(&d, &json!("ff0000")).await, json!("#ff0000"));
        assert_eq!(codec.encode(&d, &json!("#abc")).await, json!("#abc"));
        assert_eq!(codec.encode(&d, &json!("not-a-color")).await, json!(null));
    }

    #[tokio::test]
    async fn test_dangling_post_ref_is_null() {
        let (codec, _) = codec_with_store();
        let d = def(FieldType::PostRef);
        assert_eq!(codec.encode(&d, &json!(999)).await, json!(null));
    }

    #[tokio::test]
    async fn test_post_ref_round_trip() {
        let (codec, store) = codec_with_store();
        store.insert_type(TypeRecord {
            slug: "article".to_string(),
            name: "Articles".to_string(),
            singular: "Article".to_string(),
            rest_base: "articles".to_string(),
            hierarchical: false,
        });
        store.insert_post(PostRecord {
            id: 7,
            post_type: "article".to_string(),
            title: "Linked".to_string(),
            slug: "linked".to_string(),
            status: PostStatus::Published,
            content: String::new(),
            excerpt: String::new(),
            date: Utc::now(),
            modified: None,
            author_id: 1,
            thumbnail_id: None,
            fields: Default::default(),
        });
        let d = def(FieldType::PostRef);
        let encoded = codec.encode(&d, &json!(7)).await;
        assert_eq!(encoded["title"], "Linked");
        assert_eq!(codec.decode(&d, &encoded), json!(7));
    }

    #[tokio::test]
    async fn test_image_resolution_and_missing_asset() {
        let (codec, store) = codec_with_store();
        store.insert_media(MediaRecord {
            id: 3,
            url: "/media/3/cat.jpg".to_string(),
            filename: "cat.jpg".to_string(),
            filesize: 1024,
            mime_type: "image/jpeg".to_string(),
            alt: "a cat".to_string(),
            title: "Cat".to_string(),
            sizes: [("thumbnail".to_string(), "/media/3/cat-thumb.jpg".to_string())]
                .into_iter()
                .collect(),
            uploaded: Utc::now(),
        });
        let d = def(FieldType::Image);
        let encoded = codec.encode(&d, &json!(3)).await;
        assert_eq!(encoded["thumbnail"], "/media/3/cat-thumb.jpg");
        assert_eq!(encoded["medium"], "/media/3/cat.jpg");
        assert_eq!(codec.encode(&d, &json!(404)).await, json!(null));
    }

    #[tokio::test]
    async fn test_link_target_defaults() {
        let (codec, _) = codec_with_store();
        let d = def(FieldType::Link);
        let encoded = codec
            .encode(&d, &json!({"url": "https://example.com", "title": "Ex"}))
            .await;
        assert_eq!(encoded["target"], "_self");
    }

    #[tokio::test]
    async fn test_repeater_unknown_keys_pass_through() {
        let (codec, _) = codec_with_store();
        let mut d = def(FieldType::Repeater);
        d.sub_fields = vec![FieldDefinition {
            name: "qty".to_string(),
            field_type: FieldType::Number,
            ..Default::default()
        }];
        let raw = json!([{"qty": "5", "vendor_extra": "kept"}]);
        let encoded = codec.encode(&d, &raw).await;
        assert_eq!(encoded[0]["qty"], json!(5));
        assert_eq!(encoded[0]["vendor_extra"], "kept");
    }

    #[tokio::test]
    async fn test_variant_unknown_layout_passthrough() {
        let (codec, _) = codec_with_store();
        let mut d = def(FieldType::Flexible);
        d.layouts = vec![FieldLayout {
            name: "hero".to_string(),
            label: "Hero".to_string(),
            sub_fields: vec![FieldDefinition {
                name: "heading".to_string(),
                field_type: FieldType::Text,
                ..Default::default()
            }],
        }];
        let raw = json!([
            {"layout": "hero", "heading": "Hi"},
            {"layout": "vendor_block", "anything": true},
        ]);
        let encoded = codec.encode(&d, &raw).await;
        assert_eq!(encoded[0]["layout"], "hero");
        assert_eq!(encoded[0]["heading"], "Hi");
        assert_eq!(encoded[1], raw[1]);
    }

    #[tokio::test]
    async fn test_round_trip_scalars() {
        let (codec, _) = codec_with_store();
        let cases = [
            (def(FieldType::Text), json!("hello")),
            (def(FieldType::Number), json!(42)),
            (def(FieldType::Boolean), json!(true)),
            (def(FieldType::Date), json!("20260315")),
            (def(FieldType::Time), json!("08:30:00")),
            (def(FieldType::Color), json!("#ff0000")),
        ];
        for (d, raw) in cases {
            let encoded = codec.encode(&d, &raw).await;
            assert_eq!(codec.decode(&d, &encoded), raw, "type {:?}", d.field_type);
        }
    }
}
