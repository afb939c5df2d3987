use core::fmt;

use indexmap::IndexMap;
use serde::{
    ser::{SerializeMap, SerializeSeq},
    Serialize,
};
use serde_json::{json, Value as JsonValue};

use crate::number::{parse_js_number, to_js_string};

/// Object members in insertion order.
pub type Map = IndexMap<String, CanonicalValue>;

/// The result of parsing extended JSON.
#[derive(Debug, Clone, PartialEq)]
pub enum CanonicalValue {
    Null,
    Bool(bool),
    Number(f64),
    String(String),
    Array(Vec<CanonicalValue>),
    Object(Map),
    Extended(ExtendedType),
}

/// Database-specific types that have no plain JSON counterpart.
///
/// Parsing only ever produces values within the documented domain of each
/// field. Values built by hand outside it serialize as the nearest value
/// inside it.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtendedType {
    ObjectId {
        /// Never empty when present.
        hex: Option<String>,
    },
    IsoDate {
        /// Milliseconds since the Unix epoch, always UTC, and no further from
        /// it than 8.64e15 when present.
        epoch_millis_utc: Option<i64>,
    },
    Regex {
        /// Never empty when present.
        pattern: Option<String>,
        flags: String,
    },
    BinData {
        subtype: Box<CanonicalValue>,
        base64: String,
    },
    NaNMarker,
}

/// Coarse classification of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
    ObjectId,
    IsoDate,
    Regex,
    BinData,
    NaN,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// A borrowed view of an object that is shaped like a database reference.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DbRef<'a> {
    pub collection: &'a CanonicalValue,
    pub id: &'a CanonicalValue,
    pub database: Option<&'a CanonicalValue>,
}

impl Default for CanonicalValue {
    fn default() -> Self {
        Self::Null
    }
}

impl From<ExtendedType> for CanonicalValue {
    fn from(ext: ExtendedType) -> Self {
        Self::Extended(ext)
    }
}

impl From<bool> for CanonicalValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<f64> for CanonicalValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for CanonicalValue {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for CanonicalValue {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<Vec<CanonicalValue>> for CanonicalValue {
    fn from(arr: Vec<CanonicalValue>) -> Self {
        Self::Array(arr)
    }
}

impl From<Map> for CanonicalValue {
    fn from(m: Map) -> Self {
        Self::Object(m)
    }
}

impl FromIterator<(String, CanonicalValue)> for CanonicalValue {
    fn from_iter<I: IntoIterator<Item = (String, CanonicalValue)>>(iter: I) -> Self {
        Self::Object(iter.into_iter().collect())
    }
}

impl CanonicalValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Null => ValueKind::Null,
            Self::Bool(_) => ValueKind::Bool,
            Self::Number(_) => ValueKind::Number,
            Self::String(_) => ValueKind::String,
            Self::Array(_) => ValueKind::Array,
            Self::Object(_) => ValueKind::Object,
            Self::Extended(ext) => match ext {
                ExtendedType::ObjectId { .. } => ValueKind::ObjectId,
                ExtendedType::IsoDate { .. } => ValueKind::IsoDate,
                ExtendedType::Regex { .. } => ValueKind::Regex,
                ExtendedType::BinData { .. } => ValueKind::BinData,
                ExtendedType::NaNMarker => ValueKind::NaN,
            },
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[CanonicalValue]> {
        match self {
            Self::Array(arr) => Some(arr),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&Map> {
        match self {
            Self::Object(m) => Some(m),
            _ => None,
        }
    }

    pub fn as_extended(&self) -> Option<&ExtendedType> {
        match self {
            Self::Extended(ext) => Some(ext),
            _ => None,
        }
    }

    /// Looks up an object member.
    pub fn get(&self, key: &str) -> Option<&CanonicalValue> {
        self.as_object().and_then(|m| m.get(key))
    }

    /// Whether this is an object carrying both `$ref` and `$id`.
    pub fn is_dbref(&self) -> bool {
        self.as_dbref().is_some()
    }

    pub fn as_dbref(&self) -> Option<DbRef<'_>> {
        let m = self.as_object()?;
        Some(DbRef {
            collection: m.get("$ref")?,
            id: m.get("$id")?,
            database: m.get("$db"),
        })
    }

    /// JavaScript truthiness, used where constructors treat their
    /// arguments as optional.
    pub(crate) fn is_truthy(&self) -> bool {
        match self {
            Self::Null => false,
            Self::Bool(b) => *b,
            Self::Number(n) => *n != 0.0 && !n.is_nan(),
            Self::String(s) => !s.is_empty(),
            Self::Extended(ExtendedType::NaNMarker) => false,
            _ => true,
        }
    }

    /// JavaScript's string conversion.
    pub(crate) fn to_js_string(&self) -> String {
        match self {
            Self::Null => "null".to_string(),
            Self::Bool(b) => b.to_string(),
            Self::Number(n) => to_js_string(*n),
            Self::String(s) => s.clone(),
            Self::Array(arr) => arr
                .iter()
                .map(|v| match v {
                    Self::Null => String::new(),
                    v => v.to_js_string(),
                })
                .collect::<Vec<_>>()
                .join(","),
            Self::Object(_) => "[object Object]".to_string(),
            Self::Extended(ext) => match ext {
                ExtendedType::ObjectId { hex } => hex.clone().unwrap_or_default(),
                ExtendedType::IsoDate { epoch_millis_utc } => match epoch_millis_utc {
                    Some(ms) => crate::isodate::format_utc(*ms).unwrap_or_else(|| ms.to_string()),
                    None => "Invalid Date".to_string(),
                },
                ExtendedType::Regex { pattern, flags } => {
                    format!("/{}/{}", pattern.as_deref().unwrap_or("(?:)"), flags)
                }
                ExtendedType::BinData { base64, .. } => base64.clone(),
                ExtendedType::NaNMarker => "NaN".to_string(),
            },
        }
    }

    /// JavaScript's numeric conversion.
    pub(crate) fn to_js_number(&self) -> f64 {
        match self {
            Self::Null => 0.0,
            Self::Bool(b) => f64::from(u8::from(*b)),
            Self::Number(n) => *n,
            Self::String(s) => parse_js_number(s),
            Self::Array(arr) if arr.is_empty() => 0.0,
            Self::Array(arr) if arr.len() == 1 => arr[0].to_js_number(),
            Self::Extended(ExtendedType::IsoDate {
                epoch_millis_utc: Some(ms),
            }) => *ms as f64,
            _ => f64::NAN,
        }
    }

    /// Drives `visitor` over this value depth-first.
    pub fn walk<V: Visitor + ?Sized>(&self, visitor: &mut V) {
        match self {
            Self::Null => visitor.visit_leaf(Leaf::Null),
            Self::Bool(b) => visitor.visit_leaf(Leaf::Bool(*b)),
            Self::Number(n) => visitor.visit_leaf(Leaf::Number(*n)),
            Self::String(s) => visitor.visit_leaf(Leaf::String(s)),
            Self::Extended(ext) => visitor.visit_leaf(Leaf::Extended(ext)),
            Self::Array(arr) => {
                visitor.begin_array(arr.len());
                for (i, el) in arr.iter().enumerate() {
                    visitor.begin_element(i);
                    el.walk(visitor);
                }
                visitor.end_array(arr.len());
            }
            Self::Object(m) => {
                visitor.begin_object(m.len(), self.is_dbref());
                for (i, (k, v)) in m.iter().enumerate() {
                    visitor.begin_member(i, k);
                    v.walk(visitor);
                }
                visitor.end_object(m.len());
            }
        }
    }

    /// Plain JSON with extended types spelled as canonical extended JSON v2
    /// wrappers (`{"$oid": ...}`, `{"$date": ...}` and so on).
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Null => JsonValue::Null,
            Self::Bool(b) => JsonValue::Bool(*b),
            Self::Number(n) => json!(n),
            Self::String(s) => JsonValue::String(s.clone()),
            Self::Array(arr) => JsonValue::Array(arr.iter().map(Self::to_json).collect()),
            Self::Object(m) => JsonValue::Object(
                m.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
            Self::Extended(ext) => match ext {
                ExtendedType::ObjectId { hex } => json!({ "$oid": hex }),
                ExtendedType::IsoDate { epoch_millis_utc } => match epoch_millis_utc {
                    Some(ms) => json!({ "$date": { "$numberLong": ms.to_string() } }),
                    None => json!({ "$date": null }),
                },
                ExtendedType::Regex { pattern, flags } => json!({
                    "$regularExpression": { "pattern": pattern, "options": flags }
                }),
                ExtendedType::BinData { subtype, base64 } => json!({
                    "$binary": { "base64": base64, "subType": subtype.to_json() }
                }),
                ExtendedType::NaNMarker => json!({ "$numberDouble": "NaN" }),
            },
        }
    }
}

impl Serialize for CanonicalValue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        match self {
            Self::Null => serializer.serialize_unit(),
            Self::Bool(b) => serializer.serialize_bool(*b),
            Self::Number(n) => serializer.serialize_f64(*n),
            Self::String(s) => serializer.serialize_str(s),
            Self::Array(arr) => {
                let mut seq = serializer.serialize_seq(Some(arr.len()))?;
                for el in arr {
                    seq.serialize_element(el)?;
                }
                seq.end()
            }
            Self::Object(m) => {
                let mut sm = serializer.serialize_map(Some(m.len()))?;
                for (k, v) in m {
                    sm.serialize_entry(k, v)?;
                }
                sm.end()
            }
            Self::Extended(_) => self.to_json().serialize(serializer),
        }
    }
}

/// A leaf of the value tree as seen by a [`Visitor`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Leaf<'a> {
    Null,
    Bool(bool),
    Number(f64),
    String(&'a str),
    Extended(&'a ExtendedType),
}

/// Read-only traversal of a [`CanonicalValue`], for renderers and
/// serializers. All callbacks default to doing nothing.
///
/// Arrays produce `begin_array`, then `begin_element` before each element's
/// own callbacks, then `end_array`. Objects do the same with `begin_object`,
/// `begin_member` and `end_object`; `begin_object` reports whether the object
/// is shaped like a DBRef.
pub trait Visitor {
    fn visit_leaf(&mut self, _leaf: Leaf<'_>) {}

    fn begin_array(&mut self, _len: usize) {}

    fn begin_element(&mut self, _index: usize) {}

    fn end_array(&mut self, _len: usize) {}

    fn begin_object(&mut self, _len: usize, _is_dbref: bool) {}

    fn begin_member(&mut self, _index: usize, _key: &str) {}

    fn end_object(&mut self, _len: usize) {}
}

#[cfg(test)]
mod test {
    use super::*;

    fn object(members: &[(&str, CanonicalValue)]) -> CanonicalValue {
        members
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn dbref_detection_is_structural() {
        let oid = CanonicalValue::from(ExtendedType::ObjectId {
            hex: Some("x".to_string()),
        });
        let dbref = object(&[("$ref", "coll".into()), ("$id", oid.clone())]);
        let view = dbref.as_dbref().unwrap();
        assert_eq!(view.collection.as_str(), Some("coll"));
        assert_eq!(view.id, &oid);
        assert!(view.database.is_none());
        assert_eq!(dbref.kind(), ValueKind::Object);

        assert!(!object(&[("$ref", "coll".into())]).is_dbref());
        assert!(!CanonicalValue::from("$ref").is_dbref());
    }

    #[derive(Default)]
    struct Recorder(Vec<String>);

    impl Visitor for Recorder {
        fn visit_leaf(&mut self, leaf: Leaf<'_>) {
            self.0.push(format!("{:?}", leaf));
        }

        fn begin_array(&mut self, len: usize) {
            self.0.push(format!("[{}", len));
        }

        fn end_array(&mut self, _len: usize) {
            self.0.push("]".to_string());
        }

        fn begin_object(&mut self, len: usize, is_dbref: bool) {
            self.0.push(format!("{{{} {}", len, is_dbref));
        }

        fn begin_member(&mut self, _index: usize, key: &str) {
            self.0.push(key.to_string());
        }

        fn end_object(&mut self, _len: usize) {
            self.0.push("}".to_string());
        }
    }

    #[test]
    fn visitor_sees_members_in_insertion_order() {
        let value = object(&[
            ("z", 1.0.into()),
            ("a", vec![CanonicalValue::Null, true.into()].into()),
        ]);
        let mut recorder = Recorder::default();
        value.walk(&mut recorder);
        assert_eq!(
            recorder.0,
            vec![
                "{2 false",
                "z",
                "Number(1.0)",
                "a",
                "[2",
                "Null",
                "Bool(true)",
                "]",
                "}"
            ]
        );
    }

    #[test]
    fn tagged_json() {
        let value = object(&[
            (
                "_id",
                ExtendedType::ObjectId {
                    hex: Some("5f1d".to_string()),
                }
                .into(),
            ),
            (
                "at",
                ExtendedType::IsoDate {
                    epoch_millis_utc: Some(1577934245006),
                }
                .into(),
            ),
            (
                "re",
                ExtendedType::Regex {
                    pattern: Some("^a".to_string()),
                    flags: "i".to_string(),
                }
                .into(),
            ),
            (
                "bin",
                ExtendedType::BinData {
                    subtype: Box::new(0.0.into()),
                    base64: "AAEC".to_string(),
                }
                .into(),
            ),
            ("n", ExtendedType::NaNMarker.into()),
        ]);
        assert_eq!(
            serde_json::to_string(&value).unwrap(),
            concat!(
                r#"{"_id":{"$oid":"5f1d"},"at":{"$date":{"$numberLong":"1577934245006"}},"#,
                r#""re":{"$regularExpression":{"pattern":"^a","options":"i"}},"#,
                r#""bin":{"$binary":{"base64":"AAEC","subType":0.0}},"n":{"$numberDouble":"NaN"}}"#
            )
        );
    }

    #[test]
    fn js_conversions() {
        assert!(!CanonicalValue::from("").is_truthy());
        assert!(!CanonicalValue::Number(0.0).is_truthy());
        assert!(CanonicalValue::Array(vec![]).is_truthy());
        assert_eq!(CanonicalValue::Number(5.0).to_js_string(), "5");
        assert_eq!(
            CanonicalValue::from(vec![1.0.into(), CanonicalValue::Null, "x".into()])
                .to_js_string(),
            "1,,x"
        );
        assert_eq!(CanonicalValue::from(" 7 ").to_js_number(), 7.0);
        assert_eq!(CanonicalValue::Bool(true).to_js_number(), 1.0);
        assert!(CanonicalValue::Object(Map::new()).to_js_number().is_nan());
    }
}
