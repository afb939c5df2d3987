//! Evaluation of the constructor calls and literal forms that extended JSON
//! allows.

use core::fmt;

use crate::number::to_int32;
use crate::syntax::UnaryOp;
use crate::value::{CanonicalValue, ExtendedType, Map};
use crate::{isodate, StructuralError};

/// The callees permitted in `Name(...)` and `new Name(...)` expressions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Constructor {
    ObjectId,
    Date,
    IsoDate,
    DbRef,
    RegExp,
    BinData,
}

impl Constructor {
    pub const ALL: [Constructor; 6] = [
        Self::ObjectId,
        Self::Date,
        Self::IsoDate,
        Self::DbRef,
        Self::RegExp,
        Self::BinData,
    ];

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.name() == name)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Self::ObjectId => "ObjectId",
            Self::Date => "Date",
            Self::IsoDate => "ISODate",
            Self::DbRef => "DBRef",
            Self::RegExp => "RegExp",
            Self::BinData => "BinData",
        }
    }

    /// Builds the value for a call with already-evaluated arguments. Extra
    /// arguments are ignored.
    pub fn construct(self, args: Vec<CanonicalValue>) -> Result<CanonicalValue, StructuralError> {
        let mut args = args.into_iter();
        let value = match self {
            Self::ObjectId => object_id(args.next()),
            Self::Date => date(args.next()),
            Self::IsoDate => iso_date(args.next())?,
            Self::DbRef => {
                let mut m = Map::new();
                for (key, arg) in ["$ref", "$id", "$db"].into_iter().zip(args) {
                    m.insert(key.to_string(), arg);
                }
                CanonicalValue::Object(m)
            }
            Self::RegExp => {
                let pattern = args.next();
                let flags = args.next();
                regex(
                    non_empty_text(pattern),
                    flags
                        .filter(CanonicalValue::is_truthy)
                        .map(|f| f.to_js_string())
                        .unwrap_or_default(),
                )
            }
            Self::BinData => {
                let subtype = args.next().unwrap_or_default();
                let base64 = args.next().map(|b| b.to_js_string()).unwrap_or_default();
                ExtendedType::BinData {
                    subtype: Box::new(subtype),
                    base64,
                }
                .into()
            }
        };
        Ok(value)
    }
}

impl fmt::Display for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// A regular expression literal, with its flags in canonical order.
pub fn regex_literal(
    pattern: &str,
    global: bool,
    multiline: bool,
    ignore_case: bool,
) -> CanonicalValue {
    let flags = [(global, 'g'), (multiline, 'm'), (ignore_case, 'i')]
        .iter()
        .filter(|(set, _)| *set)
        .map(|(_, c)| *c)
        .collect();
    // An empty literal pattern cannot be written, so it is always present.
    regex(Some(pattern.to_string()), flags)
}

fn regex(pattern: Option<String>, flags: String) -> CanonicalValue {
    ExtendedType::Regex { pattern, flags }.into()
}

fn object_id(id: Option<CanonicalValue>) -> CanonicalValue {
    ExtendedType::ObjectId {
        hex: non_empty_text(id),
    }
    .into()
}

// The text of a truthy argument. Truthy values such as `[]` whose text is
// empty count as missing.
fn non_empty_text(arg: Option<CanonicalValue>) -> Option<String> {
    arg.filter(CanonicalValue::is_truthy)
        .map(|v| v.to_js_string())
        .filter(|s| !s.is_empty())
}

fn date(arg: Option<CanonicalValue>) -> CanonicalValue {
    let epoch_millis_utc = match arg {
        None => Some(isodate::now_millis()),
        Some(CanonicalValue::Number(n)) => isodate::from_js_millis(n),
        Some(CanonicalValue::String(s)) => isodate::parse(&s).ok(),
        Some(CanonicalValue::Extended(ExtendedType::IsoDate { epoch_millis_utc })) => {
            epoch_millis_utc
        }
        Some(_) => None,
    };
    ExtendedType::IsoDate { epoch_millis_utc }.into()
}

fn iso_date(arg: Option<CanonicalValue>) -> Result<CanonicalValue, StructuralError> {
    let millis = match arg {
        Some(arg) if arg.is_truthy() => isodate::parse(&arg.to_js_string())?,
        _ => isodate::now_millis(),
    };
    Ok(ExtendedType::IsoDate {
        epoch_millis_utc: Some(millis),
    }
    .into())
}

/// Applies a side-effect-free unary operator.
pub fn unary(op: UnaryOp, operand: CanonicalValue) -> CanonicalValue {
    use CanonicalValue::*;

    match op {
        UnaryOp::Minus => match operand {
            Extended(ExtendedType::NaNMarker) => operand,
            other => Number(-other.to_js_number()),
        },
        UnaryOp::Plus => match operand {
            Extended(ExtendedType::NaNMarker) => operand,
            other => Number(other.to_js_number()),
        },
        UnaryOp::Not => Bool(!operand.is_truthy()),
        UnaryOp::BitNot => Number(f64::from(!to_int32(operand.to_js_number()))),
        UnaryOp::Typeof => String(type_of(&operand).to_string()),
        UnaryOp::Void => Null,
        UnaryOp::Delete => Bool(true),
    }
}

fn type_of(value: &CanonicalValue) -> &'static str {
    match value {
        CanonicalValue::Bool(_) => "boolean",
        CanonicalValue::Number(_) | CanonicalValue::Extended(ExtendedType::NaNMarker) => "number",
        CanonicalValue::String(_) => "string",
        _ => "object",
    }
}
