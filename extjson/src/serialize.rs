//! Renders a [`CanonicalValue`] back into extended JSON text that parses to
//! the same value.
//!
//! Extended values outside the domain documented on [`ExtendedType`] have no
//! text form of their own and are written as the nearest value that has one:
//! an empty ObjectId or regex pattern as absent, an out-of-range date as
//! `Date(null)`.

use crate::isodate;
use crate::number::to_js_string;
use crate::syntax::{is_identifier, is_reserved_word};
use crate::value::{CanonicalValue, ExtendedType, Leaf, Visitor};

const INDENT: &str = "    ";

/// Serializes `value`, either indented over several lines or on a single
/// line without insignificant whitespace.
pub fn serialize(value: &CanonicalValue, pretty: bool) -> String {
    let mut serializer = Serializer::new(pretty);
    value.walk(&mut serializer);
    serializer.finish()
}

/// A [`Visitor`] that writes extended JSON text.
#[derive(Debug, Clone, Default)]
pub struct Serializer {
    out: String,
    pretty: bool,
    depth: usize,
}

impl Serializer {
    pub fn new(pretty: bool) -> Self {
        Self {
            pretty,
            ..Self::default()
        }
    }

    pub fn finish(self) -> String {
        self.out
    }

    fn newline(&mut self) {
        if self.pretty {
            self.out.push('\n');
            for _ in 0..self.depth {
                self.out.push_str(INDENT);
            }
        }
    }

    fn separator(&mut self, index: usize) {
        if index > 0 {
            self.out.push(',');
        }
        self.newline();
    }

    fn close(&mut self, len: usize, bracket: char) {
        self.depth -= 1;
        if len > 0 {
            self.newline();
        }
        self.out.push(bracket);
    }

    fn string(&mut self, s: &str) {
        quote_into(&mut self.out, s);
    }

    fn extended(&mut self, ext: &ExtendedType) {
        match ext {
            ExtendedType::ObjectId { hex: Some(hex) } if !hex.is_empty() => {
                self.out.push_str("ObjectId(");
                self.string(hex);
                self.out.push(')');
            }
            ExtendedType::ObjectId { .. } => self.out.push_str("ObjectId()"),
            ExtendedType::IsoDate {
                epoch_millis_utc: Some(ms),
            } if isodate::in_range(*ms) => match isodate::format_utc(*ms) {
                Some(iso) => {
                    self.out.push_str("ISODate(");
                    self.string(&iso);
                    self.out.push(')');
                }
                None => self.out.push_str(&format!("Date({})", ms)),
            },
            ExtendedType::IsoDate { .. } => self.out.push_str("Date(null)"),
            ExtendedType::Regex { pattern, flags } => {
                self.regex(pattern.as_deref().filter(|p| !p.is_empty()), flags)
            }
            ExtendedType::BinData { subtype, base64 } => {
                self.out.push_str("BinData(");
                subtype.walk(self);
                self.out.push(',');
                if self.pretty {
                    self.out.push(' ');
                }
                self.string(base64);
                self.out.push(')');
            }
            ExtendedType::NaNMarker => self.out.push_str("NaN"),
        }
    }

    fn regex(&mut self, pattern: Option<&str>, flags: &str) {
        match pattern {
            Some(p) if literal_roundtrips(p, flags) => {
                self.out.push('/');
                self.out.push_str(p);
                self.out.push('/');
                self.out.push_str(flags);
            }
            Some(p) => {
                self.out.push_str("RegExp(");
                self.string(p);
                self.regex_flags(flags);
                self.out.push(')');
            }
            None if flags.is_empty() => self.out.push_str("RegExp()"),
            None => {
                self.out.push_str("RegExp(null");
                self.regex_flags(flags);
                self.out.push(')');
            }
        }
    }

    fn regex_flags(&mut self, flags: &str) {
        if !flags.is_empty() {
            self.out.push(',');
            if self.pretty {
                self.out.push(' ');
            }
            self.string(flags);
        }
    }
}

impl Visitor for Serializer {
    fn visit_leaf(&mut self, leaf: Leaf<'_>) {
        match leaf {
            Leaf::Null => self.out.push_str("null"),
            Leaf::Bool(b) => self.out.push_str(if b { "true" } else { "false" }),
            Leaf::Number(n) if n.is_finite() => self.out.push_str(&to_js_string(n)),
            Leaf::Number(_) => self.out.push_str("null"),
            Leaf::String(s) => self.string(s),
            Leaf::Extended(ext) => self.extended(ext),
        }
    }

    fn begin_array(&mut self, _len: usize) {
        self.out.push('[');
        self.depth += 1;
    }

    fn begin_element(&mut self, index: usize) {
        self.separator(index);
    }

    fn end_array(&mut self, len: usize) {
        self.close(len, ']');
    }

    fn begin_object(&mut self, _len: usize, _is_dbref: bool) {
        self.out.push('{');
        self.depth += 1;
    }

    fn begin_member(&mut self, index: usize, key: &str) {
        self.separator(index);
        if is_identifier(key) && !is_reserved_word(key) {
            self.out.push_str(key);
        } else {
            self.string(key);
        }
        self.out.push(':');
        if self.pretty {
            self.out.push(' ');
        }
    }

    fn end_object(&mut self, len: usize) {
        self.close(len, '}');
    }
}

fn needs_escape(c: char) -> bool {
    matches!(c,
        '\u{0}'..='\u{1f}'
        | '\u{7f}'..='\u{9f}'
        | '\u{ad}'
        | '\u{600}'..='\u{604}'
        | '\u{70f}'
        | '\u{17b4}'
        | '\u{17b5}'
        | '\u{200c}'..='\u{200f}'
        | '\u{2028}'..='\u{202f}'
        | '\u{2060}'..='\u{206f}'
        | '\u{feff}'
        | '\u{fff0}'..='\u{ffff}'
    )
}

/// Writes `s` as a double-quoted string literal.
pub fn quote_into(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\u{8}' => out.push_str("\\b"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\u{c}' => out.push_str("\\f"),
            '\r' => out.push_str("\\r"),
            c if needs_escape(c) => out.push_str(&format!("\\u{:04x}", c as u32)),
            c => out.push(c),
        }
    }
    out.push('"');
}

// Whether `/pattern/flags` reads back as the same pattern and flags.
fn literal_roundtrips(pattern: &str, flags: &str) -> bool {
    if pattern.is_empty() || pattern.starts_with('*') {
        return false;
    }
    let mut last = None;
    for c in flags.chars() {
        match "gmi".find(c) {
            Some(i) if last.map_or(true, |l| i > l) => last = Some(i),
            _ => return false,
        }
    }
    let mut in_class = false;
    let mut escaped = false;
    for c in pattern.chars() {
        if matches!(c, '\n' | '\r' | '\u{2028}' | '\u{2029}') {
            return false;
        }
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' => escaped = true,
            '[' => in_class = true,
            ']' => in_class = false,
            '/' if !in_class => return false,
            _ => {}
        }
    }
    !escaped && !in_class
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::value::Map;

    fn object(members: Vec<(&str, CanonicalValue)>) -> CanonicalValue {
        members
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect()
    }

    fn regex(pattern: Option<&str>, flags: &str) -> CanonicalValue {
        ExtendedType::Regex {
            pattern: pattern.map(str::to_string),
            flags: flags.to_string(),
        }
        .into()
    }

    #[test]
    fn pretty_and_compact_layout() {
        let value = object(vec![
            ("a", CanonicalValue::Number(1.0)),
            (
                "list",
                vec![CanonicalValue::Bool(true), CanonicalValue::Null].into(),
            ),
            ("empty", CanonicalValue::Object(Map::new())),
            ("none", CanonicalValue::Array(vec![])),
        ]);
        assert_eq!(
            serialize(&value, false),
            "{a:1,list:[true,null],empty:{},none:[]}"
        );
        assert_eq!(
            serialize(&value, true),
            "{\n    a: 1,\n    list: [\n        true,\n        null\n    ],\n    empty: {},\n    none: []\n}"
        );
    }

    #[test]
    fn keys_are_quoted_only_when_needed() {
        let value = object(vec![
            ("plain", CanonicalValue::Null),
            ("$ref", CanonicalValue::Null),
            ("with space", CanonicalValue::Null),
            ("new", CanonicalValue::Null),
            ("2", CanonicalValue::Null),
        ]);
        assert_eq!(
            serialize(&value, false),
            r#"{plain:null,$ref:null,"with space":null,"new":null,"2":null}"#
        );
    }

    #[test]
    fn strings_and_numbers() {
        let value: CanonicalValue = vec![
            "quote\" back\\ tab\t nl\n".into(),
            "\u{0}\u{7f}\u{ad}\u{2028}\u{feff}é😀".into(),
            CanonicalValue::Number(-0.5),
            CanonicalValue::Number(1e21),
            CanonicalValue::Number(f64::NAN),
            CanonicalValue::Number(f64::INFINITY),
        ]
        .into();
        assert_eq!(
            serialize(&value, false),
            r#"["quote\" back\\ tab\t nl\n","\u0000\u007f\u00ad\u2028\ufeffé😀",-0.5,1e+21,null,null]"#
        );
    }

    #[test]
    fn extended_types() {
        let value: CanonicalValue = vec![
            ExtendedType::ObjectId {
                hex: Some("5f1d".to_string()),
            }
            .into(),
            ExtendedType::ObjectId { hex: None }.into(),
            ExtendedType::IsoDate {
                epoch_millis_utc: Some(1_577_934_245_006),
            }
            .into(),
            ExtendedType::IsoDate {
                epoch_millis_utc: Some(1_577_934_245_000),
            }
            .into(),
            ExtendedType::IsoDate {
                epoch_millis_utc: Some(-62_135_596_800_000),
            }
            .into(),
            ExtendedType::IsoDate {
                epoch_millis_utc: None,
            }
            .into(),
            ExtendedType::BinData {
                subtype: Box::new(CanonicalValue::Number(0.0)),
                base64: "AAEC".to_string(),
            }
            .into(),
            ExtendedType::NaNMarker.into(),
        ]
        .into();
        assert_eq!(
            serialize(&value, false),
            concat!(
                r#"[ObjectId("5f1d"),ObjectId(),ISODate("2020-01-02T03:04:05.006Z"),"#,
                r#"ISODate("2020-01-02T03:04:05Z"),Date(-62135596800000),Date(null),"#,
                r#"BinData(0,"AAEC"),NaN]"#
            )
        );
    }

    #[test]
    fn regexes_fall_back_to_constructor_form() {
        const TEST_CASES: &[(Option<&str>, &str, &str)] = &[
            (Some("ab+c"), "gi", "/ab+c/gi"),
            (Some("a[/]b"), "", "/a[/]b/"),
            (Some("a\\/b"), "m", "/a\\/b/m"),
            (Some("a/b"), "", r#"RegExp("a/b")"#),
            (Some("*"), "", r#"RegExp("*")"#),
            (Some("x"), "ig", r#"RegExp("x","ig")"#),
            (Some("x"), "y", r#"RegExp("x","y")"#),
            (Some("x\\"), "", r#"RegExp("x\\")"#),
            (Some("[x"), "", r#"RegExp("[x")"#),
            (Some("a\nb"), "", r#"RegExp("a\nb")"#),
            (None, "", "RegExp()"),
            (None, "g", r#"RegExp(null,"g")"#),
            (Some(""), "", "RegExp()"),
            (Some(""), "m", r#"RegExp(null,"m")"#),
        ];
        for (i, (pattern, flags, expected)) in TEST_CASES.iter().enumerate() {
            assert_eq!(
                serialize(&regex(*pattern, flags), false),
                *expected,
                "test case {}",
                i
            );
        }
    }
}
