//! Safe parsing and serialization of extended JSON, the JavaScript-flavoured
//! JSON dialect printed by MongoDB shells.
//!
//! Extended JSON allows a small set of constructor calls (`ObjectId(...)`,
//! `ISODate(...)`, `DBRef(...)` and friends), regex literals and a bare `NaN`
//! inside otherwise ordinary JSON. Input is parsed into a syntax tree and
//! checked against a whitelist; no part of it is ever executed.
//!
//! ```
//! let value = extjson::parse(r#"{"_id": ObjectId("5f1d"), "at": ISODate("2020-01-02T03:04:05Z")}"#)
//!     .unwrap();
//! assert_eq!(
//!     extjson::serialize(&value, false),
//!     r#"{_id:ObjectId("5f1d"),at:ISODate("2020-01-02T03:04:05Z")}"#
//! );
//! ```

#![forbid(unsafe_code)]

mod error;
mod isodate;
mod literal;
mod number;
mod options;
mod serialize;
pub mod syntax;
mod validate;
mod value;

use log::debug;

pub use error::{
    Diagnostic, Located, ParseError, Position, SourceLocation, StructuralError, SyntaxError,
};
pub use literal::Constructor;
pub use options::{ParseOptions, DEFAULT_MAX_DEPTH};
pub use serialize::{serialize, Serializer};
pub use value::{CanonicalValue, DbRef, ExtendedType, Leaf, Map, ValueKind, Visitor};

use syntax::WrappedSource;

/// Parses extended JSON text with the default options.
pub fn parse<S: AsRef<str>>(text: S) -> Result<CanonicalValue, ParseError> {
    parse_with(text, &ParseOptions::default())
}

/// Parses extended JSON text. The text must be a single object literal.
///
/// Syntax errors are reported before any structural checks take place. In
/// either case every error found is returned, located relative to `text`.
pub fn parse_with<S: AsRef<str>>(
    text: S,
    options: &ParseOptions,
) -> Result<CanonicalValue, ParseError> {
    let source = WrappedSource::new(text.as_ref());
    let (program, errors) = syntax::parse_program(source.as_str(), options.max_depth);
    if !errors.is_empty() {
        debug!("Found {} syntax error(s)", errors.len());
        return Err(ParseError::Syntax(
            errors
                .into_iter()
                .map(|(span, err)| Located::new(source.locate(span), err))
                .collect(),
        ));
    }
    validate::validate(&source, &program, options.max_depth).map_err(ParseError::Structural)
}

/// Parses and re-serializes `text` in canonical form.
pub fn normalize<S: AsRef<str>>(text: S, pretty: bool) -> Result<String, ParseError> {
    Ok(serialize(&parse(text)?, pretty))
}

#[cfg(test)]
mod test {
    use super::*;
    use lazy_static::lazy_static;

    lazy_static! {
        static ref DOCUMENTS: Vec<&'static str> = vec![
            "{}",
            r#"{"a": 1, "b": [true, false, null], "c": {"d": "e"}}"#,
            r#"{_id: ObjectId("5f1d2c3b4a59687766554433"), name: "Ada"}"#,
            r#"{at: ISODate("2020-01-02T03:04:05.006Z"), old: new Date(-62135596800000)}"#,
            r#"{none: Date(null), empty: ObjectId(), re: /ab+c/gi, weird: RegExp("a/b", "y")}"#,
            r#"{n: NaN, list: [NaN, -1.5, 1e21, 0.000001], "odd key": "tab\there"}"#,
            r#"{ref: DBRef("users", ObjectId("abc"), "app")}"#,
            r#"{bin: BinData(0, "AAECAw=="), nested: {deeper: [[], {}, [{}]]}}"#,
            "{'single': 'quotes', \"new\": 1, 3: \"three\", esc: \"\\u2028\\u00ad\"}",
        ];
    }

    #[test]
    fn round_trip() {
        for (i, doc) in DOCUMENTS.iter().enumerate() {
            let value = parse(doc).unwrap();
            for pretty in [false, true] {
                let text = serialize(&value, pretty);
                assert_eq!(parse(&text).unwrap(), value, "test case {}: {}", i, text);
            }
        }
    }

    #[test]
    fn normalizing_is_idempotent() {
        for (i, doc) in DOCUMENTS.iter().enumerate() {
            for pretty in [false, true] {
                let once = normalize(doc, pretty).unwrap();
                assert_eq!(normalize(&once, pretty).unwrap(), once, "test case {}", i);
            }
        }
    }

    #[test]
    fn edge_values_read_back_as_their_nearest_form() {
        let oid = |hex: Option<&str>| ExtendedType::ObjectId {
            hex: hex.map(str::to_string),
        };
        let date = |ms: Option<i64>| ExtendedType::IsoDate {
            epoch_millis_utc: ms,
        };
        let re = |pattern: Option<&str>, flags: &str| ExtendedType::Regex {
            pattern: pattern.map(str::to_string),
            flags: flags.to_string(),
        };
        let max = 8_640_000_000_000_000;
        let test_cases = vec![
            (oid(Some("")), oid(None)),
            (oid(Some(" ")), oid(Some(" "))),
            (re(Some(""), ""), re(None, "")),
            (re(Some(""), "gi"), re(None, "gi")),
            (re(Some("*"), "y"), re(Some("*"), "y")),
            (date(Some(max)), date(Some(max))),
            (date(Some(-max)), date(Some(-max))),
            (date(Some(max + 1)), date(None)),
            (date(Some(-max - 1)), date(None)),
            (date(Some(i64::MAX)), date(None)),
            (date(Some(i64::MIN)), date(None)),
        ];
        for (i, (value, expected)) in test_cases.into_iter().enumerate() {
            let doc: CanonicalValue = [("v".to_string(), CanonicalValue::from(value))]
                .into_iter()
                .collect();
            for pretty in [false, true] {
                let text = serialize(&doc, pretty);
                let back = parse(&text).unwrap();
                assert_eq!(
                    back.get("v"),
                    Some(&CanonicalValue::from(expected.clone())),
                    "test case {}: {}",
                    i,
                    text
                );
                assert_eq!(serialize(&back, pretty), text, "test case {}", i);
            }
        }
    }

    #[test]
    fn disallowed_calls_are_named() {
        let err = parse(r#"{"a": Foo()}"#).unwrap_err();
        match &err {
            ParseError::Structural(errs) => {
                assert_eq!(errs.len(), 1);
                assert_eq!(errs[0].err, StructuralError::BadCall("Foo".to_string()));
                assert_eq!(errs[0].location.start.column, 7);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(err.to_string(), "1 parse error");
    }

    #[test]
    fn iso_dates_are_utc_millis() {
        let millis = |text: &str| match parse(text).unwrap().get("d") {
            Some(CanonicalValue::Extended(ExtendedType::IsoDate { epoch_millis_utc })) => {
                epoch_millis_utc.unwrap()
            }
            other => panic!("unexpected value: {:?}", other),
        };
        let utc = millis(r#"{d: ISODate("2020-01-02T03:04:05Z")}"#);
        assert_eq!(
            millis(r#"{d: ISODate("2020-01-02T03:04:05.006Z")}"#),
            1_577_934_245_006
        );
        assert_eq!(
            millis(r#"{d: ISODate("2020-01-02T03:04:05+02:00")}"#),
            utc - 7_200_000
        );
    }

    #[test]
    fn nan_and_regex_literals() {
        let value = parse(r#"{"n": NaN, "r": /ab+c/ig}"#).unwrap();
        assert_eq!(value.get("n"), Some(&ExtendedType::NaNMarker.into()));
        assert_eq!(
            value.get("r"),
            Some(
                &ExtendedType::Regex {
                    pattern: Some("ab+c".to_string()),
                    flags: "gi".to_string(),
                }
                .into()
            )
        );
    }

    #[test]
    fn dbrefs_are_recognized() {
        let value = parse(r#"{owner: DBRef("users", ObjectId("42"))}"#).unwrap();
        let dbref = value.get("owner").and_then(CanonicalValue::as_dbref).unwrap();
        assert_eq!(dbref.collection.as_str(), Some("users"));
        assert_eq!(dbref.id.kind(), ValueKind::ObjectId);
    }

    #[test]
    fn only_a_single_object_is_accepted() {
        const TEST_CASES: &[(&str, StructuralError)] = &[
            ("1", StructuralError::ExpectedObject(syntax::NodeKind::Literal)),
            (
                "\"text\"",
                StructuralError::ExpectedObject(syntax::NodeKind::Literal),
            ),
            (
                "{a: 1}; {b: 2}",
                StructuralError::UnexpectedStatement(syntax::NodeKind::ExpressionStatement),
            ),
        ];
        for (i, (text, expected)) in TEST_CASES.iter().enumerate() {
            match parse(text).unwrap_err() {
                ParseError::Structural(errs) => {
                    assert_eq!(errs.len(), 1, "test case {}", i);
                    assert_eq!(&errs[0].err, expected, "test case {}", i);
                }
                other => panic!("test case {}: unexpected error {:?}", i, other),
            }
        }
    }

    #[test]
    fn syntax_errors_are_located_in_user_text() {
        let err = parse("{\n  a: }").unwrap_err();
        match &err {
            ParseError::Syntax(errs) => {
                assert_eq!(errs[0].err, SyntaxError::UnexpectedToken("}".to_string()));
                assert_eq!(errs[0].location.start.line, 2);
                assert_eq!(errs[0].location.start.column, 6);
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert!(!err.diagnostics().is_empty());
    }

    #[test]
    fn every_error_is_located() {
        const COUNT: usize = 20_000;
        let members = (0..COUNT)
            .map(|i| format!("k{}: Foo()", i))
            .collect::<Vec<_>>()
            .join(",\n ");
        match parse(format!("{{{}}}", members)).unwrap_err() {
            ParseError::Structural(errs) => {
                assert_eq!(errs.len(), COUNT);
                let last = &errs[COUNT - 1].location.start;
                assert_eq!(last.line, COUNT);
                assert_eq!(last.column, 2 + format!("k{}: ", COUNT - 1).len());
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let hashes = format!("{{a: 1{}}}", "#".repeat(COUNT));
        match parse(hashes).unwrap_err() {
            ParseError::Syntax(errs) => {
                assert_eq!(errs.len(), COUNT);
                assert_eq!(errs[COUNT - 1].location.start.column, 5 + COUNT);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn nesting_is_bounded() {
        let opts = ParseOptions::default().with_max_depth(4);
        assert!(parse_with("{a: [[1]]}", &opts).is_ok());
        match parse_with("{a: [[[[1]]]]}", &opts).unwrap_err() {
            ParseError::Syntax(errs) => {
                assert_eq!(errs.len(), 1);
                assert_eq!(errs[0].err, SyntaxError::NestingTooDeep(4));
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let deep = format!("{{a: {}1{}}}", "[".repeat(1000), "]".repeat(1000));
        assert!(matches!(parse(deep), Err(ParseError::Syntax(_))));

        for (i, chain) in ["1?1:", "x=", "new ", "~", "1**"].iter().enumerate() {
            let text = format!("{{a: {}Date()}}", chain.repeat(200_000));
            match parse(&text).unwrap_err() {
                ParseError::Syntax(errs) => {
                    assert_eq!(errs.len(), 1, "test case {}", i);
                    assert_eq!(
                        errs[0].err,
                        SyntaxError::NestingTooDeep(DEFAULT_MAX_DEPTH),
                        "test case {}",
                        i
                    );
                }
                other => panic!("test case {}: unexpected error {:?}", i, other),
            }
        }
    }

    #[test]
    fn types_are_thread_safe() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CanonicalValue>();
        assert_send_sync::<ParseError>();
        assert_send_sync::<ParseOptions>();
    }
}
