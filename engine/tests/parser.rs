use std::sync::Arc;

use serde_json::json;
use shapecheck_core::{
    CustomType, DateFormat, ErrorKind, ParseError, SchemaDefinitionError, SchemaNode, TypeRegistry,
    Value,
};
use shapecheck_engine::{Parser, ParserOptions, Validator, ValidatorOptions};

fn schema(raw: serde_json::Value) -> SchemaNode {
    SchemaNode::from_json(raw).unwrap()
}

fn parser(raw: serde_json::Value) -> Parser {
    Parser::new(&schema(raw), ParserOptions::default()).unwrap()
}

fn flat_parser(raw: serde_json::Value) -> Parser {
    Parser::new(&schema(raw), ParserOptions::default().flat()).unwrap()
}

fn parse(parser: &Parser, data: serde_json::Value) -> Result<serde_json::Value, ParseError> {
    parser.parse(Value::from(data)).map(serde_json::Value::from)
}

#[test]
fn test_leaf_coercion() {
    let p = parser(json!({
        "on": {"description": "on", "type": "boolean"},
        "off": {"description": "off", "type": "boolean"},
        "count": {"description": "count", "type": "positiveInteger"},
        "ratio": {"description": "ratio", "type": "number"},
        "name": {"description": "name", "type": "string"}
    }));
    let parsed = parse(
        &p,
        json!({"on": "✓", "off": "0", "count": "123", "ratio": "0.5", "name": "007"}),
    )
    .unwrap();
    assert_eq!(
        parsed,
        json!({"on": true, "off": false, "count": 123, "ratio": 0.5, "name": "007"})
    );

    let err = parse(&p, json!({"count": "0"})).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Invalid);
    assert_eq!(err.message, "count must be a positive integer");
    assert_eq!(err.value, Some(Value::from("0")));

    let err = parse(&p, json!({"on": "yes"})).unwrap_err();
    assert_eq!(err.message, "on must be a boolean");
}

#[test]
fn test_native_values_pass_through() {
    let p = parser(json!({"count": {"description": "count", "type": "integer"}}));
    assert_eq!(parse(&p, json!({"count": 4})).unwrap(), json!({"count": 4}));
}

#[test]
fn test_parsing_does_not_check_requirements() {
    let p = parser(json!({
        "a": {"description": "a", "type": "number"},
        "b": {"description": "b", "type": "number"}
    }));
    assert_eq!(parse(&p, json!({"b": null})).unwrap(), json!({"b": null}));
}

#[test]
fn test_empty_strings_become_null_for_non_text_leaves() {
    let p = parser(json!({
        "n": {"description": "n", "type": "number"},
        "flag": {"description": "flag", "type": "boolean"},
        "size": {"description": "size", "oneOf": [1, 2]},
        "text": {"description": "text", "type": "string"}
    }));
    assert_eq!(
        parse(&p, json!({"n": "", "flag": "", "size": "", "text": ""})).unwrap(),
        json!({"n": null, "flag": null, "size": null, "text": ""})
    );
}

#[test]
fn test_one_of_literals_are_coerced() {
    let p = parser(json!({
        "size": {"description": "size", "oneOf": [1, 2]},
        "mode": {"description": "mode", "oneOf": ["a", "b"]}
    }));
    assert_eq!(
        parse(&p, json!({"size": "2", "mode": "b"})).unwrap(),
        json!({"size": 2, "mode": "b"})
    );

    let err = parse(&p, json!({"size": "3"})).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Invalid);
    assert_eq!(err.message, "size must be one of the following values: 1, 2");
}

#[test]
fn test_flat_containers_are_decoded_once() {
    let p = flat_parser(json!({
        "ids": {"description": "ids", "arrayOf": "number"},
        "rows": {"description": "rows", "arrayOf": {"description": "row", "arrayOf": "number"}, "required": false},
        "filter": {"kind": {"description": "kind", "type": "string"}}
    }));
    let parsed = parse(&p, json!({"ids": "[\"1\", 2]", "filter": "{\"kind\": \"x\"}"})).unwrap();
    assert_eq!(parsed, json!({"ids": [1, 2], "filter": {"kind": "x"}}));

    // Strings below a decoded container are plain text, never JSON again.
    let err = parse(&p, json!({"ids": "[]", "rows": "[\"[1]\"]"})).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unsupported);
    assert_eq!(err.path.to_string(), "rows[0]");
}

#[test]
fn test_flat_nested_object_text() {
    let p = flat_parser(json!({"object": {"a": {"b": {"type": "string"}}}}));
    assert_eq!(
        parse(&p, json!({"object": "{\"a\":{\"b\":\"c\"}}"})).unwrap(),
        json!({"object": {"a": {"b": "c"}}})
    );
}

#[test]
fn test_parsed_values_validate() {
    let raw = json!({
        "n": {"description": "n", "type": "number"},
        "i": {"description": "i", "type": "integer"},
        "flag": {"description": "flag", "type": "boolean"},
        "at": {"description": "at", "type": "date"}
    });
    let p = parser(raw.clone());
    let v = Validator::new(&schema(raw), ValidatorOptions::default()).unwrap();

    let parsed = p
        .parse(Value::from(json!({
            "n": "-2.5",
            "i": "42",
            "flag": "false",
            "at": "2000-01-01T12:30:00.250Z"
        })))
        .unwrap();
    let at = DateFormat::Iso.parse("2000-01-01T12:30:00.250Z").unwrap();
    assert_eq!(parsed.get("n"), Value::from_f64(-2.5).as_ref());
    assert_eq!(parsed.get("i"), Some(&Value::from(42_i64)));
    assert_eq!(parsed.get("flag"), Some(&Value::from(false)));
    assert_eq!(parsed.get("at"), Some(&Value::Date(at)));
    assert!(v.validate(parsed).is_ok());
}

#[test]
fn test_flat_decoding_errors() {
    let p = flat_parser(json!({"ids": {"description": "ids", "arrayOf": "number"}}));

    let err = parse(&p, json!({"ids": "[1,"})).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Invalid);
    assert!(err.message.starts_with("ids must be an array encoded as JSON"));

    let err = parse(&p, json!({"ids": "{}"})).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unsupported);

    assert_eq!(parse(&p, json!({"ids": ""})).unwrap(), json!({"ids": null}));

    let err = parse(&p, json!({"other": "1"})).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unknown);
    assert_eq!(err.message, "other is not allowed");
}

#[test]
fn test_structured_mode_rejects_encoded_containers() {
    let p = parser(json!({"ids": {"description": "ids", "arrayOf": "number"}}));
    let err = parse(&p, json!({"ids": "[1, 2]"})).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unsupported);
    assert_eq!(err.message, "ids must be an array");
}

#[test]
fn test_date_format_sensitivity() {
    let raw = json!({"at": {"description": "at", "type": "date"}});

    let iso = parser(raw.clone());
    let parsed = iso
        .parse(Value::from(json!({"at": "2000-01-01T00:00:00.000Z"})))
        .unwrap();
    assert!(matches!(parsed.get("at"), Some(Value::Date(_))));

    let err = parse(&iso, json!({"at": "2000-01-01"})).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Invalid);
    assert_eq!(err.message, "at must be a date in the format yyyy-mm-ddThh:mm:ss.sssZ");

    let ymd = Parser::new(
        &schema(raw),
        ParserOptions::default().with_date_format(DateFormat::YearMonthDay),
    )
    .unwrap();
    let parsed = ymd.parse(Value::from(json!({"at": "2000-01-01"}))).unwrap();
    assert_eq!(
        parsed.get("at"),
        Some(&Value::Date(DateFormat::YearMonthDay.parse("2000-01-01").unwrap()))
    );
    assert!(parse(&ymd, json!({"at": "2000-01-01T00:00:00.000Z"})).is_err());
}

#[test]
fn test_parse_dates_only() {
    let p = Parser::new(
        &schema(json!({
            "at": {"description": "at", "type": "date"},
            "n": {"description": "n", "type": "number"},
            "size": {"description": "size", "oneOf": [1, 2]}
        })),
        ParserOptions::default().with_parse_dates_only(true),
    )
    .unwrap();
    let parsed = p
        .parse(Value::from(json!({"at": "2000-01-01T00:00:00.000Z", "n": "5", "size": "9"})))
        .unwrap();
    assert!(matches!(parsed.get("at"), Some(Value::Date(_))));
    assert_eq!(parsed.get("n"), Some(&Value::from("5")));
    assert_eq!(parsed.get("size"), Some(&Value::from("9")));
}

#[test]
fn test_union_resolution_on_raw_strings() {
    let p = parser(json!({
        "v": {
            "description": "v",
            "oneOfType": [
                {"description": "count", "is": "number", "type": "number"},
                {"description": "flag", "is": "boolean", "type": "boolean"}
            ]
        }
    }));
    assert_eq!(parse(&p, json!({"v": "12"})).unwrap(), json!({"v": 12}));
    assert_eq!(parse(&p, json!({"v": "true"})).unwrap(), json!({"v": true}));
    assert_eq!(parse(&p, json!({"v": false})).unwrap(), json!({"v": false}));
    assert_eq!(parse(&p, json!({"v": ""})).unwrap(), json!({"v": null}));

    let err = parse(&p, json!({"v": "1"})).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Ambiguous);
    assert_eq!(
        err.message,
        "v could be parsed as more than one type variation: \"count\", \"flag\""
    );

    let err = parse(&p, json!({"v": "x"})).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unsupported);
}

#[test]
fn test_flat_bracket_values_in_unions() {
    let variations = |text: serde_json::Value| {
        json!({
            "v": {
                "description": "v",
                "oneOfType": [
                    text,
                    {"description": "list", "is": "string[]", "arrayOf": "string"}
                ]
            }
        })
    };

    let literal_clash = flat_parser(variations(
        json!({"description": "tag", "is": "string", "oneOf": ["[x]", "y"]}),
    ));
    let err = parse(&literal_clash, json!({"v": "[\"a\"]"})).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Ambiguous);
    assert_eq!(err.message, "v could be text or an array encoded as JSON");

    let free_text = flat_parser(variations(json!({"description": "tag", "is": "string", "type": "string"})));
    assert_eq!(
        parse(&free_text, json!({"v": "[\"a\"]"})).unwrap_err().kind,
        ErrorKind::Ambiguous
    );

    let no_clash = flat_parser(variations(
        json!({"description": "tag", "is": "string", "oneOf": ["x", "y"]}),
    ));
    assert_eq!(parse(&no_clash, json!({"v": "[\"a\"]"})).unwrap(), json!({"v": ["a"]}));
    assert_eq!(parse(&no_clash, json!({"v": "y"})).unwrap(), json!({"v": "y"}));
}

#[test]
fn test_flat_brace_values_in_unions() {
    let variations = |text: serde_json::Value| {
        json!({
            "v": {
                "description": "v",
                "oneOfType": [
                    text,
                    {"description": "point", "is": "object", "schema": {"x": {"description": "x", "type": "number"}}}
                ]
            }
        })
    };

    let codes = flat_parser(variations(json!({"description": "code", "is": "string", "oneOf": ["a", "b"]})));
    assert_eq!(parse(&codes, json!({"v": "{\"x\": \"2\"}"})).unwrap(), json!({"v": {"x": 2}}));
    assert_eq!(parse(&codes, json!({"v": "b"})).unwrap(), json!({"v": "b"}));

    let err = parse(&codes, json!({"v": "{x"})).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Invalid);
    assert!(err.message.starts_with("v must be an object encoded as JSON"));

    let clash = flat_parser(variations(json!({"description": "code", "is": "string", "oneOf": ["{x}", "b"]})));
    let err = parse(&clash, json!({"v": "{\"x\": \"2\"}"})).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Ambiguous);
    assert_eq!(err.message, "v could be text or an object encoded as JSON");
}

#[test]
fn test_text_or_number_unions_are_ambiguous_on_digits() {
    let raw = json!({
        "id": {
            "description": "id",
            "oneOfType": [
                {"description": "slug", "is": "string", "type": "string"},
                {"description": "serial", "is": "number", "type": "integer"}
            ]
        }
    });
    for p in [parser(raw.clone()), flat_parser(raw)] {
        let err = parse(&p, json!({"id": "12"})).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Ambiguous);
        assert_eq!(parse(&p, json!({"id": "abc"})).unwrap(), json!({"id": "abc"}));
        assert_eq!(parse(&p, json!({"id": 12})).unwrap(), json!({"id": 12}));
    }
}

#[test]
fn test_parse_dates_only_through_unions() {
    let p = Parser::new(
        &schema(json!({
            "at": {
                "description": "at",
                "oneOfType": [
                    {"description": "when", "is": "date", "type": "date"},
                    {"description": "offset", "is": "number", "type": "integer"}
                ]
            },
            "days": {
                "description": "days",
                "oneOfType": [
                    {"description": "dates", "is": "date[]", "arrayOf": "date"},
                    {"description": "counts", "is": "number[]", "arrayOf": "number"}
                ]
            },
            "id": {
                "description": "id",
                "oneOfType": [
                    {"description": "slug", "is": "string", "type": "string"},
                    {"description": "serial", "is": "number", "type": "integer"}
                ]
            }
        })),
        ParserOptions::default().with_parse_dates_only(true),
    )
    .unwrap();
    let date = DateFormat::Iso.parse("2000-01-01T00:00:00.000Z").unwrap();

    let parsed = p
        .parse(Value::from(json!({
            "at": "2000-01-01T00:00:00.000Z",
            "days": ["2000-01-01T00:00:00.000Z"],
            "id": "12"
        })))
        .unwrap();
    assert_eq!(parsed.get("at"), Some(&Value::Date(date)));
    assert_eq!(parsed.get("days"), Some(&Value::Array(vec![Value::Date(date)])));
    assert_eq!(parsed.get("id"), Some(&Value::from("12")));

    let untouched = p.parse(Value::from(json!({"at": "soon", "days": [1, 2]}))).unwrap();
    assert_eq!(serde_json::Value::from(untouched), json!({"at": "soon", "days": [1, 2]}));
}

#[test]
fn test_parse_property_hook() {
    let raw = json!({
        "at": {"description": "at", "type": "timestamp"},
        "code": {"description": "code", "type": "upper"}
    });
    assert!(matches!(
        Parser::new(&schema(raw.clone()), ParserOptions::default()),
        Err(SchemaDefinitionError::UnknownType { .. })
    ));

    let p = Parser::new(
        &schema(raw),
        ParserOptions::default().with_parse_property(|type_name, raw, parse_as| match type_name {
            "timestamp" => parse_as("positiveInteger"),
            _ => Ok(Value::from(raw.to_uppercase())),
        }),
    )
    .unwrap();
    assert_eq!(
        parse(&p, json!({"at": "1700000000", "code": "ab"})).unwrap(),
        json!({"at": 1700000000, "code": "AB"})
    );

    let err = parse(&p, json!({"at": "-1"})).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Invalid);
    assert_eq!(err.path.to_string(), "at");
}

#[test]
fn test_unhandled_type_names_are_unsupported_types() {
    let p = Parser::new(
        &schema(json!({"link": {"description": "link", "type": "hyperlink"}})),
        ParserOptions::default().with_parse_property(|_, _, parse_as| parse_as("weblink")),
    )
    .unwrap();
    let err = parse(&p, json!({"link": "x"})).unwrap_err();
    assert_eq!(err.kind, ErrorKind::UnsupportedType);
    assert_eq!(err.kind.to_string(), "unsupported-type");
    assert_eq!(err.message, "link has unsupported type weblink");
}

#[test]
fn test_error_hook_remaps_errors() {
    let p = Parser::new(
        &schema(json!({"n": {"description": "n", "type": "number"}})),
        ParserOptions::default().with_error_hook(|mut err| {
            err.message = format!("bad input: {}", err.message);
            err
        }),
    )
    .unwrap();
    let err = parse(&p, json!({"n": "abc"})).unwrap_err();
    assert_eq!(err.message, "bad input: n must be a number");
}

#[test]
fn test_object_of_keys() {
    let p = parser(json!({
        "prices": {"description": "prices", "objectOf": "number", "keyOneOf": ["eur", "usd"]}
    }));
    assert_eq!(
        parse(&p, json!({"prices": {"eur": "1.5"}})).unwrap(),
        json!({"prices": {"eur": 1.5}})
    );
    let err = parse(&p, json!({"prices": {"gbp": "1"}})).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Unknown);
    assert_eq!(err.path.to_string(), "prices.gbp");
}

struct Cents;

impl CustomType for Cents {
    fn validate(&self, value: &Value) -> Result<(), String> {
        value.as_f64().map(|_| ()).ok_or_else(|| "must be an amount in cents".to_string())
    }

    fn parse(&self, raw: &str) -> Result<Value, String> {
        let (units, cents) = raw.split_once('.').unwrap_or((raw, "0"));
        let units: i64 = units.parse().map_err(|_| "must be an amount".to_string())?;
        let cents: i64 = cents.parse().map_err(|_| "must be an amount".to_string())?;
        Ok(Value::from(units * 100 + cents))
    }
}

#[test]
fn test_custom_type_parsing() {
    let mut registry = TypeRegistry::new();
    registry.register("cents", Cents);
    let p = Parser::new(
        &schema(json!({"price": {"description": "price", "type": "cents"}})),
        ParserOptions::default().with_registry(Arc::new(registry)),
    )
    .unwrap();
    assert_eq!(parse(&p, json!({"price": "12.34"})).unwrap(), json!({"price": 1234}));

    let err = parse(&p, json!({"price": "twelve"})).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Invalid);
    assert_eq!(err.message, "price must be an amount");
}

#[test]
fn test_parse_in_place() {
    let p = parser(json!({"n": {"description": "n", "type": "integer"}}));
    let mut value = Value::from(json!({"n": "7"}));
    p.parse_in_place(&mut value).unwrap();
    assert_eq!(value.get("n"), Some(&Value::from(7_i64)));
}
