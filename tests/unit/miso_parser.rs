//! Unit tests for the MISO envelope parser

use miso_data_downloader::fetcher::miso_parser::MisoParser;
use miso_data_downloader::fetcher::FetcherError;
use serde_json::{json, Value};

#[test]
fn test_real_time_payload_keeps_column_order() {
    let body = br#"{
        "data": [
            {"interval": "2023-04-01T00:05:00", "node": "ILLINOIS.HUB", "lmp": 24.1, "mlc": 0.8, "mcc": -1.2},
            {"interval": "2023-04-01T00:10:00", "node": "ILLINOIS.HUB", "lmp": 23.7, "mlc": 0.7, "mcc": -1.0}
        ]
    }"#;

    let table = MisoParser::parse_body(body).unwrap();
    assert_eq!(table.columns(), &["interval", "node", "lmp", "mlc", "mcc"]);
    assert_eq!(table.len(), 2);
    assert_eq!(table.get(0, "interval"), Some(&json!("2023-04-01T00:05:00")));
}

#[test]
fn test_ragged_rows_are_null_filled() {
    let table = MisoParser::parse_envelope(json!({
        "data": [
            {"hourEnding": 1, "loadForecast": 1000},
            {"hourEnding": 2, "loadForecast": 1100, "note": "revised"}
        ]
    }))
    .unwrap();

    assert_eq!(table.columns(), &["hourEnding", "loadForecast", "note"]);
    assert_eq!(table.get(0, "note"), Some(&Value::Null));
    assert_eq!(table.get(1, "note"), Some(&json!("revised")));
}

#[test]
fn test_extra_envelope_fields_ignored() {
    let table = MisoParser::parse_envelope(json!({
        "meta": {"count": 1},
        "data": [{"lmp": 1.0}]
    }))
    .unwrap();
    assert_eq!(table.columns(), &["lmp"]);
}

#[test]
fn test_malformed_payloads() {
    let cases: Vec<&[u8]> = vec![
        b"not json",
        b"[]",
        br#"{"rows": []}"#,
        br#"{"data": {"lmp": 1}}"#,
        br#"{"data": [1, 2]}"#,
        br#"{"data": []}"#,
    ];

    for body in cases {
        let err = MisoParser::parse_body(body).unwrap_err();
        assert!(
            matches!(err, FetcherError::Parse(_)),
            "{} should be a parse error, got {err:?}",
            String::from_utf8_lossy(body)
        );
    }
}
