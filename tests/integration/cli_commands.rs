//! Integration tests for the offline CLI commands

use assert_cmd::Command;
use miso_data_downloader::cli::validate::{ValidateCommand, ValidateTarget};
use miso_data_downloader::Dataset;

#[test]
fn test_validate_known_identifier() {
    let cmd = ValidateCommand {
        target: ValidateTarget::Identifier {
            identifier: "MINN.HUB".to_string(),
            dataset: Some(Dataset::DayAheadLmp),
        },
    };
    assert!(cmd.execute().is_ok());
}

#[test]
fn test_validate_unregistered_identifier_is_still_valid() {
    let cmd = ValidateCommand {
        target: ValidateTarget::Identifier {
            identifier: "AMIL.BGS6".to_string(),
            dataset: Some(Dataset::RealTimeLmp),
        },
    };
    assert!(cmd.execute().is_ok());
}

#[test]
fn test_validate_invalid_identifier() {
    let cmd = ValidateCommand {
        target: ValidateTarget::Identifier {
            identifier: "MINN HUB/../x".to_string(),
            dataset: None,
        },
    };
    assert!(cmd.execute().is_err());
}

#[test]
fn test_validate_range() {
    let ok = ValidateCommand {
        target: ValidateTarget::Range {
            start: "2023-04-01".to_string(),
            end: "2023-04-30".to_string(),
        },
    };
    assert!(ok.execute().is_ok());

    let reversed = ValidateCommand {
        target: ValidateTarget::Range {
            start: "2023-04-30".to_string(),
            end: "2023-04-01".to_string(),
        },
    };
    assert!(reversed.execute().is_err());
}

#[test]
fn test_binary_validate_range() {
    let output = Command::cargo_bin("miso-data-downloader")
        .unwrap()
        .args(["validate", "range", "2023-01-01", "2023-02-14"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Days (one request each): 45"), "{stdout}");
}

#[test]
fn test_binary_fetch_without_key_fails_before_any_request() {
    Command::cargo_bin("miso-data-downloader")
        .unwrap()
        .env_remove("MISO_API_KEY")
        .env_remove("MISO_LOAD_API_KEY")
        .args([
            "--base-url",
            "http://127.0.0.1:9",
            "fetch",
            "day-ahead",
            "--node",
            "MINN.HUB",
            "--start",
            "2023-04-01",
            "--end",
            "2023-04-03",
        ])
        .assert()
        .failure();
}

#[test]
fn test_binary_sources_json() {
    let output = Command::cargo_bin("miso-data-downloader")
        .unwrap()
        .args(["sources", "list", "--dataset", "load", "--format", "json"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let listing: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(listing[0]["dataset"], "load");
    assert_eq!(listing[0]["identifier_kind"], "region");
}
