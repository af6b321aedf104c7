use std::{net::IpAddr, sync::OnceLock};

use graphql_transformer_core::document::SchemaDocument;
use regex::Regex;

static DATE: OnceLock<Regex> = OnceLock::new();
static TIME: OnceLock<Regex> = OnceLock::new();
static DATE_TIME: OnceLock<Regex> = OnceLock::new();
static EMAIL: OnceLock<Regex> = OnceLock::new();
static PHONE: OnceLock<Regex> = OnceLock::new();

const OFFSET: &str = r"(Z|[+-]\d{2}:\d{2}(:\d{2})?)";

fn is_date(value: &str) -> bool {
    DATE.get_or_init(|| Regex::new(&format!(r"^\d{{4}}-\d{{2}}-\d{{2}}{OFFSET}?$")).unwrap())
        .is_match(value)
}

fn is_time(value: &str) -> bool {
    TIME.get_or_init(|| Regex::new(&format!(r"^\d{{2}}:\d{{2}}(:\d{{2}}(\.\d{{1,9}})?)?{OFFSET}?$")).unwrap())
        .is_match(value)
}

fn is_date_time(value: &str) -> bool {
    DATE_TIME
        .get_or_init(|| {
            Regex::new(&format!(r"^\d{{4}}-\d{{2}}-\d{{2}}T\d{{2}}:\d{{2}}(:\d{{2}}(\.\d{{1,9}})?)?{OFFSET}$")).unwrap()
        })
        .is_match(value)
}

fn is_email(value: &str) -> bool {
    EMAIL
        .get_or_init(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap())
        .is_match(value)
}

fn is_phone(value: &str) -> bool {
    PHONE
        .get_or_init(|| Regex::new(r"^\+?[\d\s().-]{3,}$").unwrap())
        .is_match(value)
}

fn is_ip_address(value: &str) -> bool {
    let (address, prefix_is_valid) = match value.split_once('/') {
        Some((address, prefix)) => (address, prefix.parse::<u8>().is_ok()),
        None => (value, true),
    };
    prefix_is_valid && address.parse::<IpAddr>().is_ok()
}

/// Check that the string given to `@default` is a valid literal of `type_name`. Enum values must be
/// declared by the enum.
pub fn validate_default_value(document: &SchemaDocument, type_name: &str, value: &str) -> Result<(), String> {
    let valid = match type_name {
        "String" | "ID" => true,
        "Int" => value.parse::<i32>().is_ok(),
        "Float" => value.parse::<f64>().is_ok_and(f64::is_finite),
        "Boolean" => matches!(value, "true" | "false"),
        "AWSJSON" => serde_json::from_str::<serde_json::Value>(value).is_ok(),
        "AWSDate" => is_date(value),
        "AWSTime" => is_time(value),
        "AWSDateTime" => is_date_time(value),
        "AWSTimestamp" => value.parse::<i64>().is_ok(),
        "AWSEmail" => is_email(value),
        "AWSURL" => url::Url::parse(value).is_ok(),
        "AWSPhone" => is_phone(value),
        "AWSIPAddress" => is_ip_address(value),
        enum_name if document.is_enum(enum_name) => document.enum_values(enum_name).contains(&value),
        _ => false,
    };

    if valid {
        Ok(())
    } else {
        Err(format!("Default value \"{value}\" is not a valid {type_name}."))
    }
}

/// The VTL literal of a validated default value.
pub(crate) fn literal(type_name: &str, value: &str) -> String {
    match type_name {
        "Int" | "Float" | "Boolean" | "AWSTimestamp" => value.to_owned(),
        _ => serde_json::Value::String(value.to_owned()).to_string(),
    }
}
