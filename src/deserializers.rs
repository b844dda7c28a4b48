//! Forgiving deserializers for model-produced JSON.
//!
//! The upstream model is asked for an exact schema but routinely returns
//! numbers as strings ("85%", "1,200"), `null` for missing text, or a single
//! string where a list was requested. These helpers coerce those shapes into
//! the strict types used by the rest of the crate.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

static FIRST_DIGITS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\d{1,9}").expect("digit regex should compile"));

/// Placeholder used whenever the model leaves an evidence field blank.
pub const NOT_SPECIFIED: &str = "Not specified";

pub fn not_specified() -> String {
    NOT_SPECIFIED.to_string()
}

/// Parses a number out of a JSON value, tolerating `"85%"`, `"1,200"` and `"~40"`.
fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => {
            let cleaned: String = s
                .chars()
                .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
                .collect();
            cleaned.parse::<f64>().ok()
        }
        _ => None,
    }
}

/// Deserializes a confidence percentage, clamped into `0..=100`.
///
/// Accepts integers, floats, numeric strings and fractions (`0.85` → 85).
/// Unparseable values become 0 rather than failing the whole document.
pub fn de_percentage<'de, D>(deserializer: D) -> Result<u8, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    let Some(mut val) = numeric(&value) else {
        return Ok(0);
    };
    if !val.is_finite() {
        return Ok(0);
    }
    if val > 0.0 && val < 1.0 {
        val *= 100.0;
    }
    Ok(val.round().clamp(0.0, 100.0) as u8)
}

/// Deserializes a non-negative count (citations), defaulting to 0.
pub fn de_count<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(numeric(&value)
        .filter(|v| v.is_finite())
        .map(|v| v.round().clamp(0.0, u32::MAX as f64) as u32)
        .unwrap_or(0))
}

/// Deserializes a calendar year given as a number or a string. Strings such
/// as `"2019-2021"` or `"circa 2020"` yield their first run of digits.
pub fn de_year<'de, D>(deserializer: D) -> Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let value = Value::deserialize(deserializer)?;
    let year = match &value {
        Value::Number(n) => n
            .as_f64()
            .filter(|v| v.is_finite())
            .map(|v| v.round() as i32),
        Value::String(s) => FIRST_DIGITS
            .find(s)
            .and_then(|m| m.as_str().parse::<i32>().ok()),
        _ => None,
    };
    year.ok_or_else(|| D::Error::custom(format!("invalid year: {}", value)))
}

/// Deserializes an evidence string; `null` or blank becomes [`NOT_SPECIFIED`].
pub fn de_evidence_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.trim().is_empty() => s,
        Some(Value::Number(n)) => n.to_string(),
        _ => not_specified(),
    })
}

/// Deserializes free text; `null` becomes an empty string and scalars are
/// stringified.
pub fn de_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s,
        Some(other) => other.to_string(),
    })
}

/// Deserializes a list of strings, accepting a lone string or `null` as well.
pub fn de_string_list<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::String(s)) if s.trim().is_empty() => Vec::new(),
        Some(Value::String(s)) => vec![s],
        Some(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(s) => Some(s),
                Value::Null => None,
                other => Some(other.to_string()),
            })
            .collect(),
        Some(other) => vec![other.to_string()],
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Deserialize)]
    struct Fields {
        #[serde(deserialize_with = "de_percentage")]
        pct: u8,
        #[serde(default, deserialize_with = "de_count")]
        count: u32,
        #[serde(default, deserialize_with = "de_string_list")]
        list: Vec<String>,
    }

    #[test]
    fn percentage_accepts_strings_and_fractions() {
        let p: Fields = serde_json::from_str(r#"{"pct":"85%"}"#).unwrap();
        assert_eq!(p.pct, 85);
        let p: Fields = serde_json::from_str(r#"{"pct":0.7}"#).unwrap();
        assert_eq!(p.pct, 70);
        let p: Fields = serde_json::from_str(r#"{"pct":250}"#).unwrap();
        assert_eq!(p.pct, 100);
        let p: Fields = serde_json::from_str(r#"{"pct":"high"}"#).unwrap();
        assert_eq!(p.pct, 0);
    }

    #[test]
    fn count_strips_separators() {
        let p: Fields = serde_json::from_str(r#"{"pct":1,"count":"1,200"}"#).unwrap();
        assert_eq!(p.count, 1200);
    }

    #[derive(Deserialize)]
    struct Dated {
        #[serde(deserialize_with = "de_year")]
        year: i32,
        #[serde(default, deserialize_with = "de_text")]
        note: String,
    }

    #[test]
    fn year_takes_first_digit_run() {
        let d: Dated = serde_json::from_str(r#"{"year":"2019-2021"}"#).unwrap();
        assert_eq!(d.year, 2019);
        let d: Dated = serde_json::from_str(r#"{"year":"circa 2020"}"#).unwrap();
        assert_eq!(d.year, 2020);
        let d: Dated = serde_json::from_str(r#"{"year":2018}"#).unwrap();
        assert_eq!(d.year, 2018);
        assert!(serde_json::from_str::<Dated>(r#"{"year":"unknown"}"#).is_err());
    }

    #[test]
    fn text_tolerates_null_and_numbers() {
        let d: Dated = serde_json::from_str(r#"{"year":2020,"note":null}"#).unwrap();
        assert_eq!(d.note, "");
        let d: Dated = serde_json::from_str(r#"{"year":2020,"note":42}"#).unwrap();
        assert_eq!(d.note, "42");
    }

    #[test]
    fn list_accepts_single_string() {
        let p: Fields = serde_json::from_str(r#"{"pct":1,"list":"only one"}"#).unwrap();
        assert_eq!(p.list, vec!["only one".to_string()]);
        let p: Fields = serde_json::from_str(r#"{"pct":1,"list":null}"#).unwrap();
        assert!(p.list.is_empty());
    }
}
