use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::cli::OutputFormat;
use crate::time_format::{relative_label_in, Locale};

/// Output a success message in the appropriate format
pub fn output_success(output_format: &OutputFormat, message: &str, data: Option<Value>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message
            });

            if let (Some(target), Some(Value::Object(extra))) = (response.as_object_mut(), data) {
                target.extend(extra);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            println!("✓ {}", message);
        }
    }
    Ok(())
}

/// Output an error message in the appropriate format
pub fn output_error(output_format: &OutputFormat, message: &str, error_code: Option<&str>) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": false,
                "error": message
            });

            if let Some(code) = error_code {
                response["error_code"] = json!(code);
            }

            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        OutputFormat::Text => {
            eprintln!("Error: {}", message);
        }
    }
    Ok(())
}

/// Output an empty collection in the appropriate format
pub fn output_empty_collection(output_format: &OutputFormat, collection_name: &str, message: &str) -> anyhow::Result<()> {
    match output_format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&json!({ collection_name: [] }))?);
        }
        OutputFormat::Text => {
            println!("{}", message);
        }
    }
    Ok(())
}

pub fn output_json(value: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn str_at<'a>(value: &'a Value, pointer: &str) -> &'a str {
    value.pointer(pointer).and_then(Value::as_str).unwrap_or("")
}

fn timestamp_at(value: &Value, pointer: &str) -> Option<DateTime<Utc>> {
    value
        .pointer(pointer)
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|ts| ts.with_timezone(&Utc))
}

/// Column header for [`entry_row`]
pub fn entry_table_header() -> String {
    format!("{:<38} {:<30} {:<20} {}", "ID", "TITLE", "AUTHOR", "CREATED")
}

/// One line of `entry list`. Own entries are marked with `*`.
pub fn entry_row(entry: &Value, locale: Locale, now: DateTime<Utc>) -> String {
    let marker = match entry.pointer("/meta/is_owned_by_current_user") {
        Some(Value::Bool(true)) => "*",
        _ => " ",
    };
    let title: String = str_at(entry, "/attributes/title").chars().take(29).collect();

    format!(
        "{}{:<37} {:<30} {:<20} {}",
        marker,
        str_at(entry, "/id"),
        title,
        str_at(entry, "/meta/owner_label"),
        relative_label_in(locale, timestamp_at(entry, "/meta/created_at"), now)
    )
}

/// Multi-line detail view for `entry show`
pub fn entry_detail(entry: &Value, locale: Locale, now: DateTime<Utc>) -> String {
    let created = relative_label_in(locale, timestamp_at(entry, "/meta/created_at"), now);
    let updated = relative_label_in(locale, timestamp_at(entry, "/meta/updated_at"), now);

    let mut out = format!(
        "{}\nby {} · created {} · updated {}\n",
        str_at(entry, "/attributes/title"),
        str_at(entry, "/meta/owner_label"),
        created,
        updated
    );
    let body = str_at(entry, "/attributes/body");
    if !body.is_empty() {
        out.push('\n');
        out.push_str(body);
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn wire_entry(now: DateTime<Utc>, owned: bool) -> Value {
        json!({
            "id": "e1",
            "type": "journal_entry",
            "attributes": { "title": "Morning pages", "body": "Coffee first." },
            "meta": {
                "owner_label": "Ada",
                "created_at": (now - Duration::days(2)).to_rfc3339(),
                "updated_at": (now - Duration::seconds(10)).to_rfc3339(),
                "is_owned_by_current_user": owned
            }
        })
    }

    #[test]
    fn row_renders_relative_created_label() {
        let now = Utc::now();
        let row = entry_row(&wire_entry(now, true), Locale::English, now);
        assert!(row.starts_with("*e1"));
        assert!(row.contains("Morning pages"));
        assert!(row.ends_with("2 days ago"));

        let other = entry_row(&wire_entry(now, false), Locale::Danish, now);
        assert!(other.starts_with(" e1"));
        assert!(other.ends_with("2 dage siden"));
    }

    #[test]
    fn missing_timestamp_renders_empty_label() {
        let row = entry_row(&json!({ "id": "e2", "meta": {} }), Locale::English, Utc::now());
        assert!(row.trim_end().starts_with(" e2"));
    }

    #[test]
    fn detail_includes_body_and_both_labels() {
        let now = Utc::now();
        let detail = entry_detail(&wire_entry(now, true), Locale::English, now);
        assert!(detail.contains("created 2 days ago"));
        assert!(detail.contains("updated just now"));
        assert!(detail.contains("Coffee first."));
    }
}
