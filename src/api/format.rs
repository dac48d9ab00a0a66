use chrono::{DateTime, Utc};
use serde_json::{json, Value};

use crate::identity::Identity;
use crate::journal::JournalEntry;
use crate::time_format::{relative_label_in, Locale};

pub const ENTRY_TYPE: &str = "journal_entry";

/// Convert a JournalEntry into the public wire format
/// { id, type, attributes, meta, links }
///
/// Relative labels are rendered against `now` in the server's locale; the
/// absolute timestamps travel alongside them for clients that localize.
pub fn entry_to_api_value(entry: &JournalEntry, locale: Locale, now: DateTime<Utc>) -> Value {
    json!({
        "id": entry.id,
        "type": ENTRY_TYPE,
        "attributes": {
            "title": entry.title,
            "body": entry.body,
        },
        "meta": {
            "owner_id": entry.owner_id,
            "owner_label": entry.owner_label,
            "created_at": entry.created_at,
            "updated_at": entry.updated_at,
            "created_label": relative_label_in(locale, Some(entry.created_at), now),
            "updated_label": relative_label_in(locale, Some(entry.updated_at), now),
            "is_owned_by_current_user": entry.is_owned_by_current_user,
        },
        "links": entry_links(&entry.id),
    })
}

pub fn entries_to_api_value(entries: &[JournalEntry], locale: Locale, now: DateTime<Utc>) -> Vec<Value> {
    entries
        .iter()
        .map(|entry| entry_to_api_value(entry, locale, now))
        .collect()
}

pub fn entry_links(id: &str) -> Value {
    json!({
        "self": format!("/api/entries/{}", id),
        "page": format!("/entry/{}", id),
    })
}

/// Public view of an identity
pub fn identity_to_api_value(identity: &Identity) -> Value {
    json!({
        "id": identity.id,
        "email": identity.email,
        "display_name": identity.display_name,
        "label": identity.label(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn entry(now: DateTime<Utc>) -> JournalEntry {
        JournalEntry {
            id: "e1".into(),
            owner_id: "ada-id".into(),
            owner_label: "Ada".into(),
            title: "Morning".into(),
            body: "Coffee.".into(),
            created_at: now - Duration::hours(3),
            updated_at: now - Duration::minutes(1),
            is_owned_by_current_user: true,
        }
    }

    #[test]
    fn entry_wire_format_carries_labels_and_links() {
        let now = Utc::now();
        let value = entry_to_api_value(&entry(now), Locale::English, now);

        assert_eq!(value["type"], ENTRY_TYPE);
        assert_eq!(value["attributes"]["title"], "Morning");
        assert_eq!(value["meta"]["created_label"], "3 hours ago");
        assert_eq!(value["meta"]["updated_label"], "1 minute ago");
        assert_eq!(value["meta"]["is_owned_by_current_user"], true);
        assert_eq!(value["links"]["self"], "/api/entries/e1");
    }

    #[test]
    fn labels_follow_locale() {
        let now = Utc::now();
        let value = entry_to_api_value(&entry(now), Locale::Danish, now);
        assert_eq!(value["meta"]["created_label"], "3 timer siden");
    }

    #[test]
    fn identity_label_falls_back_to_email() {
        let identity = Identity {
            id: "u1".into(),
            display_name: None,
            email: "ada@example.com".into(),
        };
        assert_eq!(identity_to_api_value(&identity)["label"], "ada@example.com");
    }
}
