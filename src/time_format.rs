use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Languages the relative-time labels can be rendered in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    English,
    Danish,
}

impl Locale {
    /// Parse a language tag such as `en`, `en-US`, `da` or `da-DK`
    pub fn from_tag(tag: &str) -> Option<Self> {
        let primary = tag.trim().split(['-', '_']).next()?.to_ascii_lowercase();
        match primary.as_str() {
            "en" | "english" => Some(Locale::English),
            "da" | "danish" => Some(Locale::Danish),
            _ => None,
        }
    }
}

/// Elapsed-time bucket, chosen by the first matching threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Elapsed {
    JustNow,
    Minutes(i64),
    Hours(i64),
    Days(i64),
    Weeks(i64),
    Months(i64),
    Years(i64),
}

impl Elapsed {
    pub fn between(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> Self {
        // Future timestamps (clock skew) land here too
        let seconds = (now - timestamp).num_seconds();
        if seconds < 60 {
            return Elapsed::JustNow;
        }

        let minutes = seconds / 60;
        if minutes < 60 {
            return Elapsed::Minutes(minutes);
        }

        let hours = minutes / 60;
        if hours < 24 {
            return Elapsed::Hours(hours);
        }

        let days = hours / 24;
        if days < 7 {
            return Elapsed::Days(days);
        }

        let weeks = days / 7;
        if weeks < 4 {
            return Elapsed::Weeks(weeks);
        }

        // 30-day months and 365-day years; floored at 1 so days 28-29 and
        // 360-364 never read as "0 months" / "0 years"
        let months = days / 30;
        if months < 12 {
            return Elapsed::Months(months.max(1));
        }

        Elapsed::Years((days / 365).max(1))
    }
}

/// Render `timestamp` relative to `now` in English, e.g. "3 minutes ago".
///
/// Returns an empty string when there is no timestamp.
pub fn relative_label(timestamp: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    relative_label_in(Locale::English, timestamp, now)
}

pub fn relative_label_in(locale: Locale, timestamp: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    match timestamp {
        Some(ts) => render(locale, Elapsed::between(ts, now)),
        None => String::new(),
    }
}

fn render(locale: Locale, elapsed: Elapsed) -> String {
    match locale {
        Locale::English => render_english(elapsed),
        Locale::Danish => render_danish(elapsed),
    }
}

fn render_english(elapsed: Elapsed) -> String {
    let (n, singular, plural) = match elapsed {
        Elapsed::JustNow => return "just now".to_string(),
        Elapsed::Minutes(n) => (n, "minute", "minutes"),
        Elapsed::Hours(n) => (n, "hour", "hours"),
        Elapsed::Days(n) => (n, "day", "days"),
        Elapsed::Weeks(n) => (n, "week", "weeks"),
        Elapsed::Months(n) => (n, "month", "months"),
        Elapsed::Years(n) => (n, "year", "years"),
    };

    if n == 1 {
        format!("1 {} ago", singular)
    } else {
        format!("{} {} ago", n, plural)
    }
}

fn render_danish(elapsed: Elapsed) -> String {
    let (n, singular, plural) = match elapsed {
        Elapsed::JustNow => return "lige nu".to_string(),
        Elapsed::Minutes(n) => (n, "minut", "minutter"),
        Elapsed::Hours(n) => (n, "time", "timer"),
        Elapsed::Days(n) => (n, "dag", "dage"),
        Elapsed::Weeks(n) => (n, "uge", "uger"),
        Elapsed::Months(n) => (n, "måned", "måneder"),
        Elapsed::Years(n) => (n, "år", "år"),
    };

    if n == 1 {
        format!("1 {} siden", singular)
    } else {
        format!("{} {} siden", n, plural)
    }
}
