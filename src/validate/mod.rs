use std::sync::OnceLock;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use regex::Regex;
use serde_json::{Map, Value};

use crate::errors::GenerationError;
use crate::wire::{ColorPalette, FieldValues, Metadata, PageConfig, SectionKind, SiteConfig, Theme};

const REQUIRED: [&str; 3] = ["theme", "pages", "colorPalette"];

fn hex_color() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^#(?:[0-9a-fA-F]{3}|[0-9a-fA-F]{6}|[0-9a-fA-F]{8})$")
            .expect("hex colour pattern is valid")
    })
}

fn code_fence() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?s)^```[a-zA-Z]*\s*(.*?)\s*```$").expect("code fence pattern is valid")
    })
}

pub fn is_hex_color(s: &str) -> bool {
    hex_color().is_match(s.trim())
}

/// Parses and checks raw model output, returning a normalized `SiteConfig`.
///
/// A response missing any of `theme`, `pages` (as an array) or `colorPalette`
/// is rejected outright; nothing is synthesized for required keys.
pub fn validate(raw: &str) -> Result<SiteConfig, GenerationError> {
    let value = parse_lenient(raw)?;

    let missing: Vec<&str> = REQUIRED
        .iter()
        .copied()
        .filter(|key| !has_required(&value, key))
        .collect();
    if !missing.is_empty() {
        tracing::warn!(missing = ?missing, "model response failed schema check");
        return Err(GenerationError::Schema { missing: missing.join(", ") });
    }

    let theme = Theme::parse(value["theme"].as_str().unwrap_or_default());
    let color_palette = palette(&value["colorPalette"], theme);
    let metadata = value.get("metadata").map(metadata).unwrap_or_default();
    let pages = pages(value["pages"].as_array().map(Vec::as_slice).unwrap_or_default());

    Ok(SiteConfig { theme, metadata, color_palette, pages, images: Vec::new() })
}

fn has_required(value: &Value, key: &str) -> bool {
    match (key, value.get(key)) {
        (_, None) | (_, Some(Value::Null)) => false,
        ("theme", Some(v)) => v.is_string(),
        ("pages", Some(v)) => v.is_array(),
        ("colorPalette", Some(v)) => v.is_object(),
        _ => true,
    }
}

/// Strict parse first; then tolerate a markdown fence or prose around a single
/// JSON object.
fn parse_lenient(raw: &str) -> Result<Value, GenerationError> {
    let trimmed = raw.trim();
    let first_err = match serde_json::from_str::<Value>(trimmed) {
        Ok(v) => return Ok(v),
        Err(e) => e,
    };

    if let Some(caps) = code_fence().captures(trimmed) {
        if let Ok(v) = serde_json::from_str::<Value>(&caps[1]) {
            return Ok(v);
        }
    }
    if let Some(obj) = extract_first_json_object(trimmed) {
        if let Ok(v) = serde_json::from_str::<Value>(obj) {
            return Ok(v);
        }
    }

    tracing::warn!(error = %first_err, raw_bytes = raw.len(), "model response is not JSON");
    Err(GenerationError::Parse { detail: first_err.to_string() })
}

/// Extracts the first top-level `{...}` substring, honouring nesting and
/// braces inside string literals.
fn extract_first_json_object(s: &str) -> Option<&str> {
    let mut start = None;
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;

    for (i, b) in s.bytes().enumerate() {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' if start.is_some() => in_string = true,
            b'{' => {
                start.get_or_insert(i);
                depth += 1;
            }
            b'}' if depth > 0 => {
                depth -= 1;
                if depth == 0 {
                    return start.map(|st| &s[st..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

fn palette(v: &Value, theme: Theme) -> ColorPalette {
    let fallback = theme.default_palette();
    let pick = |key: &str, default: String| -> String {
        match v.get(key).and_then(Value::as_str) {
            Some(s) if is_hex_color(s) => s.trim().to_string(),
            _ => default,
        }
    };
    ColorPalette {
        primary: pick("primary", fallback.primary),
        secondary: pick("secondary", fallback.secondary),
        accent: pick("accent", fallback.accent),
        background: pick("background", fallback.background),
        text: pick("text", fallback.text),
    }
}

fn non_blank(v: Option<&Value>) -> Option<String> {
    v.and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn metadata(v: &Value) -> Metadata {
    Metadata {
        title: non_blank(v.get("title")),
        description: non_blank(v.get("description")),
        recipient_name: non_blank(v.get("recipientName")),
        occasion: non_blank(v.get("occasion")),
        created_at: v.get("createdAt").and_then(coerce_date),
    }
}

/// Accepts RFC 3339, naive date-times, plain dates and epoch milliseconds.
pub fn coerce_date(v: &Value) -> Option<DateTime<Utc>> {
    match v {
        Value::String(s) => {
            let s = s.trim();
            if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
                return Some(dt.with_timezone(&Utc));
            }
            for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S"] {
                if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
                    return Some(Utc.from_utc_datetime(&naive));
                }
            }
            NaiveDate::parse_from_str(s, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|naive| Utc.from_utc_datetime(&naive))
        }
        Value::Number(n) => n.as_i64().and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
        _ => None,
    }
}

fn order_of(v: Option<&Value>) -> Option<i64> {
    match v? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn pages(raw: &[Value]) -> Vec<PageConfig> {
    let mut out: Vec<PageConfig> = Vec::with_capacity(raw.len());
    for (idx, page) in raw.iter().enumerate() {
        let Some(obj) = page.as_object() else {
            tracing::warn!(index = idx, "dropping non-object page");
            continue;
        };
        let Some(kind) = obj.get("type").and_then(Value::as_str).filter(|t| !t.trim().is_empty()) else {
            tracing::warn!(index = idx, "dropping page without a type");
            continue;
        };
        let content: FieldValues = match obj.get("content") {
            Some(Value::Object(map)) => map.clone(),
            _ => Map::new(),
        };
        out.push(PageConfig {
            kind: SectionKind::parse(kind),
            order: order_of(obj.get("order")).unwrap_or(idx as i64),
            content,
        });
    }

    out.sort_by_key(|p| p.order);
    if out.windows(2).any(|w| w[0].order == w[1].order) {
        tracing::debug!("renumbering pages with duplicate order values");
        for (i, p) in out.iter_mut().enumerate() {
            p.order = i as i64;
        }
    }
    out
}
