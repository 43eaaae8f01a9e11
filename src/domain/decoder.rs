//! Upstream schedule records and their conversion into domain events.
//!
//! Wire shape: a JSON array of objects. Field names follow the upstream API
//! (`docente`, `cod_modulo`, `cfu`, `aule`, `teams`, `cod_sdoppiamento`, ...).

use super::entities::{Classroom, EventDraft, TimetableEvent};
use super::errors::DomainError;
use chrono::NaiveDateTime;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::warn;

/// Fields every event record must carry.
pub const REQUIRED_FIELDS: [&str; 3] = ["title", "start", "end"];

/// One raw schedule record.
///
/// Optional fields are read leniently: a value of an unexpected type is
/// coerced when it can be, and dropped otherwise, without losing the record.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawEvent {
    #[serde(deserialize_with = "lenient_string")]
    pub title: String,
    #[serde(deserialize_with = "lenient_text")]
    pub start: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub end: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub docente: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub cod_modulo: Option<String>,
    /// Credits; arrives as a number or as text.
    pub cfu: Option<Value>,
    #[serde(deserialize_with = "lenient_text")]
    pub orario: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub periodo: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub calendarioperiodo: Option<String>,
    #[serde(deserialize_with = "lenient_list")]
    pub aule: Vec<RawClassroom>,
    #[serde(deserialize_with = "lenient_text")]
    pub teams: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub note: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub cod_sdoppiamento: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawClassroom {
    #[serde(deserialize_with = "lenient_string")]
    pub des_risorsa: String,
    #[serde(deserialize_with = "lenient_text")]
    pub des_indirizzo: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub des_piano: Option<String>,
    #[serde(deserialize_with = "lenient_text")]
    pub des_edificio: Option<String>,
    #[serde(deserialize_with = "lenient")]
    pub raw: Option<RawClassroomDetails>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawClassroomDetails {
    #[serde(deserialize_with = "lenient")]
    pub edificio: Option<RawBuilding>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawBuilding {
    #[serde(deserialize_with = "lenient")]
    pub geo: Option<RawGeo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RawGeo {
    #[serde(deserialize_with = "lenient_number")]
    pub lat: Option<f64>,
    #[serde(deserialize_with = "lenient_number")]
    pub lng: Option<f64>,
}

/// Strings as-is, numbers in their JSON form, anything else absent.
fn lenient_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn lenient_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    lenient_text(deserializer).map(Option::unwrap_or_default)
}

fn lenient_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<f64>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    })
}

fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(serde_json::from_value(Value::deserialize(deserializer)?).ok())
}

/// Array elements that do not decode are dropped; a non-array is an empty list.
fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items
            .into_iter()
            .filter_map(|item| serde_json::from_value(item).ok())
            .collect(),
        _ => Vec::new(),
    })
}

/// Structural check on a parsed payload: an array, possibly empty, whose first
/// element (if any) carries every required field.
pub fn validate_payload(payload: &Value) -> Result<&[Value], DomainError> {
    let items = payload
        .as_array()
        .ok_or_else(|| DomainError::InvalidPayload("expected a JSON array".to_string()))?;
    if let Some(first) = items.first() {
        let object = first.as_object().ok_or_else(|| {
            DomainError::InvalidPayload("first element is not an object".to_string())
        })?;
        if let Some(missing) = REQUIRED_FIELDS.iter().find(|f| !object.contains_key(**f)) {
            return Err(DomainError::InvalidPayload(format!(
                "first element lacks '{}'",
                missing
            )));
        }
    }
    Ok(items.as_slice())
}

/// True when [`validate_payload`] accepts the payload.
pub fn is_valid_payload(payload: &Value) -> bool {
    validate_payload(payload).is_ok()
}

/// Parses an upstream timestamp, ignoring any UTC offset or trailing `Z`.
///
/// Accepts `2026-02-15T10:00:00+01:00`, `2026-02-15T10:00:00Z`,
/// `2026-02-15T10:00:00.123`, `2026-02-15T10:00` and a space instead of `T`.
pub fn parse_timestamp(raw: &str) -> Result<NaiveDateTime, DomainError> {
    let local = strip_zone(raw.trim());
    const FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%d %H:%M",
    ];
    FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(local, fmt).ok())
        .ok_or_else(|| DomainError::Decode(format!("unparseable timestamp '{}'", raw)))
}

fn strip_zone(s: &str) -> &str {
    if let Some(stripped) = s.strip_suffix('Z').or_else(|| s.strip_suffix('z')) {
        return stripped;
    }
    // Offsets only appear after the time part; the date itself contains '-'.
    let time_from = s
        .find(|c: char| c == 'T' || c == ' ')
        .map(|i| i + 1)
        .unwrap_or(s.len());
    match s[time_from..].find(|c: char| c == '+' || c == '-') {
        Some(i) => &s[..time_from + i],
        None => s,
    }
}

/// Coerces the credit field; anything that is not a non-negative integer is dropped.
pub fn parse_credits(value: Option<&Value>) -> Option<u32> {
    match value? {
        Value::Number(n) => n.as_u64().and_then(|v| u32::try_from(v).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.filter(|v| !v.trim().is_empty())
}

impl From<RawClassroom> for Classroom {
    fn from(raw: RawClassroom) -> Self {
        let geo = raw
            .raw
            .and_then(|r| r.edificio)
            .and_then(|b| b.geo)
            .unwrap_or_default();
        Classroom {
            title: raw.des_risorsa,
            address: non_empty(raw.des_indirizzo),
            floor: non_empty(raw.des_piano),
            building: non_empty(raw.des_edificio),
            latitude: geo.lat,
            longitude: geo.lng,
        }
    }
}

/// Converts one raw record into an event.
pub fn decode_event(raw: RawEvent) -> Result<TimetableEvent, DomainError> {
    let start_raw = raw
        .start
        .as_deref()
        .ok_or_else(|| DomainError::Decode("missing 'start'".to_string()))?;
    let end_raw = raw
        .end
        .as_deref()
        .ok_or_else(|| DomainError::Decode("missing 'end'".to_string()))?;
    let start = parse_timestamp(start_raw)?;
    let end = parse_timestamp(end_raw)?;

    let draft = EventDraft {
        credits: parse_credits(raw.cfu.as_ref()),
        title: raw.title,
        professor: non_empty(raw.docente),
        module_code: non_empty(raw.cod_modulo),
        time_display: non_empty(raw.orario),
        teaching_period: non_empty(raw.periodo),
        calendar_period: non_empty(raw.calendarioperiodo),
        classrooms: raw
            .aule
            .into_iter()
            .map(Classroom::from)
            .collect(),
        teams_link: non_empty(raw.teams),
        notes: non_empty(raw.note),
        raw_group_code: non_empty(raw.cod_sdoppiamento),
    };
    let title = draft.title.clone();
    TimetableEvent::new(draft, start, end).ok_or_else(|| {
        DomainError::Decode(format!(
            "event '{}' ends before it starts ({} >= {})",
            title, start_raw, end_raw
        ))
    })
}

/// Decodes a validated batch. Records that fail are logged and skipped;
/// the result is sorted by start time.
pub fn decode_events(items: &[Value]) -> Vec<TimetableEvent> {
    let mut events: Vec<TimetableEvent> = items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let decoded = RawEvent::deserialize(item)
                .map_err(|e| DomainError::Decode(e.to_string()))
                .and_then(decode_event);
            match decoded {
                Ok(event) => Some(event),
                Err(e) => {
                    warn!(index, error = %e, "skipping undecodable record");
                    None
                }
            }
        })
        .collect();
    sort_by_start(&mut events);
    events
}

/// Stable sort by start time (ties keep arrival order).
pub fn sort_by_start(events: &mut [TimetableEvent]) {
    events.sort_by_key(|e| e.start);
}
