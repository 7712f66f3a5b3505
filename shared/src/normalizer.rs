//! Normalization of RocketRez tour schedule payloads.
//!
//! The upstream API is not consistent about how it wraps the schedule list or
//! how it spells field names, so every lookup goes through an ordered list of
//! candidate keys and every entry is processed in isolation: a malformed
//! entry is skipped, it never fails the batch.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde_json::{Map, Value};
use tracing::debug;

use crate::models::{CustomFields, NormalizedSchedule};

pub const DEFAULT_DURATION_MINUTES: i64 = 75;

/// Lower-cased substrings marking tour slots that are not for sale.
pub const EXCLUDED_NAME_KEYWORDS: [&str; 4] = ["private", "canceled", "cancelled", "test"];

/// Ordered candidate keys for one logical field, first match wins.
#[derive(Debug, Clone, Copy)]
pub struct FieldChain(pub &'static [&'static str]);

pub const TOUR_NAME: FieldChain = FieldChain(&["TourName", "tourName", "name", "title"]);
pub const START_TIME: FieldChain = FieldChain(&["StartTime", "startTime", "start"]);
pub const END_TIME: FieldChain = FieldChain(&["EndTime", "endTime", "end"]);
pub const AVAILABLE: FieldChain = FieldChain(&["Available", "available", "seats"]);
pub const DURATION: FieldChain = FieldChain(&["Duration", "duration"]);
pub const SCHEDULE_ID: FieldChain = FieldChain(&["ScheduleId", "scheduleId", "id"]);
pub const TOUR_ID: FieldChain = FieldChain(&["TourId", "tourId"]);
pub const CUSTOM_FIELD_1: FieldChain = FieldChain(&["CustomFieldValue1", "description"]);
pub const CUSTOM_FIELD_2: FieldChain = FieldChain(&["CustomFieldValue2"]);
pub const CUSTOM_FIELD_3: FieldChain = FieldChain(&["CustomFieldValue3"]);
pub const CUSTOM_FIELD_4: FieldChain = FieldChain(&["CustomFieldValue4"]);

impl FieldChain {
    /// First value that is neither null nor an empty string.
    pub fn first_present<'a>(&self, entry: &'a Map<String, Value>) -> Option<&'a Value> {
        self.0
            .iter()
            .filter_map(|key| entry.get(*key))
            .find(|value| match value {
                Value::Null => false,
                Value::String(s) => !s.is_empty(),
                _ => true,
            })
    }

    /// First non-empty textual value. Numbers are accepted and rendered as text.
    pub fn first_text(&self, entry: &Map<String, Value>) -> Option<String> {
        self.0.iter().filter_map(|key| entry.get(*key)).find_map(|value| match value {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
    }

    /// Integer value of the first present key, `default` when none is present.
    pub fn integer_or(
        &self,
        entry: &Map<String, Value>,
        default: i64,
    ) -> Result<i64, SkipReason> {
        match self.first_present(entry) {
            None => Ok(default),
            Some(value) => parse_integer(value).ok_or(SkipReason::MalformedField(self.0[0])),
        }
    }
}

fn parse_integer(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(|f| f.trunc() as i64)
            })
        }
        _ => None,
    }
}

const DATE_TIME_FORMATS: [&str; 3] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
];

/// Parse an upstream timestamp.
///
/// Offsets are honoured in extended (`+05:00`), basic (`+0500`) and
/// hour-only (`+05`) form, with or without seconds. A trailing `Z` is UTC.
/// Date-times without an offset and bare dates are read as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }

    let zulu = raw.strip_suffix('Z').or_else(|| raw.strip_suffix('z'));
    if zulu.is_none() {
        for format in DATE_TIME_FORMATS {
            for offset in ["%z", "%#z"] {
                if let Ok(dt) = DateTime::parse_from_str(raw, &format!("{format}{offset}")) {
                    return Some(dt.with_timezone(&Utc));
                }
            }
        }
    }

    let local = zulu.unwrap_or(raw);
    for format in DATE_TIME_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(local, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// The wrapper the upstream API put around the schedule list.
///
/// Variants are listed in detection precedence order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Envelope<'a> {
    /// `[...]`
    TopLevelArray(&'a Vec<Value>),
    /// `{Sites: [{Schedules: ...}]}`, first site only
    SiteSchedules(&'a Value),
    /// `{schedules: ...}`
    LowerSchedules(&'a Value),
    /// `{Schedules: ...}`
    UpperSchedules(&'a Value),
    /// `{data: ...}`
    Data(&'a Value),
    Unrecognized,
}

impl<'a> Envelope<'a> {
    pub fn detect(raw: &'a Value) -> Self {
        let map = match raw {
            Value::Array(items) => return Envelope::TopLevelArray(items),
            Value::Object(map) => map,
            _ => return Envelope::Unrecognized,
        };
        let present = |key: &str| map.get(key).filter(|v| !v.is_null());

        if let Some(schedules) = present("Sites")
            .and_then(|sites| sites.get(0))
            .and_then(|site| site.get("Schedules"))
            .filter(|v| !v.is_null())
        {
            Envelope::SiteSchedules(schedules)
        } else if let Some(v) = present("schedules") {
            Envelope::LowerSchedules(v)
        } else if let Some(v) = present("Schedules") {
            Envelope::UpperSchedules(v)
        } else if let Some(v) = present("data") {
            Envelope::Data(v)
        } else {
            Envelope::Unrecognized
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Envelope::TopLevelArray(_) => "array",
            Envelope::SiteSchedules(_) => "Sites[0].Schedules",
            Envelope::LowerSchedules(_) => "schedules",
            Envelope::UpperSchedules(_) => "Schedules",
            Envelope::Data(_) => "data",
            Envelope::Unrecognized => "unrecognized",
        }
    }

    /// Entries inside the envelope; empty unless the resolved value is an array.
    pub fn entries(&self) -> &'a [Value] {
        match *self {
            Envelope::TopLevelArray(items) => items,
            Envelope::SiteSchedules(v)
            | Envelope::LowerSchedules(v)
            | Envelope::UpperSchedules(v)
            | Envelope::Data(v) => v.as_array().map(Vec::as_slice).unwrap_or(&[]),
            Envelope::Unrecognized => &[],
        }
    }
}

/// Why an entry was left out of the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    NotAnObject,
    MissingTourName,
    MissingStartTime,
    InvalidTimestamp,
    Past,
    ExcludedName(&'static str),
    MalformedField(&'static str),
}

impl SkipReason {
    fn label(&self) -> &'static str {
        match self {
            SkipReason::NotAnObject => "not_an_object",
            SkipReason::MissingTourName => "missing_tour_name",
            SkipReason::MissingStartTime => "missing_start_time",
            SkipReason::InvalidTimestamp => "invalid_timestamp",
            SkipReason::Past => "past",
            SkipReason::ExcludedName(_) => "excluded_name",
            SkipReason::MalformedField(_) => "malformed_field",
        }
    }
}

/// Result of normalizing a single raw entry.
#[derive(Debug, Clone, PartialEq)]
pub enum EntryOutcome {
    Keep {
        starts_at: DateTime<Utc>,
        schedule: NormalizedSchedule,
    },
    Skip(SkipReason),
}

impl From<Result<(DateTime<Utc>, NormalizedSchedule), SkipReason>> for EntryOutcome {
    fn from(result: Result<(DateTime<Utc>, NormalizedSchedule), SkipReason>) -> Self {
        match result {
            Ok((starts_at, schedule)) => EntryOutcome::Keep { starts_at, schedule },
            Err(reason) => EntryOutcome::Skip(reason),
        }
    }
}

pub fn normalize_entry(entry: &Value, now: DateTime<Utc>) -> EntryOutcome {
    try_normalize_entry(entry, now).into()
}

fn try_normalize_entry(
    entry: &Value,
    now: DateTime<Utc>,
) -> Result<(DateTime<Utc>, NormalizedSchedule), SkipReason> {
    let entry = entry.as_object().ok_or(SkipReason::NotAnObject)?;

    let tour_name = TOUR_NAME.first_text(entry).ok_or(SkipReason::MissingTourName)?;
    let start_time = START_TIME.first_text(entry).ok_or(SkipReason::MissingStartTime)?;
    let end_time = END_TIME.first_text(entry);

    let starts_at = parse_timestamp(&start_time).ok_or(SkipReason::InvalidTimestamp)?;
    let ends_at = match &end_time {
        Some(end) => parse_timestamp(end).ok_or(SkipReason::InvalidTimestamp)?,
        None => starts_at,
    };
    if ends_at < now {
        return Err(SkipReason::Past);
    }

    let lowered = tour_name.to_lowercase();
    if let Some(keyword) = EXCLUDED_NAME_KEYWORDS.iter().copied().find(|k| lowered.contains(k)) {
        return Err(SkipReason::ExcludedName(keyword));
    }

    let schedule = NormalizedSchedule {
        available: AVAILABLE.integer_or(entry, 0)?,
        duration: DURATION.integer_or(entry, DEFAULT_DURATION_MINUTES)?,
        end_time: end_time.unwrap_or_else(|| start_time.clone()),
        tour_name,
        start_time,
        schedule_id: SCHEDULE_ID.first_present(entry).cloned(),
        tour_id: TOUR_ID.first_present(entry).cloned(),
        custom_fields: CustomFields {
            field1: CUSTOM_FIELD_1.first_text(entry).unwrap_or_default(),
            field2: CUSTOM_FIELD_2.first_text(entry).unwrap_or_default(),
            field3: CUSTOM_FIELD_3.first_text(entry).unwrap_or_default(),
            field4: CUSTOM_FIELD_4.first_text(entry).unwrap_or_default(),
        },
    };

    Ok((starts_at, schedule))
}

/// Normalize an upstream payload against the current wall-clock time.
pub fn normalize_schedules(raw: &Value) -> Vec<NormalizedSchedule> {
    normalize_schedules_at(raw, Utc::now())
}

/// Normalize an upstream payload, dropping tours that ended before `now`.
///
/// Output is sorted by start instant; entries with equal starts keep their
/// upstream order.
pub fn normalize_schedules_at(raw: &Value, now: DateTime<Utc>) -> Vec<NormalizedSchedule> {
    let envelope = Envelope::detect(raw);
    let entries = envelope.entries();

    let mut kept = Vec::with_capacity(entries.len());
    let mut skipped: BTreeMap<&'static str, usize> = BTreeMap::new();

    for entry in entries {
        match normalize_entry(entry, now) {
            EntryOutcome::Keep { starts_at, schedule } => kept.push((starts_at, schedule)),
            EntryOutcome::Skip(reason) => *skipped.entry(reason.label()).or_default() += 1,
        }
    }

    kept.sort_by_key(|(starts_at, _)| *starts_at);

    debug!(
        envelope = envelope.kind(),
        total = entries.len(),
        kept = kept.len(),
        skipped = ?skipped,
        "Normalized schedules"
    );

    kept.into_iter().map(|(_, schedule)| schedule).collect()
}
