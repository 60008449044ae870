//! Work schedule models (entries, shifts, slots)

use chrono::{DateTime, NaiveDate, Utc, Weekday};
use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

// ---------------------------------------------------------------------------
// ScheduleEntry
// ---------------------------------------------------------------------------

/// One shift inside a multi-shift day
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Shift {
    /// Start time (HH:MM)
    #[serde(alias = "startTime")]
    pub start_time: String,
    /// End time (HH:MM, "24:00" allowed)
    #[serde(alias = "endTime")]
    pub end_time: String,
}

/// Work description for one employee on one day
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ScheduleEntry {
    #[serde(default, alias = "isWorking")]
    pub is_working: bool,
    /// Start time of the single shift (HH:MM)
    #[serde(default, alias = "startTime", skip_serializing_if = "Option::is_none")]
    pub start_time: Option<String>,
    /// End time of the single shift (HH:MM)
    #[serde(default, alias = "endTime", skip_serializing_if = "Option::is_none")]
    pub end_time: Option<String>,
    /// When non-empty, authoritative over `start_time` / `end_time`
    #[serde(
        default,
        alias = "shiftsData",
        deserialize_with = "null_as_empty",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub shifts_data: Vec<Shift>,
}

impl ScheduleEntry {
    /// Single-shift working day
    pub fn working(start: &str, end: &str) -> Self {
        Self {
            is_working: true,
            start_time: Some(start.to_string()),
            end_time: Some(end.to_string()),
            shifts_data: Vec::new(),
        }
    }

    /// Multi-shift working day
    pub fn with_shifts(shifts: &[(&str, &str)]) -> Self {
        Self {
            is_working: true,
            start_time: None,
            end_time: None,
            shifts_data: shifts
                .iter()
                .map(|(start, end)| Shift {
                    start_time: start.to_string(),
                    end_time: end.to_string(),
                })
                .collect(),
        }
    }

    /// Explicit day off
    pub fn off() -> Self {
        Self::default()
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<Shift>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<Shift>>::deserialize(deserializer)?.unwrap_or_default())
}

// ---------------------------------------------------------------------------
// WorkSchedule
// ---------------------------------------------------------------------------

/// Ordered schedule map keyed by weekday name (`"monday"`) or ISO date (`"2025-03-14"`).
///
/// Persisted schedules come in two shapes: a keyed JSON object, or a list of
/// entries (`[{"key": .., "value": ..}]` or `[[key, value]]`). Both are normalized
/// here so the rest of the crate only ever sees one ordered map. Keys are trimmed
/// and lowercased; `null` entries are dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawWorkSchedule", into = "IndexMap<String, ScheduleEntry>")]
pub struct WorkSchedule {
    entries: IndexMap<String, ScheduleEntry>,
}

impl WorkSchedule {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&ScheduleEntry> {
        self.entries.get(key)
    }

    /// Insert or replace an entry, normalizing the key
    pub fn set(&mut self, key: &str, entry: ScheduleEntry) {
        self.entries.insert(normalize_key(key), entry);
    }

    pub fn weekday(&self, weekday: Weekday) -> Option<&ScheduleEntry> {
        self.entries.get(weekday_name(weekday))
    }

    pub fn date(&self, date: NaiveDate) -> Option<&ScheduleEntry> {
        self.entries.get(&date_key(date))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Builder-style insert, handy for seeding
    pub fn with(mut self, key: &str, entry: ScheduleEntry) -> Self {
        self.set(key, entry);
        self
    }
}

impl From<WorkSchedule> for IndexMap<String, ScheduleEntry> {
    fn from(schedule: WorkSchedule) -> Self {
        schedule.entries
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawWorkSchedule {
    Record(IndexMap<String, Option<ScheduleEntry>>),
    Entries(Vec<RawScheduleItem>),
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawScheduleItem {
    Pair(String, Option<ScheduleEntry>),
    Keyed {
        key: String,
        value: Option<ScheduleEntry>,
    },
}

impl From<RawWorkSchedule> for WorkSchedule {
    fn from(raw: RawWorkSchedule) -> Self {
        let pairs: Vec<(String, Option<ScheduleEntry>)> = match raw {
            RawWorkSchedule::Record(map) => map.into_iter().collect(),
            RawWorkSchedule::Entries(items) => items
                .into_iter()
                .map(|item| match item {
                    RawScheduleItem::Pair(key, value) => (key, value),
                    RawScheduleItem::Keyed { key, value } => (key, value),
                })
                .collect(),
        };

        let mut schedule = WorkSchedule::new();
        for (key, value) in pairs {
            if let Some(entry) = value {
                schedule.set(&key, entry);
            }
        }
        schedule
    }
}

fn normalize_key(key: &str) -> String {
    key.trim().to_lowercase()
}

/// Lowercase English weekday name used as schedule key
pub fn weekday_name(weekday: Weekday) -> &'static str {
    match weekday {
        Weekday::Mon => "monday",
        Weekday::Tue => "tuesday",
        Weekday::Wed => "wednesday",
        Weekday::Thu => "thursday",
        Weekday::Fri => "friday",
        Weekday::Sat => "saturday",
        Weekday::Sun => "sunday",
    }
}

/// ISO date key (YYYY-MM-DD)
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

// ---------------------------------------------------------------------------
// Slot
// ---------------------------------------------------------------------------

/// A fixed-width candidate appointment window
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Slot {
    /// Clock label (HH:MM)
    pub time: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    /// False when the slot overlaps a held booking
    pub available: bool,
    /// True when enough consecutive free slots follow to host the whole service
    pub fits_service: bool,
}
