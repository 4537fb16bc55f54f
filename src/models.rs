use std::fmt;

use chrono::{DateTime, NaiveDate, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A user-like record as consumed by the metrics engine.
///
/// Built permissively from backend JSON: nothing here ever fails to construct.
#[derive(Debug, Clone, PartialEq)]
pub struct UserRecord {
    pub id: Option<String>,
    pub created_at: Option<CreatedAt>,
    pub status: Option<String>,
    pub fields: Map<String, Value>,
}

impl UserRecord {
    #[cfg(test)]
    pub fn new(id: impl Into<String>, created_at: Option<DateTime<Utc>>, status: &str) -> Self {
        Self {
            id: Some(id.into()),
            created_at: created_at.map(CreatedAt::Instant),
            status: Some(status.to_string()),
            fields: Map::new(),
        }
    }

    pub fn from_json(value: &Value) -> Self {
        let fields = value.as_object().cloned().unwrap_or_default();
        let id = fields
            .get("_id")
            .or_else(|| fields.get("id"))
            .and_then(scalar_to_string);
        let created_at = fields
            .get("createdAt")
            .and_then(Value::as_str)
            .and_then(parse_timestamp);
        let status = fields
            .get("status")
            .and_then(Value::as_str)
            .map(str::to_string);

        Self {
            id,
            created_at,
            status,
            fields,
        }
    }

    /// Case-insensitive status comparison; a missing status matches nothing but "".
    pub fn has_status(&self, status: &str) -> bool {
        self.status.as_deref().unwrap_or("").to_lowercase() == status.to_lowercase()
    }
}

fn scalar_to_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// When a record was created, as precisely as its source says.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreatedAt {
    /// Carried an offset (or is a bare date, which reads as UTC midnight).
    Instant(DateTime<Utc>),
    /// No offset: a wall-clock time in whatever zone the reader is in.
    Local(NaiveDateTime),
}

impl CreatedAt {
    /// Wall-clock time in `zone`.
    pub fn naive_in<Tz: TimeZone>(&self, zone: &Tz) -> NaiveDateTime {
        match *self {
            CreatedAt::Instant(instant) => instant.with_timezone(zone).naive_local(),
            CreatedAt::Local(naive) => naive,
        }
    }
}

/// Parses the timestamp shapes the backend and exports produce.
pub fn parse_timestamp(raw: &str) -> Option<CreatedAt> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(CreatedAt::Instant(parsed.with_timezone(&Utc)));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(CreatedAt::Local(parsed));
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .map(|date| CreatedAt::Instant(date.and_time(chrono::NaiveTime::MIN).and_utc()))
}

/// Time-window granularity for "new" records.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Period {
    #[default]
    Today,
    ThisWeek,
    ThisMonth,
    /// Anything else; kept verbatim and given a zero-width window.
    Other(String),
}

impl Period {
    pub fn as_str(&self) -> &str {
        match self {
            Period::Today => "today",
            Period::ThisWeek => "this-week",
            Period::ThisMonth => "this-month",
            Period::Other(raw) => raw,
        }
    }

    pub fn label(&self) -> &str {
        match self {
            Period::Today => "Today",
            Period::ThisWeek => "This Week",
            Period::ThisMonth => "This Month",
            Period::Other(raw) => raw,
        }
    }
}

impl From<&str> for Period {
    fn from(raw: &str) -> Self {
        match raw {
            "today" => Period::Today,
            "this-week" => Period::ThisWeek,
            "this-month" => Period::ThisMonth,
            other => Period::Other(other.to_string()),
        }
    }
}

impl std::str::FromStr for Period {
    type Err = std::convert::Infallible;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        Ok(Period::from(raw))
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricCard {
    pub title: String,
    pub value: String,
    pub change: i64,
    pub icon: String,
    pub route: String,
    pub status_filter: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TotalsSummary {
    pub total: usize,
    pub active: usize,
    pub inactive: usize,
    pub suspended: usize,
    pub pending: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DashboardMetrics {
    pub time_based: Vec<MetricCard>,
    pub total: TotalsSummary,
}

/// The three collections the dashboard pulls in one go.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DashboardData {
    pub customers: Vec<Value>,
    pub providers: Vec<Value>,
    pub categories: Vec<Value>,
}

impl DashboardData {
    /// Customers and providers as one user collection.
    pub fn users(&self) -> Vec<UserRecord> {
        self.customers
            .iter()
            .chain(self.providers.iter())
            .map(UserRecord::from_json)
            .collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}
