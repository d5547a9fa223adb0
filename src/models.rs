use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    #[serde(default, deserialize_with = "de_text")]
    pub lead_id: String,
    #[serde(default)]
    pub owner_name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default, deserialize_with = "de_flag")]
    pub is_converted: bool,
    #[serde(default, deserialize_with = "de_instant")]
    pub created_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Deal {
    #[serde(default, deserialize_with = "de_text")]
    pub deal_id: String,
    #[serde(default)]
    pub lead_id: Option<String>,
    #[serde(default)]
    pub deal_name: Option<String>,
    #[serde(default)]
    pub owner_name: Option<String>,
    #[serde(default, deserialize_with = "de_text")]
    pub stage: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default, deserialize_with = "de_amount")]
    pub amount: f64,
    #[serde(default, deserialize_with = "de_instant")]
    pub created_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "de_instant")]
    pub modified_time: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "de_instant")]
    pub closed_time: Option<DateTime<Utc>>,
}

/// One precomputed row written by the external batch process. Authoritative
/// only when the reporting period is exactly Today.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DailyMetricsSummary {
    #[serde(default, deserialize_with = "de_count")]
    pub new_leads_today: u64,
    #[serde(default, deserialize_with = "de_count")]
    pub leads_contacted: u64,
    #[serde(default, deserialize_with = "de_count")]
    pub qualified_leads: u64,
    #[serde(default, deserialize_with = "de_count")]
    pub demos_scheduled: u64,
    #[serde(default, deserialize_with = "de_count")]
    pub demos_held: u64,
    #[serde(default, deserialize_with = "de_count")]
    pub proposals_sent: u64,
    #[serde(default, deserialize_with = "de_count")]
    pub negotiations_active: u64,
    #[serde(default, deserialize_with = "de_count")]
    pub deals_closed: u64,
    #[serde(default, deserialize_with = "de_amount")]
    pub deal_amount_won: f64,
    #[serde(default, deserialize_with = "de_amount")]
    pub deal_amount_lost: f64,
    #[serde(default, deserialize_with = "de_instant")]
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AiSummary {
    #[serde(default)]
    pub payload: Value,
    #[serde(default, deserialize_with = "de_instant")]
    pub created_at: Option<DateTime<Utc>>,
}

/// The shared shape of the live response body and the snapshot file. Extra
/// keys on the wire (`source`, `timestamp`) are ignored.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntitySets {
    #[serde(default)]
    pub leads: Vec<Lead>,
    #[serde(default)]
    pub deals: Vec<Deal>,
    #[serde(default)]
    pub metrics: Vec<DailyMetricsSummary>,
    #[serde(default)]
    pub ai_table: Vec<AiSummary>,
}

impl EntitySets {
    pub fn daily_summary(&self) -> Option<&DailyMetricsSummary> {
        self.metrics.first()
    }

    pub fn latest_ai_payload(&self) -> Option<&Value> {
        self.ai_table
            .iter()
            .max_by_key(|row| row.created_at)
            .map(|row| &row.payload)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provenance {
    Live,
    Cached,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Provenance::Live => f.write_str("live"),
            Provenance::Cached => f.write_str("cache"),
        }
    }
}

// ---------------------------------------------------------------------------
// Ingestion-boundary coercions. Upstream rows come from a synchronized CRM
// table and are not trusted to be well-typed: amounts arrive as numbers or
// strings, timestamps in several shapes, and any field may be null. Defaults
// are applied once here so downstream code reads plain typed fields.
// ---------------------------------------------------------------------------

pub fn parse_instant(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.with_timezone(&Utc));
    }
    // Naive timestamps from the store are UTC by contract.
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(naive.and_utc());
        }
    }
    None
}

fn de_instant<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(Value::as_str)
        .and_then(parse_instant))
}

pub fn coerce_amount(value: Option<&Value>) -> f64 {
    let amount = match value {
        Some(Value::Number(n)) => n.as_f64().unwrap_or(0.0),
        Some(Value::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
        _ => 0.0,
    };
    if amount.is_finite() && amount > 0.0 {
        amount
    } else {
        0.0
    }
}

fn de_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(coerce_amount(value.as_ref()))
}

fn de_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    let count = match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0).map(|f| f as u64))
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse::<u64>().unwrap_or(0),
        _ => 0,
    };
    Ok(count)
}

fn de_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(matches!(value, Some(Value::Bool(true))))
}

fn de_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    })
}
