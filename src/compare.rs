use std::fmt;

use chrono::{DateTime, Utc};
use tracing::warn;

use crate::errors::PulseError;
use crate::fetch::PeriodDataFetcher;
use crate::metrics::{self, KpiSet};
use crate::period::Period;

/// Period-over-period movement of a single KPI. A baseline of zero reports
/// the absolute gain instead of a percentage, so a first-ever win never
/// renders as an infinite change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Delta {
    Pct(f64),
    New(f64),
    Flat,
}

impl Delta {
    pub fn of(current: f64, previous: f64) -> Delta {
        if previous != 0.0 {
            Delta::Pct((current - previous) / previous * 100.0)
        } else if current > 0.0 {
            Delta::New(current)
        } else {
            Delta::Flat
        }
    }
}

impl fmt::Display for Delta {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Delta::Pct(pct) => write!(f, "{pct:+.1}%"),
            Delta::New(n) if n.fract() == 0.0 => write!(f, "{n:+.0}"),
            Delta::New(n) => write!(f, "{n:+.2}"),
            Delta::Flat => f.write_str("0%"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KpiDeltas {
    pub leads: Delta,
    pub won_count: Delta,
    pub rev_won: Delta,
    pub rev_lost: Delta,
    pub rev_touched: Delta,
    pub win_rate: Delta,
    pub nego: Delta,
    pub prop: Delta,
    pub avg_deal: Delta,
}

#[derive(Debug, Clone)]
pub struct Comparison {
    pub baseline: Period,
    pub previous: KpiSet,
    pub deltas: KpiDeltas,
}

pub fn deltas(current: &KpiSet, previous: &KpiSet) -> KpiDeltas {
    KpiDeltas {
        leads: Delta::of(current.leads as f64, previous.leads as f64),
        won_count: Delta::of(current.won_count as f64, previous.won_count as f64),
        rev_won: Delta::of(current.rev_won, previous.rev_won),
        rev_lost: Delta::of(current.rev_lost, previous.rev_lost),
        rev_touched: Delta::of(current.rev_touched, previous.rev_touched),
        win_rate: Delta::of(current.win_rate, previous.win_rate),
        nego: Delta::of(current.nego as f64, previous.nego as f64),
        prop: Delta::of(current.prop as f64, previous.prop as f64),
        avg_deal: Delta::of(current.avg_deal, previous.avg_deal),
    }
}

/// Fetch and aggregate the canonical predecessor period, then diff it
/// against the current KPIs. Any baseline failure degrades to `None`; the
/// primary result is never at risk from its comparison.
pub async fn compare(
    fetcher: &PeriodDataFetcher,
    period: Period,
    current: &KpiSet,
    now: DateTime<Utc>,
) -> Option<Comparison> {
    let baseline = period.predecessor()?;
    match baseline_kpis(fetcher, baseline, now).await {
        Ok(previous) => {
            let deltas = deltas(current, &previous);
            Some(Comparison {
                baseline,
                previous,
                deltas,
            })
        }
        Err(err) => {
            warn!(%baseline, error = %err, "comparison baseline unavailable");
            None
        }
    }
}

async fn baseline_kpis(
    fetcher: &PeriodDataFetcher,
    baseline: Period,
    now: DateTime<Utc>,
) -> Result<KpiSet, PulseError> {
    let outcome = fetcher.fetch(baseline).await?;
    Ok(metrics::kpis_for(baseline, &outcome, now))
}
