use chrono::Utc;

use crate::compare::{self, Comparison};
use crate::errors::PulseError;
use crate::fetch::PeriodDataFetcher;
use crate::metrics::{self, KpiSet};
use crate::models::{DailyMetricsSummary, Provenance};
use crate::period::{Period, Window};

/// Everything the renderer needs for one reporting period.
#[derive(Debug, Clone)]
pub struct PeriodPulse {
    pub period: Period,
    pub window: Window,
    pub provenance: Provenance,
    pub kpis: KpiSet,
    pub comparison: Option<Comparison>,
    pub lifecycle: Option<DailyMetricsSummary>,
    pub briefing: Option<String>,
}

pub async fn period_pulse(
    fetcher: &PeriodDataFetcher,
    period: Period,
) -> Result<PeriodPulse, PulseError> {
    let now = Utc::now();
    let outcome = fetcher.fetch(period).await?;
    let kpis = metrics::kpis_for(period, &outcome, now);
    let comparison = compare::compare(fetcher, period, &kpis, now).await;

    let lifecycle = if period == Period::Today {
        outcome.sets.daily_summary().cloned()
    } else {
        None
    };
    let briefing = outcome
        .sets
        .latest_ai_payload()
        .and_then(|payload| payload.pointer("/aiSummary/text"))
        .and_then(|text| text.as_str())
        .map(str::to_string);

    Ok(PeriodPulse {
        period,
        window: outcome.window,
        provenance: outcome.provenance,
        kpis,
        comparison,
        lifecycle,
        briefing,
    })
}
