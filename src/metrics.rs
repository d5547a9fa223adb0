use chrono::{DateTime, Utc};

use crate::fetch::FetchOutcome;
use crate::filter;
use crate::models::{DailyMetricsSummary, Deal, Lead};
use crate::period::Period;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageCategory {
    Won,
    Lost,
    Negotiation,
    Proposal,
    Other,
}

/// Case-insensitive substring classification of the free-text CRM stage.
/// The stage vocabulary is owned by the upstream CRM, so matching stays
/// fuzzy rather than an enum; first match wins, checked in this order.
pub fn classify(stage: &str) -> StageCategory {
    let stage = stage.to_lowercase();
    if stage.contains("closed won") {
        StageCategory::Won
    } else if stage.contains("closed lost") {
        StageCategory::Lost
    } else if stage.contains("negotiation") {
        StageCategory::Negotiation
    } else if stage.contains("proposal") || stage.contains("quote") {
        StageCategory::Proposal
    } else {
        StageCategory::Other
    }
}

/// The fixed KPI bundle derived per period, and the uniform shape compared
/// against the predecessor period.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KpiSet {
    pub leads: u64,
    pub won_count: u64,
    pub rev_won: f64,
    pub rev_lost: f64,
    pub rev_touched: f64,
    pub win_rate: f64,
    pub nego: u64,
    pub prop: u64,
    pub avg_deal: f64,
}

fn win_rate(rev_won: f64, rev_lost: f64) -> f64 {
    let total = rev_won + rev_lost;
    if total == 0.0 {
        0.0
    } else {
        rev_won / total * 100.0
    }
}

fn avg_deal(rev_won: f64, won_count: u64) -> f64 {
    if won_count == 0 {
        0.0
    } else {
        rev_won / won_count as f64
    }
}

pub fn aggregate(
    period: Period,
    leads: &[Lead],
    deals: &[Deal],
    summary: Option<&DailyMetricsSummary>,
) -> KpiSet {
    let rev_touched: f64 = deals.iter().map(|deal| deal.amount).sum();

    // The batch-computed daily row is authoritative for Today when present.
    // rev_touched, win_rate, and avg_deal are always derived.
    if period == Period::Today {
        if let Some(summary) = summary {
            return KpiSet {
                leads: summary.new_leads_today,
                won_count: summary.deals_closed,
                rev_won: summary.deal_amount_won,
                rev_lost: summary.deal_amount_lost,
                rev_touched,
                win_rate: win_rate(summary.deal_amount_won, summary.deal_amount_lost),
                nego: summary.negotiations_active,
                prop: summary.proposals_sent,
                avg_deal: avg_deal(summary.deal_amount_won, summary.deals_closed),
            };
        }
    }

    let mut won_count = 0u64;
    let mut nego = 0u64;
    let mut prop = 0u64;
    let mut rev_won = 0.0;
    let mut rev_lost = 0.0;

    for deal in deals {
        match classify(&deal.stage) {
            StageCategory::Won => {
                won_count += 1;
                rev_won += deal.amount;
            }
            StageCategory::Lost => rev_lost += deal.amount,
            StageCategory::Negotiation => nego += 1,
            StageCategory::Proposal => prop += 1,
            StageCategory::Other => {}
        }
    }

    KpiSet {
        leads: leads.len() as u64,
        won_count,
        rev_won,
        rev_lost,
        rev_touched,
        win_rate: win_rate(rev_won, rev_lost),
        nego,
        prop,
        avg_deal: avg_deal(rev_won, won_count),
    }
}

/// Filter a fetched entity set against its window and aggregate the KPIs.
pub fn kpis_for(period: Period, outcome: &FetchOutcome, now: DateTime<Utc>) -> KpiSet {
    let leads = filter::filter_leads(&outcome.sets.leads, &outcome.window, now);
    let deals = filter::filter_deals(&outcome.sets.deals, &outcome.window, now);
    aggregate(period, &leads, &deals, outcome.sets.daily_summary())
}
