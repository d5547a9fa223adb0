use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::compare::Delta;
use crate::models::Provenance;
use crate::period::{business_tz, Window};
use crate::pulse::PeriodPulse;

fn format_inr(amount: f64) -> String {
    let digits = (amount.round() as i64).to_string();
    let mut grouped = String::new();
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    format!("₹ {grouped}")
}

fn describe_window(window: &Window) -> String {
    let tz = business_tz();
    let fmt = |t: DateTime<Utc>| t.with_timezone(&tz).format("%Y-%m-%d %H:%M").to_string();
    match (window.start, window.end) {
        (None, None) => "all recorded history".to_string(),
        (Some(start), None) => format!("{} to now", fmt(start)),
        (Some(start), Some(end)) => format!("{} to {}", fmt(start), fmt(end)),
        (None, Some(end)) => format!("up to {}", fmt(end)),
    }
}

pub fn build_report(pulse: &PeriodPulse, generated_at: DateTime<Utc>) -> String {
    let mut output = String::new();
    let kpis = &pulse.kpis;
    let baseline = pulse.comparison.as_ref().map(|c| c.baseline);
    let deltas = pulse.comparison.as_ref().map(|c| c.deltas);

    let _ = writeln!(output, "# CRM Pipeline Pulse");
    let _ = writeln!(
        output,
        "Period: {} ({}, business time)",
        pulse.period,
        describe_window(&pulse.window)
    );
    match pulse.provenance {
        Provenance::Live => {
            let _ = writeln!(output, "Data source: live query");
        }
        Provenance::Cached => {
            let _ = writeln!(
                output,
                "Data source: last-known-good snapshot (live store unreachable)"
            );
        }
    }
    let _ = writeln!(
        output,
        "Generated: {}",
        generated_at
            .with_timezone(&business_tz())
            .format("%Y-%m-%d %H:%M:%S")
    );

    let _ = writeln!(output);
    let _ = writeln!(output, "## Key Metrics");

    let rows: Vec<(&str, String, Option<Delta>)> = vec![
        ("New leads", kpis.leads.to_string(), deltas.map(|d| d.leads)),
        (
            "Deals won",
            kpis.won_count.to_string(),
            deltas.map(|d| d.won_count),
        ),
        (
            "Revenue won",
            format_inr(kpis.rev_won),
            deltas.map(|d| d.rev_won),
        ),
        (
            "Revenue lost",
            format_inr(kpis.rev_lost),
            deltas.map(|d| d.rev_lost),
        ),
        (
            "Pipeline touched",
            format_inr(kpis.rev_touched),
            deltas.map(|d| d.rev_touched),
        ),
        (
            "Win rate",
            format!("{:.1}%", kpis.win_rate),
            deltas.map(|d| d.win_rate),
        ),
        (
            "Negotiations active",
            kpis.nego.to_string(),
            deltas.map(|d| d.nego),
        ),
        (
            "Proposals sent",
            kpis.prop.to_string(),
            deltas.map(|d| d.prop),
        ),
        (
            "Avg deal size",
            format_inr(kpis.avg_deal),
            deltas.map(|d| d.avg_deal),
        ),
    ];

    for (label, value, delta) in rows {
        let _ = match (delta, baseline) {
            (Some(delta), Some(baseline)) => {
                writeln!(output, "- {label}: {value} ({delta} vs {baseline})")
            }
            _ => writeln!(output, "- {label}: {value}"),
        };
    }

    if pulse.comparison.is_none() {
        if let Some(baseline) = pulse.period.predecessor() {
            let _ = writeln!(output);
            let _ = writeln!(output, "No comparison available against {baseline}.");
        }
    }

    if let Some(lifecycle) = &pulse.lifecycle {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Lead Lifecycle");
        let _ = writeln!(output, "- Contacted: {}", lifecycle.leads_contacted);
        let _ = writeln!(output, "- Qualified: {}", lifecycle.qualified_leads);
        let _ = writeln!(output, "- Demos scheduled: {}", lifecycle.demos_scheduled);
        let _ = writeln!(output, "- Demos held: {}", lifecycle.demos_held);
    }

    let _ = writeln!(output);
    let _ = writeln!(output, "## AI Briefing");
    match &pulse.briefing {
        Some(text) => {
            let _ = writeln!(output, "{text}");
        }
        None => {
            let _ = writeln!(output, "No AI briefing generated yet.");
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compare::{deltas, Comparison};
    use crate::metrics::KpiSet;
    use crate::models::DailyMetricsSummary;
    use crate::period::{resolve, Period};
    use chrono::TimeZone;

    fn sample_pulse() -> PeriodPulse {
        let now = Utc.with_ymd_and_hms(2026, 8, 7, 10, 0, 0).unwrap();
        let current = KpiSet {
            leads: 12,
            won_count: 3,
            rev_won: 1250000.0,
            rev_lost: 250000.0,
            rev_touched: 2000000.0,
            win_rate: 83.3,
            nego: 2,
            prop: 4,
            avg_deal: 416666.7,
        };
        let previous = KpiSet {
            leads: 10,
            ..Default::default()
        };
        let comparison = Comparison {
            baseline: Period::Yesterday,
            deltas: deltas(&current, &previous),
            previous,
        };
        PeriodPulse {
            period: Period::Today,
            window: resolve(Period::Today, now),
            provenance: Provenance::Cached,
            kpis: current,
            comparison: Some(comparison),
            lifecycle: Some(DailyMetricsSummary {
                leads_contacted: 8,
                qualified_leads: 5,
                demos_scheduled: 3,
                demos_held: 2,
                ..Default::default()
            }),
            briefing: Some("Focus on the two open negotiations.".to_string()),
        }
    }

    #[test]
    fn rupee_amounts_group_thousands() {
        assert_eq!(format_inr(0.0), "₹ 0");
        assert_eq!(format_inr(999.0), "₹ 999");
        assert_eq!(format_inr(1250000.0), "₹ 1,250,000");
        assert_eq!(format_inr(1250000.4), "₹ 1,250,000");
    }

    #[test]
    fn report_carries_kpis_deltas_and_degraded_provenance() {
        let pulse = sample_pulse();
        let report = build_report(&pulse, Utc.with_ymd_and_hms(2026, 8, 7, 10, 0, 0).unwrap());

        assert!(report.contains("# CRM Pipeline Pulse"));
        assert!(report.contains("Period: Today"));
        assert!(report.contains("last-known-good snapshot"));
        assert!(report.contains("- New leads: 12 (+20.0% vs Yesterday)"));
        assert!(report.contains("- Revenue won: ₹ 1,250,000 (+1250000 vs Yesterday)"));
        assert!(report.contains("- Win rate: 83.3%"));
        assert!(report.contains("- Demos scheduled: 3"));
        assert!(report.contains("Focus on the two open negotiations."));
    }

    #[test]
    fn missing_comparison_is_called_out_without_failing_the_report() {
        let mut pulse = sample_pulse();
        pulse.comparison = None;
        let report = build_report(&pulse, Utc::now());

        assert!(report.contains("- New leads: 12\n"));
        assert!(report.contains("No comparison available against Yesterday."));
    }

    #[test]
    fn live_provenance_and_empty_briefing_render_plainly() {
        let mut pulse = sample_pulse();
        pulse.provenance = Provenance::Live;
        pulse.briefing = None;
        pulse.lifecycle = None;
        let report = build_report(&pulse, Utc::now());

        assert!(report.contains("Data source: live query"));
        assert!(report.contains("No AI briefing generated yet."));
        assert!(!report.contains("## Lead Lifecycle"));
    }
}
