use chrono::{DateTime, Utc};

use crate::models::{Deal, Lead};
use crate::period::Window;

// An unset window end means "up to the current moment": future-dated rows
// must not count toward an open-ended period. Records without a usable
// timestamp are excluded from every bounded window and included only under
// the fully unbounded one.
fn in_window(instant: Option<DateTime<Utc>>, window: &Window, now: DateTime<Utc>) -> bool {
    match instant {
        Some(t) => {
            let end = window.end.unwrap_or(now);
            window.start.map_or(true, |start| t >= start) && t < end
        }
        None => window.is_unbounded(),
    }
}

/// Leads belong to a period by creation time alone.
pub fn filter_leads(leads: &[Lead], window: &Window, now: DateTime<Utc>) -> Vec<Lead> {
    leads
        .iter()
        .filter(|lead| in_window(lead.created_time, window, now))
        .cloned()
        .collect()
}

/// Deals belong to a period when any of creation, modification, or close
/// falls inside it: "touched during period", not "created during period".
/// Leads deliberately do not get this treatment.
pub fn filter_deals(deals: &[Deal], window: &Window, now: DateTime<Utc>) -> Vec<Deal> {
    deals
        .iter()
        .filter(|deal| {
            in_window(deal.created_time, window, now)
                || in_window(deal.modified_time, window, now)
                || in_window(deal.closed_time, window, now)
        })
        .cloned()
        .collect()
}
