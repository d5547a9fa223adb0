use std::fmt;

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, TimeZone, Utc};

// All stored timestamps are UTC; reporting day boundaries follow the business
// timezone, fixed at UTC+05:30 with no daylight saving.
const BUSINESS_TZ_SECS: i32 = 5 * 3600 + 30 * 60;

pub fn business_tz() -> FixedOffset {
    FixedOffset::east_opt(BUSINESS_TZ_SECS).unwrap()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, clap::ValueEnum)]
pub enum Period {
    Today,
    Yesterday,
    DayBeforeYesterday,
    ThisMonth,
    LastMonth,
    ThisYear,
    LastYear,
    AllTime,
}

impl Period {
    pub fn all() -> [Period; 8] {
        [
            Period::Today,
            Period::Yesterday,
            Period::DayBeforeYesterday,
            Period::ThisMonth,
            Period::LastMonth,
            Period::ThisYear,
            Period::LastYear,
            Period::AllTime,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            Period::Today => "Today",
            Period::Yesterday => "Yesterday",
            Period::DayBeforeYesterday => "Day Before Yesterday",
            Period::ThisMonth => "This Month",
            Period::LastMonth => "Last Month",
            Period::ThisYear => "This Year",
            Period::LastYear => "Last Year",
            Period::AllTime => "All Time",
        }
    }

    /// The canonical baseline period for period-over-period comparison.
    /// Already-historical fixed periods and the unbounded period have none.
    pub fn predecessor(&self) -> Option<Period> {
        match self {
            Period::Today => Some(Period::Yesterday),
            Period::Yesterday => Some(Period::DayBeforeYesterday),
            Period::ThisMonth => Some(Period::LastMonth),
            Period::ThisYear => Some(Period::LastYear),
            _ => None,
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Half-open UTC interval `[start, end)`. An unset start is unbounded past;
/// an unset end runs up to the current moment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Window {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl Window {
    pub fn is_unbounded(&self) -> bool {
        self.start.is_none() && self.end.is_none()
    }
}

fn day_start(date: NaiveDate) -> DateTime<Utc> {
    business_tz()
        .from_local_datetime(&date.and_time(NaiveTime::MIN))
        .unwrap()
        .with_timezone(&Utc)
}

fn first_of_month(year: i32, month: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(year, month, 1).unwrap()
}

fn first_of_previous_month(year: i32, month: u32) -> NaiveDate {
    if month == 1 {
        first_of_month(year - 1, 12)
    } else {
        first_of_month(year, month - 1)
    }
}

pub fn resolve(period: Period, now: DateTime<Utc>) -> Window {
    let today = now.with_timezone(&business_tz()).date_naive();

    match period {
        Period::Today => Window {
            start: Some(day_start(today)),
            end: None,
        },
        Period::Yesterday => {
            let end = day_start(today);
            Window {
                start: Some(end - Duration::hours(24)),
                end: Some(end),
            }
        }
        Period::DayBeforeYesterday => {
            let end = day_start(today) - Duration::hours(24);
            Window {
                start: Some(end - Duration::hours(24)),
                end: Some(end),
            }
        }
        Period::ThisMonth => Window {
            start: Some(day_start(first_of_month(today.year(), today.month()))),
            end: None,
        },
        Period::LastMonth => Window {
            start: Some(day_start(first_of_previous_month(today.year(), today.month()))),
            end: Some(day_start(first_of_month(today.year(), today.month()))),
        },
        Period::ThisYear => Window {
            start: Some(day_start(first_of_month(today.year(), 1))),
            end: None,
        },
        Period::LastYear => Window {
            start: Some(day_start(first_of_month(today.year() - 1, 1))),
            end: Some(day_start(first_of_month(today.year(), 1))),
        },
        Period::AllTime => Window {
            start: None,
            end: None,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, s).unwrap()
    }

    #[test]
    fn today_starts_at_business_midnight() {
        // 2026-08-07 15:30 IST
        let now = utc(2026, 8, 7, 10, 0, 0);
        let window = resolve(Period::Today, now);
        assert_eq!(window.start, Some(utc(2026, 8, 6, 18, 30, 0)));
        assert_eq!(window.end, None);
    }

    #[test]
    fn yesterday_is_the_24h_before_business_midnight() {
        let now = utc(2026, 8, 7, 10, 0, 0);
        let window = resolve(Period::Yesterday, now);
        assert_eq!(window.start, Some(utc(2026, 8, 5, 18, 30, 0)));
        assert_eq!(window.end, Some(utc(2026, 8, 6, 18, 30, 0)));
    }

    #[test]
    fn day_before_yesterday_abuts_yesterday() {
        let now = utc(2026, 8, 7, 10, 0, 0);
        let yesterday = resolve(Period::Yesterday, now);
        let prior = resolve(Period::DayBeforeYesterday, now);
        assert_eq!(prior.end, yesterday.start);
        assert_eq!(prior.start, Some(utc(2026, 8, 4, 18, 30, 0)));
    }

    #[test]
    fn closed_windows_are_ordered() {
        let now = utc(2026, 8, 7, 10, 0, 0);
        for period in Period::all() {
            let window = resolve(period, now);
            if let (Some(start), Some(end)) = (window.start, window.end) {
                assert!(start < end, "{period}: {start} !< {end}");
            }
        }
    }

    #[test]
    fn this_month_starts_on_day_one_at_business_midnight() {
        let now = utc(2026, 8, 7, 10, 0, 0);
        let start = resolve(Period::ThisMonth, now).start.unwrap();
        let local = start.with_timezone(&business_tz());
        assert_eq!(local.day(), 1);
        assert_eq!((local.hour(), local.minute(), local.second()), (0, 0, 0));
    }

    #[test]
    fn last_month_abuts_this_month() {
        let now = utc(2026, 8, 7, 10, 0, 0);
        let last = resolve(Period::LastMonth, now);
        let this = resolve(Period::ThisMonth, now);
        assert_eq!(last.end, this.start);
    }

    #[test]
    fn month_rollover_is_exact() {
        // 07:30 IST on March 1st; February 2026 has 28 days.
        let now = utc(2026, 3, 1, 2, 0, 0);
        let this = resolve(Period::ThisMonth, now);
        let last = resolve(Period::LastMonth, now);
        assert_eq!(this.start, Some(utc(2026, 2, 28, 18, 30, 0)));
        assert_eq!(last.start, Some(utc(2026, 1, 31, 18, 30, 0)));
        assert_eq!(last.end, this.start);
    }

    #[test]
    fn year_boundary_follows_business_timezone() {
        // 01:30 IST on Jan 1 2026 is still Dec 31 2025 in UTC.
        let now = utc(2025, 12, 31, 20, 0, 0);
        let today = resolve(Period::Today, now);
        let this_year = resolve(Period::ThisYear, now);
        let last_year = resolve(Period::LastYear, now);
        assert_eq!(today.start, Some(utc(2025, 12, 31, 18, 30, 0)));
        assert_eq!(this_year.start, Some(utc(2025, 12, 31, 18, 30, 0)));
        assert_eq!(last_year.start, Some(utc(2024, 12, 31, 18, 30, 0)));
        assert_eq!(last_year.end, this_year.start);
    }

    #[test]
    fn all_time_is_unbounded() {
        let window = resolve(Period::AllTime, utc(2026, 8, 7, 10, 0, 0));
        assert!(window.is_unbounded());
    }

    #[test]
    fn predecessors_follow_the_canonical_chain() {
        assert_eq!(Period::Today.predecessor(), Some(Period::Yesterday));
        assert_eq!(
            Period::Yesterday.predecessor(),
            Some(Period::DayBeforeYesterday)
        );
        assert_eq!(Period::ThisMonth.predecessor(), Some(Period::LastMonth));
        assert_eq!(Period::ThisYear.predecessor(), Some(Period::LastYear));
        assert_eq!(Period::DayBeforeYesterday.predecessor(), None);
        assert_eq!(Period::LastMonth.predecessor(), None);
        assert_eq!(Period::LastYear.predecessor(), None);
        assert_eq!(Period::AllTime.predecessor(), None);
    }
}
