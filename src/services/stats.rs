//! Dashboard statistics derived from a booking list.
//!
//! Everything here is a pure function of its inputs: no I/O, no store
//! access, and the current time is passed in explicitly. Malformed bookings
//! degrade (missing dates are skipped by time-based views, unknown statuses
//! are not counted, missing names become "Unknown ...") instead of failing.
//! Calendar boundaries (month/year start, day buckets) use UTC.

use std::borrow::Borrow;
use std::collections::HashMap;

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{Booking, BookingStatus};

pub const LEADERBOARD_SIZE: usize = 10;

fn as_booking<B: Borrow<Booking>>(b: &B) -> &Booking {
    b.borrow()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Period {
    #[default]
    Weekly,
    Monthly,
    Yearly,
    All,
}

impl Period {
    pub fn as_str(&self) -> &'static str {
        match self {
            Period::Weekly => "weekly",
            Period::Monthly => "monthly",
            Period::Yearly => "yearly",
            Period::All => "all",
        }
    }

    /// Unrecognized tags mean "no filtering".
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "weekly" => Period::Weekly,
            "monthly" => Period::Monthly,
            "yearly" => Period::Yearly,
            _ => Period::All,
        }
    }

    /// Inclusive lower bound of the window, or `None` for [`Period::All`].
    pub fn threshold(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        let today = now.date_naive();
        let start_of = |date: Option<NaiveDate>| {
            date.and_then(|d| d.and_hms_opt(0, 0, 0))
                .map(|naive| naive.and_utc())
        };
        match self {
            Period::Weekly => Some(now - Duration::days(7)),
            Period::Monthly => start_of(today.with_day(1)),
            Period::Yearly => start_of(NaiveDate::from_ymd_opt(today.year(), 1, 1)),
            Period::All => None,
        }
    }
}

/// Bookings inside `period` as of `now`. A booking on the threshold's
/// calendar day counts as inside; bookings without a date never do
/// (except for [`Period::All`], which returns everything).
pub fn filter_by_period<B: Borrow<Booking>>(
    bookings: &[B],
    period: Period,
    now: DateTime<Utc>,
) -> Vec<&Booking> {
    let Some(threshold) = period.threshold(now) else {
        return bookings.iter().map(as_booking).collect();
    };
    let threshold_day = threshold.date_naive();

    bookings
        .iter()
        .map(as_booking)
        .filter(|b| match b.date {
            Some(d) => d >= threshold || d.date_naive() == threshold_day,
            None => false,
        })
        .collect()
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub pending: usize,
    pub confirmed: usize,
    pub completed: usize,
    pub cancelled: usize,
}

impl Summary {
    fn record(&mut self, status: &BookingStatus) {
        match status {
            BookingStatus::Pending => self.pending += 1,
            BookingStatus::Confirmed => self.confirmed += 1,
            BookingStatus::Completed => self.completed += 1,
            BookingStatus::Cancelled => self.cancelled += 1,
            BookingStatus::Other(_) => {}
        }
    }

    pub fn count(&self, status: &BookingStatus) -> usize {
        match status {
            BookingStatus::Pending => self.pending,
            BookingStatus::Confirmed => self.confirmed,
            BookingStatus::Completed => self.completed,
            BookingStatus::Cancelled => self.cancelled,
            BookingStatus::Other(_) => 0,
        }
    }
}

/// Total plus per-status counts. `total` includes bookings whose status
/// isn't recognized; the per-status buckets don't.
pub fn compute_summary<B: Borrow<Booking>>(bookings: &[B]) -> Summary {
    let mut summary = Summary {
        total: bookings.len(),
        ..Default::default()
    };
    for b in bookings {
        summary.record(&as_booking(b).status);
    }
    summary
}

fn percent(count: usize, total: usize) -> u32 {
    let total = total.max(1);
    ((count as f64 / total as f64) * 100.0).round() as u32
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StatusShare {
    pub status: String,
    pub percentage: u32,
}

/// One entry per known status, in pending/confirmed/completed/cancelled
/// order. An empty list yields all zeros.
pub fn compute_status_percentages<B: Borrow<Booking>>(bookings: &[B]) -> Vec<StatusShare> {
    let summary = compute_summary(bookings);
    BookingStatus::KNOWN
        .iter()
        .map(|status| StatusShare {
            status: status.label().to_string(),
            percentage: percent(summary.count(status), summary.total),
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderStats {
    pub provider: String,
    pub total: usize,
    pub pending: usize,
    pub confirmed: usize,
    pub completed: usize,
    pub cancelled: usize,
    pub top_service: Option<String>,
}

impl ProviderStats {
    pub fn pending_pct(&self) -> u32 {
        percent(self.pending, self.total)
    }

    pub fn completed_pct(&self) -> u32 {
        percent(self.completed, self.total)
    }
}

struct ProviderTally {
    counts: Summary,
    /// Service name -> bookings, in first-seen order.
    services: Vec<(String, usize)>,
}

/// Per-provider tallies in first-seen order, before any ranking.
fn tally_providers<B: Borrow<Booking>>(bookings: &[B]) -> Vec<ProviderStats> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut tallies: Vec<(String, ProviderTally)> = Vec::new();

    for b in bookings.iter().map(as_booking) {
        let name = b.provider_name();
        let slot = *index.entry(name.to_string()).or_insert_with(|| {
            tallies.push((
                name.to_string(),
                ProviderTally {
                    counts: Summary::default(),
                    services: Vec::new(),
                },
            ));
            tallies.len() - 1
        });

        let tally = &mut tallies[slot].1;
        tally.counts.total += 1;
        tally.counts.record(&b.status);

        let service = b.service_name();
        match tally.services.iter_mut().find(|(s, _)| s == service) {
            Some((_, n)) => *n += 1,
            None => tally.services.push((service.to_string(), 1)),
        }
    }

    tallies
        .into_iter()
        .map(|(provider, tally)| {
            // strictly greater to displace, so the earlier service keeps ties
            let top_service = tally
                .services
                .iter()
                .fold(None::<&(String, usize)>, |best, entry| match best {
                    Some(b) if b.1 >= entry.1 => Some(b),
                    _ => Some(entry),
                })
                .map(|(name, _)| name.clone());

            ProviderStats {
                provider,
                total: tally.counts.total,
                pending: tally.counts.pending,
                confirmed: tally.counts.confirmed,
                completed: tally.counts.completed,
                cancelled: tally.counts.cancelled,
                top_service,
            }
        })
        .collect()
}

/// Busiest providers, by total bookings, capped at [`LEADERBOARD_SIZE`].
pub fn compute_provider_stats<B: Borrow<Booking>>(bookings: &[B]) -> Vec<ProviderStats> {
    let mut stats = tally_providers(bookings);
    stats.sort_by(|a, b| b.total.cmp(&a.total));
    stats.truncate(LEADERBOARD_SIZE);
    stats
}

/// Most successful providers, by completed bookings (total breaks ties).
pub fn top_providers_by_completed<B: Borrow<Booking>>(bookings: &[B]) -> Vec<ProviderStats> {
    let mut stats = tally_providers(bookings);
    stats.sort_by(|a, b| {
        b.completed
            .cmp(&a.completed)
            .then_with(|| b.total.cmp(&a.total))
    });
    stats.truncate(LEADERBOARD_SIZE);
    stats
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DayCount {
    pub date: String,
    pub count: usize,
}

/// Bookings per calendar day, labelled like "Jun 5", in first-seen order.
pub fn group_bookings_by_day<B: Borrow<Booking>>(bookings: &[B]) -> Vec<DayCount> {
    let mut days: Vec<DayCount> = Vec::new();
    for d in bookings.iter().filter_map(|b| as_booking(b).date) {
        let label = d.format("%b %-d").to_string();
        match days.iter_mut().find(|day| day.date == label) {
            Some(day) => day.count += 1,
            None => days.push(DayCount {
                date: label,
                count: 1,
            }),
        }
    }
    days
}

/// Summary-card filter: everything, or one status.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum StatusFilter {
    #[default]
    Total,
    Only(BookingStatus),
}

impl StatusFilter {
    pub fn parse(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "" | "total" | "all" => StatusFilter::Total,
            other => StatusFilter::Only(BookingStatus::parse(other)),
        }
    }
}

pub fn filter_by_status<'a, B: Borrow<Booking>>(
    bookings: &'a [B],
    filter: &StatusFilter,
) -> Vec<&'a Booking> {
    bookings
        .iter()
        .map(as_booking)
        .filter(|b| match filter {
            StatusFilter::Total => true,
            StatusFilter::Only(status) => b.status == *status,
        })
        .collect()
}

/// Everything the admin dashboard renders for one period.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dashboard {
    pub period: Period,
    pub summary: Summary,
    pub percentages: Vec<StatusShare>,
    pub providers: Vec<ProviderStats>,
    pub top_performers: Vec<ProviderStats>,
    pub by_day: Vec<DayCount>,
}

impl Dashboard {
    pub fn build<B: Borrow<Booking>>(bookings: &[B], period: Period, now: DateTime<Utc>) -> Self {
        let in_period = filter_by_period(bookings, period, now);
        Self {
            period,
            summary: compute_summary(&in_period),
            percentages: compute_status_percentages(&in_period),
            providers: compute_provider_stats(&in_period),
            top_performers: top_providers_by_completed(&in_period),
            by_day: group_bookings_by_day(&in_period),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 25, 12, 0, 0).unwrap()
    }

    fn with_status(status: &str) -> Booking {
        serde_json::from_value(serde_json::json!({"id": 1, "status": status})).unwrap()
    }

    fn dated(id: i64, date: DateTime<Utc>) -> Booking {
        serde_json::from_value(serde_json::json!({
            "id": id,
            "status": "pending",
            "date": date.to_rfc3339(),
        }))
        .unwrap()
    }

    fn by(provider: Option<&str>, service: &str, status: &str) -> Booking {
        let mut json = serde_json::json!({
            "id": 1,
            "status": status,
            "service": {"name": service},
        });
        if let Some(p) = provider {
            json["provider"] = serde_json::json!({"name": p});
        }
        serde_json::from_value(json).unwrap()
    }

    fn five_bookings() -> Vec<Booking> {
        ["pending", "pending", "confirmed", "completed", "cancelled"]
            .into_iter()
            .map(with_status)
            .collect()
    }

    #[test]
    fn test_summary_scenario() {
        let summary = compute_summary(&five_bookings());
        assert_eq!(
            summary,
            Summary {
                total: 5,
                pending: 2,
                confirmed: 1,
                completed: 1,
                cancelled: 1
            }
        );
    }

    #[test]
    fn test_percentages_scenario() {
        let shares = compute_status_percentages(&five_bookings());
        let pct: Vec<_> = shares.iter().map(|s| s.percentage).collect();
        let labels: Vec<_> = shares.iter().map(|s| s.status.as_str()).collect();
        assert_eq!(pct, [40, 20, 20, 20]);
        assert_eq!(labels, ["Pending", "Confirmed", "Completed", "Cancelled"]);
    }

    #[test]
    fn test_percentages_empty_list_all_zero() {
        let shares = compute_status_percentages::<Booking>(&[]);
        assert_eq!(shares.len(), 4);
        assert!(shares.iter().all(|s| s.percentage == 0));
    }

    #[test]
    fn test_percentages_sum_close_to_100() {
        let statuses = ["pending", "confirmed", "completed", "cancelled"];
        for n in 1..=40usize {
            for skew in 0..4usize {
                let bookings: Vec<Booking> = (0..n)
                    .map(|i| with_status(statuses[(i * (skew + 1) + i / 3) % 4]))
                    .collect();
                let sum: u32 = compute_status_percentages(&bookings)
                    .iter()
                    .map(|s| s.percentage)
                    .sum();
                assert!((97..=103).contains(&sum), "n={n} skew={skew} sum={sum}");
            }
        }
    }

    #[test]
    fn test_summary_case_insensitive_and_ignores_unknown() {
        let bookings: Vec<Booking> = ["Pending", "CANCELED", "cancelled", "on-hold", ""]
            .into_iter()
            .map(with_status)
            .collect();
        let summary = compute_summary(&bookings);
        assert_eq!(summary.total, 5);
        assert_eq!(summary.pending, 1);
        assert_eq!(summary.cancelled, 2);
        assert_eq!(summary.confirmed + summary.completed, 0);
    }

    #[test]
    fn test_weekly_excludes_ten_days_ago_monthly_includes() {
        let ten_days_ago = dated(1, now() - Duration::days(10));
        let bookings = vec![ten_days_ago];

        assert!(filter_by_period(&bookings, Period::Weekly, now()).is_empty());
        assert_eq!(filter_by_period(&bookings, Period::Monthly, now()).len(), 1);
        assert_eq!(filter_by_period(&bookings, Period::Yearly, now()).len(), 1);
    }

    #[test]
    fn test_period_boundaries_are_inclusive() {
        let exactly_week = dated(1, now() - Duration::days(7));
        let earlier_same_day = dated(2, now() - Duration::days(7) - Duration::hours(3));
        let day_before = dated(3, now() - Duration::days(8));
        let month_start = dated(4, Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap());
        let last_month = dated(5, Utc.with_ymd_and_hms(2025, 5, 31, 23, 59, 59).unwrap());
        let year_start = dated(6, Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        let last_year = dated(7, Utc.with_ymd_and_hms(2024, 12, 31, 23, 0, 0).unwrap());
        let bookings = vec![
            exactly_week,
            earlier_same_day,
            day_before,
            month_start,
            last_month,
            year_start,
            last_year,
        ];

        let ids = |period| -> Vec<i64> {
            filter_by_period(&bookings, period, now())
                .iter()
                .map(|b| b.id)
                .collect()
        };
        assert_eq!(ids(Period::Weekly), [1, 2]);
        assert_eq!(ids(Period::Monthly), [1, 2, 3, 4]);
        assert_eq!(ids(Period::Yearly), [1, 2, 3, 4, 5, 6]);
        assert_eq!(ids(Period::All).len(), 7);
    }

    #[test]
    fn test_period_filter_skips_undated_except_all() {
        let undated = with_status("pending");
        let bookings = vec![undated];
        assert!(filter_by_period(&bookings, Period::Yearly, now()).is_empty());
        assert_eq!(filter_by_period(&bookings, Period::All, now()).len(), 1);
    }

    #[test]
    fn test_period_parse() {
        assert_eq!(Period::parse("Monthly"), Period::Monthly);
        assert_eq!(Period::parse("decade"), Period::All);
    }

    #[test]
    fn test_provider_stats_grouping_and_top_service() {
        let bookings = vec![
            by(Some("Ravi"), "AC Repair", "completed"),
            by(Some("Ravi"), "Fridge Repair", "pending"),
            by(Some("Ravi"), "Fridge Repair", "cancelled"),
            by(Some("Meera"), "Cleaning", "completed"),
            by(None, "Painting", "confirmed"),
        ];
        let stats = compute_provider_stats(&bookings);

        assert_eq!(stats.len(), 3);
        assert_eq!(stats[0].provider, "Ravi");
        assert_eq!(stats[0].total, 3);
        assert_eq!(stats[0].completed, 1);
        assert_eq!(stats[0].cancelled, 1);
        assert_eq!(stats[0].top_service.as_deref(), Some("Fridge Repair"));
        assert_eq!(stats[0].pending_pct(), 33);
        assert_eq!(stats[0].completed_pct(), 33);

        // equal totals keep first-seen order
        assert_eq!(stats[1].provider, "Meera");
        assert_eq!(stats[2].provider, "Unknown Provider");
    }

    #[test]
    fn test_top_service_tie_keeps_first_seen() {
        let bookings = vec![
            by(Some("Ravi"), "AC Repair", "pending"),
            by(Some("Ravi"), "Fridge Repair", "pending"),
            by(Some("Ravi"), "Fridge Repair", "pending"),
            by(Some("Ravi"), "AC Repair", "pending"),
        ];
        let stats = compute_provider_stats(&bookings);
        assert_eq!(stats[0].top_service.as_deref(), Some("AC Repair"));
    }

    #[test]
    fn test_leaderboard_capped_and_sorted() {
        let mut bookings = Vec::new();
        for p in 0..14 {
            for _ in 0..=(p % 5) {
                bookings.push(by(Some(&format!("provider-{p}")), "svc", "pending"));
            }
        }
        let stats = compute_provider_stats(&bookings);
        assert_eq!(stats.len(), 10);
        assert!(stats.windows(2).all(|w| w[0].total >= w[1].total));

        let few = vec![by(Some("a"), "svc", "pending"), by(Some("b"), "svc", "pending")];
        assert_eq!(compute_provider_stats(&few).len(), 2);
    }

    #[test]
    fn test_top_by_completed() {
        let bookings = vec![
            by(Some("Busy"), "svc", "pending"),
            by(Some("Busy"), "svc", "pending"),
            by(Some("Busy"), "svc", "pending"),
            by(Some("Finisher"), "svc", "completed"),
            by(Some("Finisher"), "svc", "completed"),
        ];
        let by_total = compute_provider_stats(&bookings);
        assert_eq!(by_total[0].provider, "Busy");

        let by_done = top_providers_by_completed(&bookings);
        assert_eq!(by_done[0].provider, "Finisher");
        assert_eq!(by_done[0].completed, 2);
    }

    #[test]
    fn test_group_by_day() {
        let d1 = Utc.with_ymd_and_hms(2025, 6, 5, 9, 0, 0).unwrap();
        let d2 = Utc.with_ymd_and_hms(2025, 6, 16, 9, 0, 0).unwrap();
        let bookings = vec![
            dated(1, d2),
            dated(2, d1),
            dated(3, d2 + Duration::hours(5)),
            with_status("pending"),
        ];
        let days = group_bookings_by_day(&bookings);
        assert_eq!(
            days,
            [
                DayCount {
                    date: "Jun 16".to_string(),
                    count: 2
                },
                DayCount {
                    date: "Jun 5".to_string(),
                    count: 1
                },
            ]
        );
    }

    #[test]
    fn test_filter_by_status() {
        let bookings = five_bookings();
        assert_eq!(filter_by_status(&bookings, &StatusFilter::Total).len(), 5);
        assert_eq!(
            filter_by_status(&bookings, &StatusFilter::parse("pending")).len(),
            2
        );
        assert_eq!(
            filter_by_status(&bookings, &StatusFilter::parse("canceled")).len(),
            1
        );
    }

    #[test]
    fn test_aggregations_are_deterministic() {
        let bookings = vec![
            by(Some("Ravi"), "AC Repair", "completed"),
            by(Some("Meera"), "Cleaning", "pending"),
            by(Some("Ravi"), "AC Repair", "pending"),
        ];
        let first = Dashboard::build(&bookings, Period::All, now());
        let _ = compute_summary(&bookings[..1]);
        let second = Dashboard::build(&bookings, Period::All, now());
        assert_eq!(first, second);
    }

    #[test]
    fn test_dashboard_applies_period_first() {
        let recent = dated(1, now() - Duration::days(1));
        let old = dated(2, now() - Duration::days(40));
        let dash = Dashboard::build(&[recent, old], Period::Monthly, now());
        assert_eq!(dash.summary.total, 1);
        assert_eq!(dash.by_day.len(), 1);
        assert_eq!(dash.providers[0].provider, "Unknown Provider");
    }
}
