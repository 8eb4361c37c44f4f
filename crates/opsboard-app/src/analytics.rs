//! Lead pipeline statistics over a calendar window.
//!
//! Everything here is a pure function of the lead slice, the window and the
//! caller's current timestamp. An empty window yields a zeroed report with a
//! full zero-filled daily series.

use std::collections::BTreeMap;
use std::fmt;

use opsboard_core::calendar::{days_between, inclusive_days, local_date, month_start};
use opsboard_core::Lead;
use time::{Date, Duration, OffsetDateTime};

use crate::filter::parse_day;

/// Mean latency at or above this many hours is reported in days.
const DAYS_THRESHOLD_HOURS: f64 = 48.0;

/// Window selector for the statistics panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalyticsWindow {
    /// Today and the six days before it.
    Last7Days,
    /// First of the current month through today.
    MonthToDate,
    /// The whole previous calendar month.
    PreviousMonth,
    /// Explicit inclusive range; `to` defaults to today.
    Custom {
        /// First day.
        from: Date,
        /// Last day.
        to: Option<Date>,
    },
}

impl AnalyticsWindow {
    /// Parse a custom range from `YYYY-MM-DD` strings. Returns `None` when
    /// either bound is unparsable.
    #[must_use]
    pub fn custom(from: &str, to: Option<&str>) -> Option<Self> {
        let from = parse_day("from", from).ok()?;
        let to = match to.map(str::trim).filter(|raw| !raw.is_empty()) {
            Some(raw) => Some(parse_day("to", raw).ok()?),
            None => None,
        };
        Some(Self::Custom { from, to })
    }

    /// Resolve to concrete inclusive bounds relative to `today`.
    #[must_use]
    pub fn resolve(self, today: Date) -> (Date, Date) {
        match self {
            Self::Last7Days => (today.checked_sub(Duration::days(6)).unwrap_or(today), today),
            Self::MonthToDate => (month_start(today), today),
            Self::PreviousMonth => {
                let end = month_start(today).previous_day().unwrap_or(today);
                (month_start(end), end)
            }
            Self::Custom { from, to } => {
                let to = to.unwrap_or(today);
                if to < from { (to, from) } else { (from, to) }
            }
        }
    }
}

/// Unit of [`ResponseLatency::value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LatencyUnit {
    /// Hours.
    Hours,
    /// Days.
    Days,
}

/// Mean time from lead creation to the first logged conversation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResponseLatency {
    /// Mean in `unit`; zero when no lead qualifies.
    pub value: f64,
    /// Display unit.
    pub unit: LatencyUnit,
    /// Leads that contributed to the mean.
    pub sample_size: usize,
}

impl ResponseLatency {
    const ZERO: Self = Self {
        value: 0.0,
        unit: LatencyUnit::Hours,
        sample_size: 0,
    };

    fn from_samples(samples: &[Duration]) -> Self {
        if samples.is_empty() {
            return Self::ZERO;
        }
        let total_hours: f64 = samples.iter().map(|delta| delta.as_seconds_f64() / 3600.0).sum();
        let mean_hours = total_hours / count_as_f64(samples.len());
        if mean_hours >= DAYS_THRESHOLD_HOURS {
            Self {
                value: mean_hours / 24.0,
                unit: LatencyUnit::Days,
                sample_size: samples.len(),
            }
        } else {
            Self {
                value: mean_hours,
                unit: LatencyUnit::Hours,
                sample_size: samples.len(),
            }
        }
    }
}

impl fmt::Display for ResponseLatency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let suffix = match self.unit {
            LatencyUnit::Hours => "h",
            LatencyUnit::Days => "d",
        };
        write!(f, "{:.1}{suffix}", self.value)
    }
}

/// Leads created on one local day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyCount {
    /// Calendar day.
    pub date: Date,
    /// Leads created that day.
    pub count: usize,
}

/// Statistics panel contents.
#[derive(Debug, Clone, PartialEq)]
pub struct LeadAnalytics {
    /// First day of the resolved window.
    pub window_start: Date,
    /// Last day of the resolved window.
    pub window_end: Date,
    /// Inclusive number of days in the window.
    pub day_count: i64,
    /// Leads created inside the window.
    pub total_leads: usize,
    /// Count per status wire name.
    pub by_status: BTreeMap<String, usize>,
    /// Count per source, blanks bucketed as "Unknown".
    pub by_source: BTreeMap<String, usize>,
    /// `total_leads / max(1, day_count)`.
    pub leads_per_day: f64,
    /// Percentage of leads in a converted status.
    pub conversion_rate: f64,
    /// Mean first-response latency.
    pub response_latency: ResponseLatency,
    /// One entry per day of the window, oldest first.
    pub daily: Vec<DailyCount>,
}

/// Compute the statistics for `window` as seen at `now`.
#[must_use]
pub fn compute_analytics(
    leads: &[Lead],
    window: AnalyticsWindow,
    now: OffsetDateTime,
) -> LeadAnalytics {
    let offset = now.offset();
    let (window_start, window_end) = window.resolve(now.date());
    let day_count = inclusive_days(window_start, window_end);

    let in_window: Vec<&Lead> = leads
        .iter()
        .filter(|lead| (window_start..=window_end).contains(&local_date(lead.created_at, offset)))
        .collect();

    let mut by_status = BTreeMap::new();
    let mut by_source = BTreeMap::new();
    let mut per_day: BTreeMap<Date, usize> = BTreeMap::new();
    let mut converted = 0_usize;
    let mut samples = Vec::new();

    for lead in &in_window {
        *by_status.entry(lead.status.as_str().to_owned()).or_insert(0) += 1;
        *by_source.entry(lead.source_label().to_owned()).or_insert(0) += 1;
        *per_day.entry(local_date(lead.created_at, offset)).or_insert(0) += 1;
        if lead.status.is_converted() {
            converted += 1;
        }
        if let Some(delta) = first_response(lead) {
            samples.push(delta);
        }
    }

    let total_leads = in_window.len();
    let leads_per_day = count_as_f64(total_leads) / days_as_f64(day_count.max(1));
    let conversion_rate = if total_leads == 0 {
        0.0
    } else {
        count_as_f64(converted) * 100.0 / count_as_f64(total_leads)
    };
    let daily = days_between(window_start, window_end)
        .map(|date| DailyCount {
            date,
            count: per_day.get(&date).copied().unwrap_or(0),
        })
        .collect();

    tracing::debug!(
        %window_start,
        %window_end,
        total_leads,
        latency_samples = samples.len(),
        "lead analytics computed"
    );

    LeadAnalytics {
        window_start,
        window_end,
        day_count,
        total_leads,
        by_status,
        by_source,
        leads_per_day,
        conversion_rate,
        response_latency: ResponseLatency::from_samples(&samples),
        daily,
    }
}

/// Custom-range entry point over raw `YYYY-MM-DD` inputs.
#[must_use]
pub fn compute_custom_analytics(
    leads: &[Lead],
    from: &str,
    to: Option<&str>,
    now: OffsetDateTime,
) -> Option<LeadAnalytics> {
    let window = AnalyticsWindow::custom(from, to)?;
    Some(compute_analytics(leads, window, now))
}

/// Delay until the earliest logged conversation.
///
/// The log is kept newest first, so the earliest entry is the last one whose
/// timestamp parses and is not before creation.
fn first_response(lead: &Lead) -> Option<Duration> {
    lead.conversation_summary
        .iter()
        .rev()
        .filter_map(|entry| entry.at())
        .find(|at| *at >= lead.created_at)
        .map(|at| at - lead.created_at)
}

fn count_as_f64(count: usize) -> f64 {
    u32::try_from(count).map_or(f64::from(u32::MAX), f64::from)
}

fn days_as_f64(days: i64) -> f64 {
    i32::try_from(days).map_or(f64::from(i32::MAX), f64::from)
}
