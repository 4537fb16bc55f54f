use chrono::{DateTime, Datelike, Duration, Local, NaiveDateTime, NaiveTime, TimeZone};

use crate::models::{DashboardMetrics, MetricCard, Period, TotalsSummary, UserRecord};

/// Period-over-period user metrics for the dashboard summary.
///
/// Holds only the selected period; the user collection is passed per call.
#[derive(Debug, Clone, Default)]
pub struct MetricsEngine {
    period: Period,
}

impl MetricsEngine {
    pub fn new(period: impl Into<Period>) -> Self {
        Self {
            period: period.into(),
        }
    }

    pub fn period(&self) -> &Period {
        &self.period
    }

    pub fn set_period(&mut self, period: impl Into<Period>) {
        self.period = period.into();
    }

    pub fn compute_metrics(&self, users: &[UserRecord]) -> DashboardMetrics {
        self.compute_metrics_at(users, &Local::now())
    }

    /// Same as [`MetricsEngine::compute_metrics`] against a fixed clock.
    ///
    /// Creation timestamps are compared as wall-clock times in `now`'s zone;
    /// offset-less ones are taken to already be in it.
    pub fn compute_metrics_at<Tz: TimeZone>(
        &self,
        users: &[UserRecord],
        now: &DateTime<Tz>,
    ) -> DashboardMetrics {
        let zone = &now.timezone();
        let local_now = now.naive_local();
        let current_start = period_start(&self.period, local_now);
        let previous_start = previous_period_start(&self.period, local_now);

        let created_since = |start: NaiveDateTime| {
            users
                .iter()
                .filter(move |user| {
                    user.created_at
                        .map(|created| created.naive_in(zone) >= start)
                        .unwrap_or(false)
                })
        };

        let current: Vec<&UserRecord> = created_since(current_start).collect();
        let previous_count = created_since(previous_start).count();
        let new_active = current.iter().filter(|u| u.has_status("active")).count();
        let new_suspended = current.iter().filter(|u| u.has_status("suspended")).count();

        tracing::debug!(
            period = %self.period,
            current = current.len(),
            previous = previous_count,
            "computed period counts"
        );

        DashboardMetrics {
            time_based: vec![
                card(
                    "New Users",
                    current.len(),
                    percent_change(current.len(), previous_count),
                    "👤+",
                    "all",
                ),
                card("New Active Users", new_active, 0, "✅", "active"),
                card("New Suspended Users", new_suspended, 0, "⛔", "suspended"),
            ],
            total: totals(users),
        }
    }
}

fn card(title: &str, count: usize, change: i64, icon: &str, status_filter: &str) -> MetricCard {
    MetricCard {
        title: title.to_string(),
        value: format_number(count),
        change,
        icon: icon.to_string(),
        route: "/users".to_string(),
        status_filter: status_filter.to_string(),
    }
}

pub fn totals(users: &[UserRecord]) -> TotalsSummary {
    let count = |status: &str| users.iter().filter(|u| u.has_status(status)).count();
    TotalsSummary {
        total: users.len(),
        active: count("active"),
        inactive: count("inactive"),
        suspended: count("suspended"),
        pending: count("pending"),
    }
}

/// Start of the current window. Unknown periods start at `now` itself.
pub fn period_start(period: &Period, now: NaiveDateTime) -> NaiveDateTime {
    let today = now.date();
    let start = match period {
        Period::Today => today,
        Period::ThisWeek => {
            today - Duration::days(i64::from(today.weekday().num_days_from_sunday()))
        }
        Period::ThisMonth => today - Duration::days(i64::from(today.day0())),
        Period::Other(_) => return now,
    };
    start.and_time(NaiveTime::MIN)
}

/// Start of the window one step back. Unknown periods start at `now` itself.
pub fn previous_period_start(period: &Period, now: NaiveDateTime) -> NaiveDateTime {
    let today = now.date();
    let start = match period {
        Period::Today => today - Duration::days(1),
        Period::ThisWeek => {
            today - Duration::days(i64::from(today.weekday().num_days_from_sunday()) + 7)
        }
        Period::ThisMonth => {
            let last_of_previous = today - Duration::days(i64::from(today.day0()) + 1);
            last_of_previous - Duration::days(i64::from(last_of_previous.day0()))
        }
        Period::Other(_) => return now,
    };
    start.and_time(NaiveTime::MIN)
}

/// Whole-percent change from `previous` to `current`, halves rounded up.
pub fn percent_change(current: usize, previous: usize) -> i64 {
    if previous == 0 {
        return if current > 0 { 100 } else { 0 };
    }
    let ratio = (current as f64 - previous as f64) / previous as f64 * 100.0;
    (ratio + 0.5).floor() as i64
}

/// Groups digits in threes: `1234567` becomes `1,234,567`.
pub fn format_number(value: usize) -> String {
    let digits = value.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
