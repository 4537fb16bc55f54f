use std::fmt::Write;

use chrono::NaiveDateTime;

use crate::models::{DashboardMetrics, Period};

fn signed(change: i64) -> String {
    if change > 0 {
        format!("+{change}%")
    } else {
        format!("{change}%")
    }
}

pub fn build_report(
    period: &Period,
    generated_at: NaiveDateTime,
    metrics: &DashboardMetrics,
    category_count: Option<usize>,
) -> String {
    let mut output = String::new();

    let _ = writeln!(output, "# Admin Dashboard");
    let _ = writeln!(
        output,
        "Period: {} (generated {})",
        period.label(),
        generated_at.format("%Y-%m-%d %H:%M")
    );
    let _ = writeln!(output);
    let _ = writeln!(output, "## New This Period");

    for card in metrics.time_based.iter() {
        let _ = writeln!(
            output,
            "- {} {}: {} ({}) -> {}?status={}",
            card.icon,
            card.title,
            card.value,
            signed(card.change),
            card.route,
            card.status_filter
        );
    }

    let total = &metrics.total;
    let _ = writeln!(output);
    let _ = writeln!(output, "## All Users");

    if total.total == 0 {
        let _ = writeln!(output, "No users recorded.");
    } else {
        let _ = writeln!(output, "- Total: {}", total.total);
        let _ = writeln!(output, "- Active: {}", total.active);
        let _ = writeln!(output, "- Inactive: {}", total.inactive);
        let _ = writeln!(output, "- Suspended: {}", total.suspended);
        let _ = writeln!(output, "- Pending: {}", total.pending);
    }

    if let Some(count) = category_count {
        let _ = writeln!(output);
        let _ = writeln!(output, "## Catalogue");
        let _ = writeln!(output, "- Service categories: {count}");
    }

    output
}
