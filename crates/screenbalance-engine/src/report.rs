// Report Renderer
//
// Renders a plain-text usage report from an aggregate snapshot: category
// breakdown with proportional bars, top apps, an hourly intensity strip,
// and the productivity score. The result is a subject/body pair handed to
// the OS mail composer.

use std::collections::HashMap;

use chrono::{NaiveDate, Timelike};
use screenbalance_common::score::productivity_score;
use screenbalance_common::{AppCategory, AppUsageRecord};

const BAR_WIDTH: usize = 20;
const TOP_APPS: usize = 5;
const HEAT_GLYPHS: [char; 5] = [' ', '.', ':', '*', '#'];

/// Render the report for a day's records. Returns `(subject, body)`.
pub fn render_report(records: &[AppUsageRecord], date: NaiveDate) -> (String, String) {
    let active: Vec<&AppUsageRecord> = records.iter().filter(|r| r.minutes > 0.0).collect();
    let total: f64 = active.iter().map(|r| r.minutes).sum();

    let subject = format!("Screen Time Report for {}", date.format("%Y-%m-%d"));

    let mut body = String::new();
    body.push_str(&format!("Screen Time Report, {}\n\n", date.format("%A %B %e, %Y")));
    body.push_str(&format!("Total screen time: {} minutes\n\n", total.round() as i64));

    body.push_str("By category:\n");
    for (category, minutes) in category_breakdown(&active) {
        let share = if total > 0.0 { minutes / total } else { 0.0 };
        body.push_str(&format!(
            "  {:<14} {:<width$} {:>3.0}%  ({} min)\n",
            category.label(),
            bar(share),
            share * 100.0,
            minutes.round() as i64,
            width = BAR_WIDTH,
        ));
    }

    body.push_str("\nTop apps:\n");
    let mut by_minutes: Vec<&&AppUsageRecord> = active.iter().collect();
    by_minutes.sort_by(|a, b| b.minutes.partial_cmp(&a.minutes).unwrap_or(std::cmp::Ordering::Equal));
    for record in by_minutes.iter().take(TOP_APPS) {
        body.push_str(&format!(
            "  {:<20} {:>5} min  [{}]\n",
            record.name,
            record.minutes.round() as i64,
            record.category.label(),
        ));
    }
    if active.is_empty() {
        body.push_str("  (no usage recorded)\n");
    }

    body.push_str("\nHourly activity:\n");
    body.push_str(&format!("  00h |{}| 23h\n", heatmap_strip(&active, date)));

    let score = productivity_score(records);
    body.push_str(&format!("\nProductivity score: {:+}%\n", score));

    (subject, body)
}

/// Minutes per category, highest first, zero-minute categories omitted.
fn category_breakdown(records: &[&AppUsageRecord]) -> Vec<(AppCategory, f64)> {
    let mut by_category: HashMap<AppCategory, f64> = HashMap::new();
    for record in records {
        *by_category.entry(record.category).or_insert(0.0) += record.minutes;
    }

    let mut breakdown: Vec<(AppCategory, f64)> = AppCategory::all()
        .into_iter()
        .filter_map(|c| by_category.get(&c).map(|m| (c, *m)))
        .collect();
    breakdown.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    breakdown
}

fn bar(share: f64) -> String {
    let filled = ((share * BAR_WIDTH as f64).round() as usize).min(BAR_WIDTH);
    let mut bar = "#".repeat(filled);
    bar.push_str(&"-".repeat(BAR_WIDTH - filled));
    bar
}

/// 24-slot textual intensity strip. Each record's minutes are attributed
/// to the hour of its `last_used` stamp; intensity is scaled to the
/// busiest hour.
fn heatmap_strip(records: &[&AppUsageRecord], date: NaiveDate) -> String {
    let mut hours = [0.0f64; 24];
    for record in records {
        if let Some(last_used) = record.last_used {
            if last_used.date_naive() == date {
                hours[last_used.hour() as usize] += record.minutes;
            }
        }
    }

    let max = hours.iter().cloned().fold(0.0f64, f64::max);
    hours
        .iter()
        .map(|&minutes| {
            if max <= 0.0 || minutes <= 0.0 {
                HEAT_GLYPHS[0]
            } else {
                let level = (minutes / max * (HEAT_GLYPHS.len() - 1) as f64).ceil() as usize;
                HEAT_GLYPHS[level.min(HEAT_GLYPHS.len() - 1)]
            }
        })
        .collect()
}
