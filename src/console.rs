//! Colorful console output for graph loading and replay metrics.

use num_format::{Locale, ToFormattedString};
use owo_colors::OwoColorize;
use std::time::Duration;

use crate::events::ReplaySummary;
use crate::graph::GraphStats;

/// ASCII art banner for startup.
pub fn print_banner() {
    let banner = r#"
  ____                 _   _   _      _                      _
 |  _ \ ___   __ _  __| | | \ | | ___| |___      _____  _ __| | __
 | |_) / _ \ / _` |/ _` | |  \| |/ _ \ __\ \ /\ / / _ \| '__| |/ /
 |  _ < (_) | (_| | (_| | | |\  |  __/ |_ \ V  V / (_) | |  |   <
 |_| \_\___/ \__,_|\__,_| |_| \_|\___|\__| \_/\_/ \___/|_|  |_|\_\
"#;
    println!("{}", banner.cyan().bold());
    println!(
        "  {} {}\n",
        format!("v{}", env!("CARGO_PKG_VERSION")).bright_black(),
        "Road Network".bright_cyan()
    );
}

/// Prints the size of a freshly loaded graph.
pub fn print_graph_loaded(name: &str, stats: &GraphStats) {
    println!(
        "{} {} {} Graph '{}': nodes ({}), arcs ({}), poi nodes ({})",
        timestamp().bright_black(),
        "INFO".bright_green(),
        "[Graph]".bright_cyan(),
        name.white().bold(),
        stats.node_count.to_formatted_string(&Locale::en).bright_yellow(),
        stats.arc_count.to_formatted_string(&Locale::en).bright_yellow(),
        stats.poi_node_count.to_formatted_string(&Locale::en).bright_yellow()
    );
}

/// Prints the replay completion line and summary box.
pub fn print_replay_summary(summary: &ReplaySummary) {
    let events_per_sec = events_per_sec(summary.events, summary.elapsed);

    println!(
        "{} {} {} Replay ended: time spent ({}), events ({}), speed ({}/sec)",
        timestamp().bright_black(),
        "INFO".bright_green(),
        "[Replay]".bright_cyan(),
        format_duration(summary.elapsed).yellow(),
        summary.events.to_formatted_string(&Locale::en).white(),
        events_per_sec.to_formatted_string(&Locale::en).bright_magenta().bold()
    );

    // 60 chars wide, 56 char content area
    println!();
    println!("{}", "╔══════════════════════════════════════════════════════════╗".bright_cyan());

    let status_text = if summary.unknown == 0 {
        "✓ ALL EVENTS ANSWERED"
    } else {
        "✗ SOME EVENTS HAD AN UNKNOWN TYPE"
    };
    let status_colored = if summary.unknown == 0 {
        status_text.bright_green().bold().to_string()
    } else {
        status_text.bright_red().bold().to_string()
    };
    let status_padding = 56 - status_text.chars().count();
    let left_pad = status_padding / 2;
    let right_pad = status_padding - left_pad;
    println!(
        "{}{}{}{}{}",
        "║".bright_cyan(),
        " ".repeat(left_pad),
        status_colored,
        " ".repeat(right_pad),
        "║".bright_cyan()
    );

    println!("{}", "╠══════════════════════════════════════════════════════════╣".bright_cyan());

    let rows = [
        ("Events:", summary.events.to_formatted_string(&Locale::en)),
        ("Mutations:", summary.mutations.to_formatted_string(&Locale::en)),
        ("Routes found:", summary.routes_found.to_formatted_string(&Locale::en)),
        ("Routes impossible:", summary.routes_impossible.to_formatted_string(&Locale::en)),
        ("KNN queries:", summary.knn_queries.to_formatted_string(&Locale::en)),
        ("Replay time:", format!("{:.3}s", summary.elapsed.as_secs_f64())),
        ("Event speed:", format!("{}/sec", events_per_sec.to_formatted_string(&Locale::en))),
    ];
    for (label, value) in rows {
        println!(
            "{}  {:<18}{:>36}  {}",
            "║".bright_cyan(),
            label,
            value,
            "║".bright_cyan()
        );
    }

    println!("{}", "╚══════════════════════════════════════════════════════════╝".bright_cyan());
    println!();
}

/// Prints where the output document went.
pub fn print_output_written(path: &std::path::Path, records: usize) {
    println!(
        "{} {} {} Wrote {} records to {}",
        timestamp().bright_black(),
        "INFO".bright_green(),
        "[Replay]".bright_cyan(),
        records.to_formatted_string(&Locale::en).bright_yellow(),
        path.display().white()
    );
}

fn events_per_sec(events: usize, elapsed: Duration) -> u64 {
    if elapsed.as_secs_f64() > 0.0 {
        (events as f64 / elapsed.as_secs_f64()) as u64
    } else {
        0
    }
}

/// Formats a duration nicely.
pub fn format_duration(d: Duration) -> String {
    let total_ms = d.as_millis();
    if total_ms < 1000 {
        format!("{}ms", total_ms)
    } else if total_ms < 60_000 {
        format!("{:.2}s", d.as_secs_f64())
    } else {
        let mins = total_ms / 60_000;
        let secs = (total_ms % 60_000) / 1000;
        format!("{}m {}s", mins, secs)
    }
}

fn timestamp() -> String {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| format!("{}.{:03}", d.as_secs(), d.subsec_millis()))
        .unwrap_or_else(|_| "0.000".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(Duration::from_millis(250)), "250ms");
        assert_eq!(format_duration(Duration::from_millis(1500)), "1.50s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
    }

    #[test]
    fn test_events_per_sec() {
        assert_eq!(events_per_sec(500, Duration::from_millis(250)), 2000);
        assert_eq!(events_per_sec(10, Duration::ZERO), 0);
    }
}
