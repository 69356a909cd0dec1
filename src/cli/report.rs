//! Batch output: the plain table and JSON printed by non-interactive modes.

use std::fmt::Write;

use crossterm::style::{Color, Stylize};

use crate::core::digest::Counts;
use crate::core::{
    Emphasis, JobRecord, Row, SortKey, Tone, fail_rate_emphasis, state_emphasis,
};

const HEADERS: [&str; 8] = [
    "VER", "STATUS", "RECENT", "FAIL%", "LAST OK", "TYPE", "JOB NAME", "URL",
];

fn tone_color(tone: Tone) -> Color {
    match tone {
        Tone::Good => Color::Green,
        Tone::Warn => Color::Yellow,
        Tone::Bad => Color::Red,
        Tone::Muted => Color::DarkGrey,
        Tone::Info => Color::Cyan,
        Tone::Plain => Color::White,
    }
}

fn cells(row: &Row) -> [String; 8] {
    [
        row.version.clone(),
        row.state.label(),
        row.sparkline.clone(),
        row.fail_rate_percent.clone(),
        row.last_ok_age.clone(),
        row.variant.clone(),
        row.job.clone(),
        row.short_url.clone(),
    ]
}

/// Pad first, then color, so ANSI codes never count toward column width.
fn paint(text: &str, width: usize, emphasis: Option<Emphasis>) -> String {
    let padded = format!("{text:<width$}");
    match emphasis {
        Some(e) if e.bold => padded.with(tone_color(e.tone)).bold().to_string(),
        Some(e) => padded.with(tone_color(e.tone)).to_string(),
        None => padded,
    }
}

pub fn render_counts(counts: &Counts, color: bool) -> String {
    let label = |text: &str, c: Color| {
        if color {
            text.with(c).bold().to_string()
        } else {
            text.to_string()
        }
    };
    format!(
        "{} {}  {} {}  {} {}  {} {}",
        label("Total:", Color::White),
        counts.total,
        label("Pass:", Color::Green),
        counts.passing,
        label("Fail:", Color::Red),
        counts.failing,
        label("Pending:", Color::Yellow),
        counts.pending
    )
}

/// Fixed-width job table. When sorted by version, each version starts a new
/// section separated by a blank line.
pub fn render_table(rows: &[Row], sort: SortKey, color: bool) -> String {
    let all: Vec<[String; 8]> = rows.iter().map(cells).collect();
    let mut widths = HEADERS.map(str::len);
    for r in &all {
        for (w, cell) in widths.iter_mut().zip(r) {
            *w = (*w).max(cell.chars().count());
        }
    }

    let mut out = String::new();
    let header: Vec<String> = HEADERS
        .iter()
        .zip(widths)
        .map(|(h, w)| {
            if color {
                format!("{h:<w$}").bold().to_string()
            } else {
                format!("{h:<w$}")
            }
        })
        .collect();
    let _ = writeln!(out, "{}", header.join("  ").trim_end());

    let mut current_version: Option<&str> = None;
    for (row, text) in rows.iter().zip(&all) {
        if sort == SortKey::Version && current_version != Some(row.version.as_str()) {
            if current_version.is_some() {
                out.push('\n');
            }
            current_version = Some(row.version.as_str());
        }

        let muted = Some(Emphasis {
            tone: Tone::Muted,
            bold: false,
        });
        let colors: [Option<Emphasis>; 8] = if color {
            [
                Some(Emphasis {
                    tone: Tone::Info,
                    bold: false,
                }),
                Some(state_emphasis(&row.state)),
                None,
                Some(fail_rate_emphasis(row.fail_rate)),
                None,
                muted,
                None,
                muted,
            ]
        } else {
            [None; 8]
        };

        let line: Vec<String> = text
            .iter()
            .zip(widths)
            .zip(colors)
            .map(|((cell, w), c)| paint(cell, w, c))
            .collect();
        let _ = writeln!(out, "{}", line.join("  ").trim_end());
    }
    out
}

pub fn render_json(records: &[JobRecord]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::JobState;

    fn row(version: &str, job: &str, state: JobState) -> Row {
        Row {
            version: version.to_string(),
            state,
            sparkline: "SF".to_string(),
            fail_rate: 0.5,
            fail_rate_percent: "50%".to_string(),
            last_ok_age: "2h ago".to_string(),
            variant: "e2e".to_string(),
            job: job.to_string(),
            short_url: String::new(),
        }
    }

    #[test]
    fn plain_table_is_aligned() {
        let rows = vec![
            row("4.18", "job-a", JobState::Failure),
            row("unknown", "job-bb", JobState::Success),
        ];
        let table = render_table(&rows, SortKey::Recent, false);
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("VER      STATUS  RECENT"));
        assert!(lines[1].starts_with("4.18     FAIL    SF"));
        assert!(lines[2].starts_with("unknown  OK      SF"));
        assert!(lines[2].ends_with("job-bb"));
    }

    #[test]
    fn version_sort_adds_sections() {
        let rows = vec![
            row("4.18", "a", JobState::Failure),
            row("4.18", "b", JobState::Failure),
            row("4.19", "c", JobState::Success),
        ];
        let table = render_table(&rows, SortKey::Version, false);
        assert_eq!(table.lines().filter(|l| l.is_empty()).count(), 1);
    }

    #[test]
    fn colored_cells_keep_alignment() {
        let mut high = row("4.18", "job-a", JobState::Error);
        high.fail_rate = 0.8;
        let rows = vec![high, row("4.19", "job-b", JobState::Success)];
        let table = render_table(&rows, SortKey::Recent, true);
        let cell = paint("80%", 5, Some(fail_rate_emphasis(0.8)));
        assert_eq!(cell, "80%  ".with(Color::Red).bold().to_string());
        assert_eq!(table.lines().count(), 3);
    }

    #[test]
    fn counts_line() {
        let counts = Counts {
            total: 5,
            failing: 2,
            passing: 2,
            pending: 1,
        };
        assert_eq!(
            render_counts(&counts, false),
            "Total: 5  Pass: 2  Fail: 2  Pending: 1"
        );
    }
}
