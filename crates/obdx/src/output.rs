//! Output formatting: table, JSON, YAML, plain.
//!
//! Renders data in the format selected by `--output`. Table uses `tabled`,
//! structured formats use serde, plain emits one identifier per line.

use std::io::{self, IsTerminal, Write};

use chrono::{DateTime, Utc};
use owo_colors::OwoColorize;
use tabled::{Table, Tabled, settings::Style};

use crate::cli::{ColorMode, GlobalOpts, OutputFormat};
use crate::error::CliError;

// ── Color helpers ────────────────────────────────────────────────────

/// Determine whether color output should be enabled.
pub fn should_color(mode: &ColorMode) -> bool {
    match mode {
        ColorMode::Always => true,
        ColorMode::Never => false,
        ColorMode::Auto => io::stderr().is_terminal() && std::env::var("NO_COLOR").is_err(),
    }
}

/// Status line on stderr (`✓ Slot blocked`), silenced by `--quiet`.
pub fn notice(global: &GlobalOpts, message: &str) {
    if global.quiet {
        return;
    }
    if should_color(&global.color) {
        eprintln!("{} {message}", "✓".green());
    } else {
        eprintln!("✓ {message}");
    }
}

/// Warning line on stderr. Never silenced.
pub fn caution(global: &GlobalOpts, message: &str) {
    if should_color(&global.color) {
        eprintln!("{} {message}", "!".yellow().bold());
    } else {
        eprintln!("! {message}");
    }
}

// ── Render dispatchers ───────────────────────────────────────────────

/// Render a list of serde-serializable + tabled items in the chosen format.
pub fn render_list<T, R>(
    format: &OutputFormat,
    data: &[T],
    to_row: impl Fn(&T) -> R,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
    R: Tabled,
{
    match format {
        OutputFormat::Table => {
            let rows: Vec<R> = data.iter().map(to_row).collect();
            Ok(table(&rows))
        }
        OutputFormat::Json => Ok(serde_json::to_string_pretty(data)?),
        OutputFormat::JsonCompact => Ok(serde_json::to_string(data)?),
        OutputFormat::Yaml => Ok(serde_yaml::to_string(data)?),
        OutputFormat::Plain => Ok(data.iter().map(&id_fn).collect::<Vec<_>>().join("\n")),
    }
}

/// Render a single item. Table mode uses `detail_fn`'s pre-formatted block.
pub fn render_single<T>(
    format: &OutputFormat,
    data: &T,
    detail_fn: impl Fn(&T) -> String,
    id_fn: impl Fn(&T) -> String,
) -> Result<String, CliError>
where
    T: serde::Serialize,
{
    match format {
        OutputFormat::Table => Ok(detail_fn(data)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(data)?),
        OutputFormat::JsonCompact => Ok(serde_json::to_string(data)?),
        OutputFormat::Yaml => Ok(serde_yaml::to_string(data)?),
        OutputFormat::Plain => Ok(id_fn(data)),
    }
}

/// Print the rendered output to stdout, respecting quiet mode.
pub fn print_output(output: &str, quiet: bool) {
    if quiet || output.is_empty() {
        return;
    }
    let mut stdout = io::stdout().lock();
    let _ = writeln!(stdout, "{output}");
}

pub fn table<R: Tabled>(rows: &[R]) -> String {
    Table::new(rows).with(Style::rounded()).to_string()
}

// ── Cell helpers ─────────────────────────────────────────────────────

/// `2031-03-10 09:00` in UTC.
pub fn timestamp(at: DateTime<Utc>) -> String {
    at.format("%Y-%m-%d %H:%M").to_string()
}

pub fn or_dash<T: ToString>(value: Option<T>) -> String {
    value.map_or_else(|| "-".into(), |v| v.to_string())
}

/// Truncate long free text for table cells.
pub fn clip(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_owned();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[derive(serde::Serialize, Tabled)]
    struct Row {
        #[tabled(rename = "ID")]
        id: u32,
        name: &'static str,
    }

    fn rows() -> Vec<Row> {
        vec![Row { id: 1, name: "Lyon" }, Row { id: 2, name: "Paris" }]
    }

    #[test]
    fn plain_lists_one_id_per_line() {
        let out = render_list(
            &OutputFormat::Plain,
            &rows(),
            |r| Row { id: r.id, name: r.name },
            |r| r.id.to_string(),
        )
        .unwrap();
        assert_eq!(out, "1\n2");
    }

    #[test]
    fn compact_json_is_single_line() {
        let out = render_list(
            &OutputFormat::JsonCompact,
            &rows(),
            |r| Row { id: r.id, name: r.name },
            |r| r.id.to_string(),
        )
        .unwrap();
        assert_eq!(out, r#"[{"id":1,"name":"Lyon"},{"id":2,"name":"Paris"}]"#);
    }

    #[test]
    fn table_has_headers() {
        let out = render_list(
            &OutputFormat::Table,
            &rows(),
            |r| Row { id: r.id, name: r.name },
            |r| r.id.to_string(),
        )
        .unwrap();
        assert!(out.contains("ID"));
        assert!(out.contains("Paris"));
    }

    #[test]
    fn cell_helpers() {
        let at = Utc.with_ymd_and_hms(2031, 3, 10, 9, 0, 0).unwrap();
        assert_eq!(timestamp(at), "2031-03-10 09:00");
        assert_eq!(or_dash(None::<u32>), "-");
        assert_eq!(clip("diagnostic complet", 6), "diagn…");
        assert_eq!(clip("court", 6), "court");
    }
}
