//! Table and JSON output formatting for CLI commands.

use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

/// Output format selection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable table
    #[default]
    Table,
    /// JSON output
    Json,
}

/// Renders rows as a rounded table; `None` when there is nothing to show.
pub fn render_table<T: Tabled>(rows: &[T]) -> Option<String> {
    if rows.is_empty() {
        return None;
    }
    let mut table = Table::new(rows);
    table.with(Style::rounded());
    Some(table.to_string())
}

/// Prints rows in the selected format. `empty` is shown instead of an
/// empty table.
pub fn print_list<T: Serialize + Tabled>(rows: &[T], format: OutputFormat, empty: &str) {
    match format {
        OutputFormat::Table => match render_table(rows) {
            Some(table) => println!("{table}"),
            None => print_warning(empty),
        },
        OutputFormat::Json => match serde_json::to_string_pretty(rows) {
            Ok(json) => println!("{json}"),
            Err(e) => print_error(&format!("cannot encode output: {e}")),
        },
    }
}

/// One-line verdict after a manifest check.
pub fn validation_summary(total: usize, invalid: usize) -> String {
    match (total, invalid) {
        (0, _) => "No extensions installed".to_string(),
        (total, 0) => format!("{total} extension manifest(s) valid"),
        (total, invalid) => format!("{invalid} of {total} extension manifest(s) are invalid"),
    }
}

pub fn print_success(msg: &str) {
    println!("✓ {msg}");
}

pub fn print_warning(msg: &str) {
    println!("⚠ {msg}");
}

pub fn print_error(msg: &str) {
    eprintln!("✗ {msg}");
}

/// Prints an indented `key: value` line.
pub fn print_kv(key: &str, value: &str) {
    println!("  {:<24} {}", format!("{key}:"), value);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Tabled)]
    struct Row {
        id: &'static str,
        status: &'static str,
    }

    #[test]
    fn test_render_table() {
        assert!(render_table::<Row>(&[]).is_none());

        let table = render_table(&[Row {
            id: "oauth",
            status: "ok",
        }])
        .expect("table");
        assert!(table.contains("oauth"));
        assert!(table.starts_with('╭'));
    }

    #[test]
    fn test_validation_summary() {
        assert_eq!(validation_summary(0, 0), "No extensions installed");
        assert_eq!(validation_summary(3, 0), "3 extension manifest(s) valid");
        assert_eq!(
            validation_summary(3, 1),
            "1 of 3 extension manifest(s) are invalid"
        );
    }
}
