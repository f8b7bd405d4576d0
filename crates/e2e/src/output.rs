//! Output formatting for the runner binary

use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};

use cart_e2e::runner::{TestResult, TestSuiteResult};

/// Output format
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
    /// Plain text format
    Plain,
}

fn row(result: &TestResult) -> Vec<String> {
    let totals = result
        .reconciliations
        .last()
        .map(|r| format!("${} / ${}", r.expected, r.observed))
        .unwrap_or_else(|| "-".to_string());
    vec![
        result.name.clone(),
        if result.success { "pass" } else { "FAIL" }.to_string(),
        totals,
        format!("{} ms", result.duration_ms),
        result.error.clone().unwrap_or_default(),
    ]
}

/// Print the suite summary
pub fn print_suite(suite: &TestSuiteResult, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic);

            table.set_header(vec!["Scenario", "Result", "Expected / Observed", "Duration", "Error"]);
            for result in &suite.results {
                table.add_row(row(result));
            }

            println!("{table}");
            print_totals(suite);
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(suite)?);
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(suite)?);
        }
        OutputFormat::Plain => {
            for (i, result) in suite.results.iter().enumerate() {
                if i > 0 {
                    println!("---");
                }
                let headers = ["scenario", "result", "totals", "duration", "error"];
                for (header, value) in headers.iter().zip(row(result)) {
                    println!("{}: {}", header, value);
                }
            }
            print_totals(suite);
        }
    }
    Ok(())
}

fn print_totals(suite: &TestSuiteResult) {
    let summary = format!(
        "{} passed, {} failed ({} ms)",
        suite.passed, suite.failed, suite.duration_ms
    );
    if suite.all_passed() {
        println!("✅ {}", summary.green());
    } else {
        println!("❌ {}", summary.red());
    }
}
