//! Monitor subcommands
//!
//! - `run`: drive the orchestrator on a timer and print snapshots
//! - `ranges`: print or validate a range table

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};
use tracing::info;

use athlete_monitor_vitals::{
    default_roster, Bounds, HealthStatus, MonitorConfig, ReferenceAdvisor, Severity,
    SimulationOrchestrator, StatusSummary, SubjectId, SubjectSnapshot, VitalKind,
    VitalRangeTable, VitalReading,
};

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Number of ticks to run
    #[arg(short, long, default_value = "10")]
    pub ticks: u64,

    /// Tick interval in milliseconds (overrides the config file)
    #[arg(short, long)]
    pub interval: Option<u64>,

    /// RNG seed for a reproducible run
    #[arg(short, long)]
    pub seed: Option<u64>,

    /// Monitor configuration file (JSON)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Range table file (JSON), replaces the configured ranges
    #[arg(short, long)]
    pub ranges: Option<PathBuf>,

    /// Attach the reference infection advisor
    #[arg(long)]
    pub advisor: bool,

    /// Output format
    #[arg(short, long, value_enum, default_value = "table")]
    pub format: OutputFormat,

    /// Print history statistics for this subject id when done
    #[arg(long)]
    pub history: Option<u32>,
}

/// Arguments for the ranges command
#[derive(Args, Debug)]
pub struct RangesArgs {
    /// Range table file (JSON); shows the built-in table if omitted
    #[arg(short, long)]
    pub file: Option<PathBuf>,

    /// Output format
    #[arg(long, value_enum, default_value = "table")]
    pub format: OutputFormat,
}

/// Output format
#[derive(ValueEnum, Clone, Debug, Default)]
pub enum OutputFormat {
    /// Pretty table output
    #[default]
    Table,
    /// JSON output
    Json,
    /// Compact single-line output
    Compact,
}

// ============================================================================
// Display Structs for Tables
// ============================================================================

/// Snapshot display row for tables
#[derive(Tabled)]
struct SnapshotRow {
    #[tabled(rename = "#")]
    number: u16,
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Position")]
    position: String,
    #[tabled(rename = "Temp")]
    temperature: String,
    #[tabled(rename = "HR")]
    heart_rate: String,
    #[tabled(rename = "SpO2")]
    blood_oxygen: String,
    #[tabled(rename = "Hydration")]
    hydration: String,
    #[tabled(rename = "Resp")]
    respiration: String,
    #[tabled(rename = "Fatigue")]
    fatigue: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Alert")]
    alert: String,
}

impl From<&SubjectSnapshot> for SnapshotRow {
    fn from(snapshot: &SubjectSnapshot) -> Self {
        let value = |kind: VitalKind| format_vital(&snapshot.reading, kind);
        Self {
            number: snapshot.subject.number,
            name: snapshot.subject.name.clone(),
            position: snapshot.subject.position.clone(),
            temperature: value(VitalKind::Temperature),
            heart_rate: value(VitalKind::HeartRate),
            blood_oxygen: value(VitalKind::BloodOxygen),
            hydration: value(VitalKind::Hydration),
            respiration: value(VitalKind::Respiration),
            fatigue: value(VitalKind::Fatigue),
            status: format_status(snapshot.status),
            alert: format_alert_duration(snapshot),
        }
    }
}

/// Range display row for tables
#[derive(Tabled)]
struct RangeRow {
    #[tabled(rename = "Vital")]
    vital: String,
    #[tabled(rename = "Normal")]
    normal: String,
    #[tabled(rename = "Warning")]
    warning: String,
    #[tabled(rename = "Alert")]
    alert: String,
    #[tabled(rename = "Aggregate")]
    aggregate: String,
}

/// One tick of JSON output
#[derive(Serialize)]
struct TickOutput<'a> {
    tick: u64,
    summary: StatusSummary,
    snapshots: &'a [SubjectSnapshot],
}

// ============================================================================
// Command Execution
// ============================================================================

/// Execute the run command
pub async fn execute_run(args: RunArgs) -> Result<()> {
    let config = build_config(&args)?;
    let table = config.ranges.clone();
    let interval_ms = config.tick_interval_ms;

    let mut orchestrator =
        SimulationOrchestrator::new(config).context("Invalid monitor configuration")?;
    if args.advisor {
        orchestrator = orchestrator.with_advisor(Arc::new(ReferenceAdvisor::new()));
    }

    let roster = default_roster();
    info!(subjects = roster.len(), ticks = args.ticks, interval_ms, "starting simulation");

    let mut interval = tokio::time::interval(Duration::from_millis(interval_ms));
    let mut last = Vec::new();
    for tick in 1..=args.ticks {
        interval.tick().await;
        last = orchestrator.tick(&roster);
        print_tick(tick, &last, &table, &args.format)?;
    }

    if !matches!(args.format, OutputFormat::Json) {
        print_summary(&StatusSummary::from_snapshots(&last));
    }

    if let Some(id) = args.history {
        print_history(&orchestrator, SubjectId(id), &args.format)?;
    }

    Ok(())
}

/// Execute the ranges command
pub fn execute_ranges(args: RangesArgs) -> Result<()> {
    let table = match &args.file {
        Some(path) => VitalRangeTable::load(path)
            .with_context(|| format!("Failed to load range table from {}", path.display()))?,
        None => VitalRangeTable::default(),
    };

    if let Some(path) = &args.file {
        println!(
            "{} {} is a valid range table",
            "[OK]".green().bold(),
            path.display()
        );
    }

    let rows = range_rows(&table);
    match args.format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&table)?),
        OutputFormat::Compact => {
            for row in rows {
                println!(
                    "{}: normal {} warning {} alert {}",
                    row.vital, row.normal, row.warning, row.alert
                );
            }
        }
        OutputFormat::Table => {
            let table = Table::new(rows).with(Style::rounded()).to_string();
            println!("{table}");
        }
    }

    Ok(())
}

/// Assemble the configuration from file, overrides and defaults.
fn build_config(args: &RunArgs) -> Result<MonitorConfig> {
    let mut config = match &args.config {
        Some(path) => MonitorConfig::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => MonitorConfig::default(),
    };
    if let Some(path) = &args.ranges {
        config.ranges = VitalRangeTable::load(path)
            .with_context(|| format!("Failed to load range table from {}", path.display()))?;
    }
    if let Some(seed) = args.seed {
        config.seed = Some(seed);
    }
    if let Some(interval) = args.interval {
        config.tick_interval_ms = interval.max(10);
    }
    config.validate().context("Invalid monitor configuration")?;
    Ok(config)
}

fn print_tick(
    tick: u64,
    snapshots: &[SubjectSnapshot],
    table: &VitalRangeTable,
    format: &OutputFormat,
) -> Result<()> {
    match format {
        OutputFormat::Json => {
            let output = TickOutput {
                tick,
                summary: StatusSummary::from_snapshots(snapshots),
                snapshots,
            };
            println!("{}", serde_json::to_string(&output)?);
        }
        OutputFormat::Compact => {
            let line: Vec<String> = snapshots
                .iter()
                .map(|s| format!("#{}={}", s.subject.number, format_status(s.status)))
                .collect();
            println!("[{tick:>4}] {}", line.join(" "));
        }
        OutputFormat::Table => {
            println!("{} Tick {}", "[MONITOR]".bright_cyan().bold(), tick);
            let rows: Vec<SnapshotRow> = snapshots.iter().map(SnapshotRow::from).collect();
            println!("{}", Table::new(rows).with(Style::rounded()).to_string());
            for snapshot in snapshots {
                print_abnormal(snapshot, table);
            }
            println!();
        }
    }
    Ok(())
}

fn print_abnormal(snapshot: &SubjectSnapshot, table: &VitalRangeTable) {
    let findings = snapshot.abnormal_vitals(table);
    if findings.is_empty() {
        return;
    }
    let title = if snapshot.status == HealthStatus::Infection {
        format!("Potential infection detected for {}", snapshot.subject.name)
            .purple()
            .bold()
    } else {
        format!("Health alert for {}", snapshot.subject.name).red().bold()
    };
    println!("  {title}");
    for finding in findings {
        let severity = match finding.severity {
            Severity::High => "HIGH".red().bold(),
            Severity::Medium => "MEDIUM".yellow(),
        };
        println!(
            "    {} {} {} (normal {}-{}): {}",
            severity,
            finding.kind.label(),
            finding.display_value(),
            finding.normal_range.0,
            finding.normal_range.1,
            finding.note.dimmed()
        );
    }
}

fn print_summary(summary: &StatusSummary) {
    println!("{}", "Status summary:".bold());
    println!(
        "  {} {}  {} {}  {} {}  {} {}",
        "NORMAL:".green().bold(),
        summary.normal,
        "WARNING:".yellow().bold(),
        summary.warning,
        "ALERT:".red().bold(),
        summary.alert,
        "INFECTION:".purple().bold(),
        summary.infection
    );
}

fn print_history(
    orchestrator: &SimulationOrchestrator,
    id: SubjectId,
    format: &OutputFormat,
) -> Result<()> {
    let history = orchestrator.history(id);
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&history)?),
        _ => match orchestrator.stats(id) {
            Some(stats) => {
                println!("{} subject {}", "History:".bold(), id);
                println!(
                    "  {} {}  {} {:.0} ({:.0}-{:.0})  {} {:.1} ({:.1}-{:.1})",
                    "Readings:".dimmed(),
                    stats.count,
                    "HR:".dimmed(),
                    stats.hr_mean,
                    stats.hr_min,
                    stats.hr_max,
                    "Temp:".dimmed(),
                    stats.temp_mean,
                    stats.temp_min,
                    stats.temp_max
                );
            }
            None => println!("{} No history for subject {}", "[WARN]".yellow(), id),
        },
    }
    Ok(())
}

fn range_rows(table: &VitalRangeTable) -> Vec<RangeRow> {
    VitalKind::ALL
        .iter()
        .map(|&kind| {
            let range = table.get(kind);
            let band = |bounds: Option<Bounds>| match bounds {
                Some(b) => format_bounds(b.min, b.max),
                None => "-".to_string(),
            };
            let alert = if range.has_sub_bands() {
                band(range.alert)
            } else {
                format!(
                    "outside {:.1}-{:.1}",
                    range.lower_threshold(),
                    range.upper_threshold()
                )
            };
            RangeRow {
                vital: format!("{} ({})", kind.label(), kind.unit()),
                normal: format!("{}-{}", range.min, range.max),
                warning: band(range.warning),
                alert,
                aggregate: if kind.is_primary() { "yes" } else { "no" }.to_string(),
            }
        })
        .collect()
}

// ============================================================================
// Formatting Helpers
// ============================================================================

/// Format health status with color
fn format_status(status: HealthStatus) -> String {
    match status {
        HealthStatus::Normal => "NORMAL".green().to_string(),
        HealthStatus::Warning => "WARNING".yellow().bold().to_string(),
        HealthStatus::Alert => "ALERT".red().bold().to_string(),
        HealthStatus::Infection => "INFECTION".purple().bold().to_string(),
    }
}

fn format_vital(reading: &VitalReading, kind: VitalKind) -> String {
    reading
        .value(kind)
        .map_or_else(|| "-".to_string(), |v| kind.format_value(v))
}

fn format_alert_duration(snapshot: &SubjectSnapshot) -> String {
    match snapshot.alert_duration_secs {
        Some(secs) if snapshot.needs_attention() => format!("{secs:.0}s").red().bold().to_string(),
        Some(secs) => format!("{secs:.0}s"),
        None => String::new(),
    }
}

fn format_bounds(min: Option<f64>, max: Option<f64>) -> String {
    match (min, max) {
        (Some(min), Some(max)) => format!("outside {min}-{max}"),
        (Some(min), None) => format!("below {min}"),
        (None, Some(max)) => format!("above {max}"),
        (None, None) => "-".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_args() -> RunArgs {
        RunArgs {
            ticks: 1,
            interval: None,
            seed: None,
            config: None,
            ranges: None,
            advisor: false,
            format: OutputFormat::Compact,
            history: None,
        }
    }

    #[test]
    fn test_build_config_applies_overrides() {
        let args = RunArgs {
            seed: Some(5),
            interval: Some(1),
            ..run_args()
        };
        let config = build_config(&args).unwrap();
        assert_eq!(config.seed, Some(5));
        assert_eq!(config.tick_interval_ms, 10);
    }

    #[test]
    fn test_build_config_missing_file_fails() {
        let args = RunArgs {
            ranges: Some(PathBuf::from("/nonexistent/ranges.json")),
            ..run_args()
        };
        assert!(build_config(&args).is_err());
    }

    #[test]
    fn test_range_rows_cover_every_kind() {
        let rows = range_rows(&VitalRangeTable::default());
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[0].alert, "outside 36.4-37.6");
        assert_eq!(rows[2].alert, "below 92");
        assert_eq!(rows[5].warning, "above 50");
        assert_eq!(rows[3].aggregate, "no");
    }

    #[test]
    fn test_format_bounds() {
        assert_eq!(format_bounds(Some(1.0), None), "below 1");
        assert_eq!(format_bounds(None, None), "-");
    }

    #[test]
    fn test_format_vital_missing_kind() {
        let reading = VitalReading::primary(37.0, 72.0, 98.0, 0.0);
        assert_eq!(format_vital(&reading, VitalKind::Fatigue), "-");
        assert_eq!(format_vital(&reading, VitalKind::HeartRate), "72");
    }

    #[tokio::test]
    async fn test_execute_run_short() {
        let args = RunArgs {
            ticks: 2,
            interval: Some(10),
            seed: Some(1),
            history: Some(1),
            ..run_args()
        };
        assert!(execute_run(args).await.is_ok());
    }
}
