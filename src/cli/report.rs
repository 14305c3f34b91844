use camino::Utf8Path;
use colored::Colorize;
use comfy_table::{Table, presets::UTF8_FULL};

use crate::config::SettingsRegistry;
use crate::models::Settings;
use crate::pipeline::{PipelineEvent, PipelineObserver, PipelineReport};

/// Prints pipeline events to stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleReporter;

impl ConsoleReporter {
    /// One line per event, or `None` for events that print nothing.
    pub fn render(event: &PipelineEvent) -> Option<String> {
        let line = match event {
            PipelineEvent::StageStarted { stage, .. } => {
                format!("{} Running {}...", "▶".blue(), stage)
            }
            PipelineEvent::StageSkipped { stage } => {
                format!("{} Skipping {}", "↷".yellow(), stage)
            }
            PipelineEvent::StageFinished {
                stage,
                success: true,
                ..
            } => format!("{}", format!("✓ {} completed successfully!", stage).green()),
            PipelineEvent::StageFinished {
                stage,
                success: false,
                error,
            } => format!(
                "{}\n  Error: {}",
                format!("✗ {} failed!", stage).red(),
                error.as_deref().unwrap_or("unknown error")
            ),
            PipelineEvent::PipelineFinished { .. } => return None,
        };
        Some(line)
    }
}

impl PipelineObserver for ConsoleReporter {
    fn notify(&self, event: PipelineEvent) {
        if let Some(line) = Self::render(&event) {
            println!("{}", line);
        }
    }
}

/// Final summary printed after a successful `run`.
pub fn pipeline_summary(report: &PipelineReport, output_root: &Utf8Path) -> String {
    let mut lines = vec![format!("{}", "Pipeline completed successfully!".green().bold())];
    for outcome in &report.completed {
        lines.push(format!(
            "  {:<16} {} ({:.1}s)",
            outcome.stage.name(),
            outcome.output_dir,
            outcome.elapsed.as_secs_f32()
        ));
    }
    for stage in &report.skipped {
        lines.push(format!("  {:<16} skipped", stage.name()));
    }
    lines.push(format!(
        "Total time: {:.1}s",
        report.total_elapsed().as_secs_f32()
    ));
    lines.push(format!("Results saved to: {}", output_root));
    lines.join("\n")
}

/// Table of every registered setting, headed by the config file location.
pub fn settings_table(
    config_path: &Utf8Path,
    settings: &Settings,
    registry: &SettingsRegistry,
) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_header(vec!["Setting", "Name", "Value"]);

    table.add_row(vec![
        "Config File".to_string(),
        String::new(),
        config_path.to_string(),
    ]);
    for entry in registry.entries() {
        table.add_row(vec![
            entry.label.to_string(),
            entry.name.to_string(),
            entry.value(settings),
        ]);
    }
    table
}
