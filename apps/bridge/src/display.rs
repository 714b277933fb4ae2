//! Output rendering and formatting

use bridge_config::Config;
use bridge_install::InstallOutcome;
use bridge_ops::SyncResult;
use comfy_table::{presets::UTF8_FULL, Attribute, Cell, Color, ContentArrangement, Table};
use console::{Style, Term};
use serde_json::json;
use std::io;

/// Result of one CLI command, ready to render
#[derive(Debug)]
pub enum CommandOutput {
    Sync { result: SyncResult, check_only: bool },
    Install(InstallOutcome),
    Config(Config),
    Message(String),
}

impl CommandOutput {
    /// Whether the command should exit with status 0
    pub fn is_success(&self) -> bool {
        match self {
            Self::Sync { result, .. } => result.outcomes.failed() == 0 && result.updated != Some(false),
            Self::Install(outcome) => outcome.is_success(),
            Self::Config(_) | Self::Message(_) => true,
        }
    }
}

/// Output renderer for CLI results
#[derive(Clone)]
pub struct OutputRenderer {
    /// Use JSON output format
    json_output: bool,
    /// Terminal instance
    term: Term,
}

impl OutputRenderer {
    /// Create new output renderer
    pub fn new(json_output: bool) -> Self {
        Self {
            json_output,
            term: Term::stdout(),
        }
    }

    /// Render command output
    pub fn render(&self, output: &CommandOutput) -> io::Result<()> {
        if self.json_output {
            let value = Self::to_json(output).map_err(io::Error::other)?;
            println!("{}", serde_json::to_string_pretty(&value).map_err(io::Error::other)?);
            return Ok(());
        }

        match output {
            CommandOutput::Sync { result, check_only } => self.render_sync(result, *check_only),
            CommandOutput::Install(outcome) => self.render_install(outcome),
            CommandOutput::Config(config) => Self::render_config(config),
            CommandOutput::Message(message) => self.render_message(message),
        }
    }

    fn to_json(output: &CommandOutput) -> Result<serde_json::Value, serde_json::Error> {
        Ok(match output {
            CommandOutput::Sync { result, .. } => serde_json::to_value(result)?,
            CommandOutput::Install(InstallOutcome::Success { slug, path }) => json!({
                "success": true,
                "slug": slug,
                "path": path,
            }),
            CommandOutput::Install(InstallOutcome::Failure { slug, stage, failure }) => json!({
                "success": false,
                "slug": slug,
                "stage": stage,
                "failure": failure,
            }),
            CommandOutput::Config(config) => serde_json::to_value(config)?,
            CommandOutput::Message(message) => json!({ "success": true, "message": message }),
        })
    }

    fn styled(&self, style: &Style, text: &str) -> String {
        if self.term.features().colors_supported() {
            style.apply_to(text).to_string()
        } else {
            text.to_string()
        }
    }

    fn render_sync(&self, result: &SyncResult, check_only: bool) -> io::Result<()> {
        if !result.updates_available {
            println!("{}", self.styled(&Style::new().green(), "No updates available."));
            return Ok(());
        }

        println!(
            "Updates available: {} pending, {} listed.",
            result.pending_count,
            result.packages.len()
        );
        if check_only {
            for package in &result.packages {
                println!("  - {}", package.key());
            }
            return Ok(());
        }
        if result.delegated {
            if result.updated == Some(false) {
                let line = "The external updater reported that some updates failed or were unavailable.";
                eprintln!("{}", self.styled(&Style::new().yellow(), line));
            } else {
                println!("Updates were applied by the external updater.");
            }
            return Ok(());
        }
        if result.outcomes.is_empty() {
            println!("No listed package had a downloadable source.");
            return Ok(());
        }

        let mut table = Table::new();
        table
            .load_preset(UTF8_FULL)
            .set_content_arrangement(ContentArrangement::Dynamic);
        table.set_header(vec![
            Cell::new("Package").add_attribute(Attribute::Bold),
            Cell::new("Result").add_attribute(Attribute::Bold),
        ]);
        for (key, tag) in result.outcomes.iter() {
            let cell = if tag == "ok" {
                Cell::new("installed").fg(Color::Green)
            } else {
                Cell::new(tag).fg(Color::Red)
            };
            table.add_row(vec![Cell::new(key), cell]);
        }
        println!("{table}");
        Ok(())
    }

    fn render_install(&self, outcome: &InstallOutcome) -> io::Result<()> {
        match outcome {
            InstallOutcome::Success { slug, path } => {
                let line = format!("[OK] Installed {slug} into {}", path.display());
                println!("{}", self.styled(&Style::new().green(), &line));
            }
            InstallOutcome::Failure { slug, stage, failure } => {
                let line = format!("[ERROR] Installing {slug} failed during {stage}: {}", failure.message);
                eprintln!("{}", self.styled(&Style::new().red(), &line));
                if let Some(code) = &failure.code {
                    eprintln!("  Code: {code}");
                }
                if let Some(hint) = &failure.hint {
                    eprintln!("  Hint: {hint}");
                }
            }
        }
        Ok(())
    }

    fn render_config(config: &Config) -> io::Result<()> {
        let text = toml::to_string_pretty(config).map_err(io::Error::other)?;
        print!("{text}");
        Ok(())
    }

    fn render_message(&self, message: &str) -> io::Result<()> {
        println!("{}", self.styled(&Style::new().bold(), message));
        Ok(())
    }
}
