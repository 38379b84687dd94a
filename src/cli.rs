//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;

/// lqfb-digest - weekly LiquidFeedback initiative digest
///
/// Queries the LiquidFeedback database for the issues of one unit,
/// groups them by phase and mails a plain-text summary. Meant to be
/// run from cron or a systemd timer.
///
/// Examples:
///   lqfb-digest --to aktive@lists.example.org
///   lqfb-digest --unit 2 --days 14 --base-url https://lqfb.example.org/lsa/
///   lqfb-digest --dry-run --format json
///   lqfb-digest --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Unit whose issues are summarized
    #[arg(short, long, value_name = "ID", env = "LQFB_UNIT_ID")]
    pub unit: Option<i32>,

    /// Include issues closed on or after this date (YYYY-MM-DD)
    #[arg(short, long, value_name = "DATE", conflicts_with = "days")]
    pub since: Option<NaiveDate>,

    /// Include issues closed within the last DAYS days
    ///
    /// Default: from config or 7.
    #[arg(short, long, value_name = "DAYS")]
    pub days: Option<u32>,

    /// PostgreSQL connection URL
    ///
    /// Example: postgres://www-data@localhost/liquid_feedback
    #[arg(long, value_name = "URL", env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Base URL of the LiquidFeedback instance used for issue links
    #[arg(short, long, value_name = "URL", env = "LQFB_BASE_URL")]
    pub base_url: Option<String>,

    /// Sender mailbox, e.g. "LQFB Announce <announce@example.org>"
    #[arg(long, value_name = "MAILBOX")]
    pub from: Option<String>,

    /// Recipient mailboxes (comma-separated)
    #[arg(long, value_name = "MAILBOXES")]
    pub to: Option<String>,

    /// SMTP relay host
    #[arg(long, value_name = "HOST")]
    pub smtp_host: Option<String>,

    /// SMTP relay port
    #[arg(long, value_name = "PORT")]
    pub smtp_port: Option<u16>,

    /// Gate all open-phase sections on the voting section
    ///
    /// Reproduces the layout of older digests, where frozen, discussion
    /// and new issues were only listed while some issue was in voting.
    #[arg(long)]
    pub legacy_section_guard: bool,

    /// Path to configuration file
    ///
    /// If not specified, looks for .lqfb-digest.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Render the digest and print it instead of sending it
    #[arg(long)]
    pub dry_run: bool,

    /// Also write the rendered digest to this file
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format for --dry-run and --output (text, json)
    #[arg(long, default_value = "text", value_name = "FORMAT")]
    pub format: OutputFormat,

    /// Generate a default .lqfb-digest.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Output format for printed or saved digests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Plain text, exactly as mailed (default)
    #[default]
    Text,
    /// Classified issues as JSON
    Json,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        // Check for conflicting options
        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.days == Some(0) {
            return Err("Days must be at least 1".to_string());
        }

        if self.smtp_port == Some(0) {
            return Err("SMTP port must not be 0".to_string());
        }

        // Validate base URL format
        if let Some(ref url) = self.base_url {
            if !url.starts_with("http://") && !url.starts_with("https://") {
                return Err("Base URL must start with 'http://' or 'https://'".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }

    /// Returns the cut-off date for closed issues.
    pub fn since_date(&self, today: NaiveDate, lookback_days: u32) -> NaiveDate {
        self.since
            .unwrap_or_else(|| today - chrono::Days::new(u64::from(lookback_days)))
    }
}
