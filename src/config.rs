//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.lqfb-digest.toml` files.

use crate::report::SectionGuard;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default configuration file name.
pub const CONFIG_FILE: &str = ".lqfb-digest.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Database settings.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Report settings.
    #[serde(default)]
    pub report: ReportConfig,

    /// Mail settings.
    #[serde(default)]
    pub mail: MailConfig,
}

/// Data source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL.
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Organizational unit whose issues are reported.
    #[serde(default = "default_unit_id")]
    pub unit_id: i32,

    /// Issues closed more than this many days ago are left out.
    #[serde(default = "default_lookback_days")]
    pub lookback_days: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
            unit_id: default_unit_id(),
            lookback_days: default_lookback_days(),
        }
    }
}

fn default_database_url() -> String {
    "postgres:///liquid_feedback?user=www-data".to_string()
}

fn default_unit_id() -> i32 {
    1
}

fn default_lookback_days() -> u32 {
    7
}

/// Report rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Base URL of the LiquidFeedback instance.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Contact address printed in the closing remarks.
    #[serde(default = "default_contact_email")]
    pub contact_email: String,

    /// Subject prefix, followed by the date.
    #[serde(default = "default_subject_prefix")]
    pub subject_prefix: String,

    /// Gate all open-phase sections on the voting bucket, like older digests.
    #[serde(default)]
    pub legacy_section_guard: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            contact_email: default_contact_email(),
            subject_prefix: default_subject_prefix(),
            legacy_section_guard: false,
        }
    }
}

fn default_base_url() -> String {
    "http://localhost/lqfb/".to_string()
}

fn default_contact_email() -> String {
    "lqfb@localhost".to_string()
}

fn default_subject_prefix() -> String {
    "LQFB Zusammenfassung".to_string()
}

/// Mail delivery settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailConfig {
    /// Sender mailbox.
    #[serde(default = "default_from")]
    pub from: String,

    /// Comma-separated recipient mailboxes.
    #[serde(default)]
    pub to: String,

    /// SMTP relay host.
    #[serde(default = "default_smtp_host")]
    pub smtp_host: String,

    /// SMTP relay port.
    #[serde(default = "default_smtp_port")]
    pub smtp_port: u16,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            from: default_from(),
            to: String::new(),
            smtp_host: default_smtp_host(),
            smtp_port: default_smtp_port(),
        }
    }
}

fn default_from() -> String {
    "LQFB Announce <announce@localhost>".to_string()
}

fn default_smtp_host() -> String {
    "localhost".to_string()
}

fn default_smtp_port() -> u16 {
    25
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// Only values given on the command line override the file.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref url) = args.database_url {
            self.database.url = url.clone();
        }
        if let Some(unit) = args.unit {
            self.database.unit_id = unit;
        }
        if let Some(days) = args.days {
            self.database.lookback_days = days;
        }

        if let Some(ref base_url) = args.base_url {
            self.report.base_url = base_url.clone();
        }
        if args.legacy_section_guard {
            self.report.legacy_section_guard = true;
        }

        if let Some(ref from) = args.from {
            self.mail.from = from.clone();
        }
        if let Some(ref to) = args.to {
            self.mail.to = to.clone();
        }
        if let Some(ref host) = args.smtp_host {
            self.mail.smtp_host = host.clone();
        }
        if let Some(port) = args.smtp_port {
            self.mail.smtp_port = port;
        }

        self.report.base_url = normalize_base_url(&self.report.base_url);
    }

    /// Check the merged configuration before any I/O happens.
    pub fn validate(&self, sending: bool) -> Result<()> {
        let url = &self.report.base_url;
        if !url.starts_with("http://") && !url.starts_with("https://") {
            bail!("Base URL must start with 'http://' or 'https://': {}", url);
        }

        if sending && self.mail.to.trim().is_empty() {
            bail!("No recipient configured; set mail.to or pass --to");
        }

        Ok(())
    }

    /// Section guard selected by the report settings.
    pub fn section_guard(&self) -> SectionGuard {
        if self.report.legacy_section_guard {
            SectionGuard::Voting
        } else {
            SectionGuard::OwnBucket
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

/// Ensure the base URL ends with a slash so issue paths can be appended.
fn normalize_base_url(url: &str) -> String {
    if url.ends_with('/') {
        url.to_string()
    } else {
        format!("{}/", url)
    }
}
