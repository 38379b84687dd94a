//! lqfb-digest - weekly LiquidFeedback initiative digest
//!
//! A CLI tool that reads the issues of one LiquidFeedback unit,
//! groups them by phase and mails a plain-text summary.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (config, database, rendering, mail delivery)

mod analysis;
mod cli;
mod config;
mod mail;
mod models;
mod report;
mod store;

use anyhow::{Context, Result};
use chrono::Local;
use cli::{Args, OutputFormat};
use config::{Config, CONFIG_FILE};
use models::Digest;
use report::ReportContext;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // Initialize logging
    init_logging(&args);

    info!("lqfb-digest v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run_digest(args).await {
        error!("Digest failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default .lqfb-digest.toml.
fn handle_init_config() -> Result<()> {
    let path = std::path::Path::new(CONFIG_FILE);

    if path.exists() {
        eprintln!("⚠️  {} already exists. Remove it first or edit it manually.", CONFIG_FILE);
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content).with_context(|| format!("Failed to write {}", CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE);
    println!("   Edit it to set the database URL, base URL and recipients.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("Failed to set tracing subscriber");
}

/// Run the complete digest workflow: query, classify, render, deliver.
async fn run_digest(args: Args) -> Result<()> {
    // Load configuration
    let mut config = load_config(&args)?;
    config.merge_with_args(&args);

    let sending = !args.dry_run;
    config.validate(sending)?;

    let today = Local::now().date_naive();
    let since = args.since_date(today, config.database.lookback_days);
    let unit_id = config.database.unit_id;

    // Step 1: Fetch the joined issue rows
    if !args.quiet {
        println!("📥 Loading issues of unit {} (closed since {})", unit_id, since);
    }
    let rows = store::fetch_digest_rows(&config.database.url, unit_id, since).await?;

    // Step 2: Classify issues into phases
    let digest = analysis::classify_and_aggregate(rows, unit_id, since);

    // Step 3: Render the report
    let subject = report::subject_line(&config.report.subject_prefix, today);
    let ctx = ReportContext {
        base_url: config.report.base_url.clone(),
        contact_email: config.report.contact_email.clone(),
        section_guard: config.section_guard(),
    };
    let body = report::generate_text_report(&digest, &ctx)
        .context("Failed to render digest")?;

    if let Some(ref path) = args.output {
        let output = render_output(&digest, &subject, &body, args.format)?;
        std::fs::write(path, &output)
            .with_context(|| format!("Failed to write digest to {}", path.display()))?;
        info!("Digest written to {}", path.display());
    }

    if !args.quiet {
        print_summary(&digest, &subject);
    }

    // Step 4: Deliver
    if args.dry_run {
        println!("{}", render_output(&digest, &subject, &body, args.format)?);
        if !args.quiet {
            println!("\n✅ Dry run complete. No mail was sent.");
        }
        return Ok(());
    }

    if digest.is_empty() {
        warn!("No issues found for unit {}; sending digest without sections", unit_id);
    }

    let message = mail::compose_message(&subject, &config.mail.from, &config.mail.to, body)?;
    let smtp = mail::SmtpSettings {
        host: config.mail.smtp_host.clone(),
        port: config.mail.smtp_port,
    };
    mail::send_message(&smtp, message).await?;

    if !args.quiet {
        println!("\n✅ Digest sent to {}", config.mail.to);
    }
    Ok(())
}

/// Render the digest in the requested output format.
fn render_output(digest: &Digest, subject: &str, body: &str, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(format!("Subject: {}\n\n{}", subject, body)),
        OutputFormat::Json => report::generate_json_report(digest, subject),
    }
}

/// Print issue counts per phase.
fn print_summary(digest: &Digest, subject: &str) {
    let summary = digest.summary();

    println!("\n📊 Digest Summary:");
    println!("   Subject: {}", subject);
    println!("   Issues: {}", summary.issues());
    println!(
        "   - Closed: {} | Voting: {} | Frozen: {} | Discussion: {} | New: {}",
        summary.closed, summary.voting, summary.frozen, summary.discussion, summary.new
    );
    println!("   Initiatives: {}", summary.initiatives);
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<Config> {
    // Try explicit config path
    if let Some(ref config_path) = args.config {
        info!("Loading config from: {}", config_path.display());
        return Config::load(config_path);
    }

    // Try default location
    match Config::load_default()? {
        Some(config) => {
            info!("Loaded default config from {}", CONFIG_FILE);
            Ok(config)
        }
        None => {
            debug!("No config file found, using defaults");
            Ok(Config::default())
        }
    }
}
