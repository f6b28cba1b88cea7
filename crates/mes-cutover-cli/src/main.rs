//! mes-cutover CLI - legacy MSSQL to target PostgreSQL schema cutover.

use clap::{Parser, Subcommand};
use mes_cutover::config::Config;
use mes_cutover::model::COLLECTIONS;
use mes_cutover::phases::Cutover;
use mes_cutover::source::MssqlLegacy;
use mes_cutover::target::PgTarget;
use mes_cutover::{validate, CutoverError};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{info, Level};
use tracing_subscriber::fmt::format::FmtSpan;

#[derive(Parser)]
#[command(name = "mes-cutover")]
#[command(about = "One-time legacy-to-target schema cutover for the MES")]
#[command(version)]
struct Cli {
    /// Path to YAML configuration file
    #[arg(short, long, default_value = "cutover.yaml")]
    config: PathBuf,

    /// Log format: text or json
    #[arg(long, default_value = "text")]
    log_format: String,

    /// Log verbosity: debug, info, warn, error
    #[arg(long, default_value = "info")]
    verbosity: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full cutover: migrate every table, write the report,
    /// then validate
    Run {
        /// Override the report file path
        #[arg(long)]
        report: Option<PathBuf>,

        /// Migrate rows flagged with the is-test marker too
        #[arg(long)]
        include_test_rows: bool,

        /// Skip post-run validation
        #[arg(long)]
        skip_validation: bool,
    },

    /// Run only the post-run validation checks against both stores
    Validate,

    /// Test connectivity to both stores
    HealthCheck,

    /// Load and validate the configuration file, then exit
    CheckConfig,
}

#[tokio::main]
async fn main() -> ExitCode {
    match run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{}", e.format_detailed());
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run() -> Result<(), CutoverError> {
    let cli = Cli::parse();

    setup_logging(&cli.verbosity, &cli.log_format)
        .map_err(CutoverError::Config)?;

    let mut config = Config::load(&cli.config)?;
    info!("Loaded configuration from {:?}", cli.config);

    match cli.command {
        Commands::CheckConfig => {
            // Load above already validated.
            println!("Configuration OK");
        }

        Commands::HealthCheck => {
            let source = MssqlLegacy::connect(&config.source).await;
            let target = PgTarget::connect(&config.target).await;

            println!("Health Check Results:");
            match &source {
                Ok(_) => println!("  Legacy store (MSSQL): OK"),
                Err(e) => println!("  Legacy store (MSSQL): FAILED\n    Error: {}", e),
            }
            match &target {
                Ok(_) => println!("  Target store (PostgreSQL): OK"),
                Err(e) => println!("  Target store (PostgreSQL): FAILED\n    Error: {}", e),
            }

            if source.is_err() || target.is_err() {
                return Err(CutoverError::Config("Health check failed".to_string()));
            }
            println!("\n  Overall: HEALTHY");
        }

        Commands::Run {
            report,
            include_test_rows,
            skip_validation,
        } => {
            if let Some(path) = report {
                config.migration.report_path = path;
            }
            if include_test_rows {
                config.migration.skip_test_rows = false;
            }

            let reader = MssqlLegacy::connect(&config.source).await?;
            let store = PgTarget::connect(&config.target).await?;
            store.ensure_collections(COLLECTIONS).await?;

            let log = Cutover::new(&reader, &store, &config.migration).run().await?;
            log.print_summary();
            log.save_report(&config.migration.report_path)?;
            println!(
                "\nReport written to {}",
                config.migration.report_path.display()
            );

            if !skip_validation {
                let report = validate::validate(&reader, &store, &config.migration).await?;
                report.print();
                if !report.is_clean() {
                    println!("\nValidation found discrepancies; review before cutover sign-off.");
                }
            }
        }

        Commands::Validate => {
            let reader = MssqlLegacy::connect(&config.source).await?;
            let store = PgTarget::connect(&config.target).await?;

            let report = validate::validate(&reader, &store, &config.migration).await?;
            report.print();
            if report.is_clean() {
                println!("\nValidation completed successfully");
            }
        }
    }

    Ok(())
}

fn setup_logging(verbosity: &str, format: &str) -> Result<(), String> {
    let level = match verbosity.to_lowercase().as_str() {
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let subscriber = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_span_events(FmtSpan::CLOSE)
        .with_target(false);

    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    Ok(())
}
