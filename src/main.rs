use clap::{Parser, Subcommand};
use console::style;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use procweave::cli::ConfigOverrides;
use procweave::cli::commands::{self, analyze::AnalyzeOptions};

#[derive(Parser)]
#[command(name = "procweave")]
#[command(
    version,
    about = "LLM-driven documentation and code generation for legacy SQL Server systems"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    #[arg(long, global = true)]
    verbose: bool,

    #[arg(long, short, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Document a stored procedure call tree and optionally generate backend code
    Analyze {
        #[arg(long, help = "DDL file with every CREATE TABLE statement")]
        tables: Option<PathBuf>,
        #[arg(long, help = "Entry procedure file name (e.g. sp_payroll.sql)")]
        entry: String,
        #[arg(long, help = "Directory with one stored procedure per file")]
        procedures: Option<PathBuf>,
        #[arg(long = "app-dir", help = "Root of the legacy application sources")]
        app_dir: Option<PathBuf>,
        #[arg(
            long = "app-files",
            value_delimiter = ',',
            help = "Application file names to analyze (Name.java or Name.java:method1+method2)"
        )]
        app_files: Vec<String>,
        #[arg(long, short, default_value = "output", help = "Base output directory")]
        output: PathBuf,
        #[arg(long, help = "LLM provider (openai, ollama)")]
        provider: Option<String>,
        #[arg(long, help = "Default model")]
        model: Option<String>,
        #[arg(
            long = "max-depth",
            allow_hyphen_values = true,
            help = "Procedure dependency depth (-1 = unlimited)"
        )]
        max_depth: Option<i32>,
    },

    /// Generate a timeline report and summary table from a Unity scene
    Scene {
        #[arg(long, short, help = "Scene JSON file")]
        input: PathBuf,
        #[arg(long, short, help = "Output directory")]
        output: PathBuf,
        #[arg(long, help = "LLM provider (openai, ollama)")]
        provider: Option<String>,
        #[arg(long, help = "Default model")]
        model: Option<String>,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Show current configuration (merged from all sources)
    Show {
        #[arg(
            short = 'f',
            long,
            default_value = "text",
            help = "Output format: text, json, yaml"
        )]
        format: String,
    },
    /// Show configuration file paths
    Path,
    /// Write a default configuration file
    Init {
        #[arg(long, short, help = "Initialize global config")]
        global: bool,
        #[arg(long, help = "Overwrite existing config")]
        force: bool,
    },
}

fn setup_panic_handler() {
    let default_hook = std::panic::take_hook();

    std::panic::set_hook(Box::new(move |panic_info| {
        let message = if let Some(s) = panic_info.payload().downcast_ref::<&str>() {
            s.to_string()
        } else if let Some(s) = panic_info.payload().downcast_ref::<String>() {
            s.clone()
        } else {
            "Unknown panic".to_string()
        };

        eprintln!(
            "\n{} {}",
            style("procweave encountered an unexpected error:").red().bold(),
            message
        );
        if let Some(location) = panic_info.location() {
            eprintln!(
                "{}",
                style(format!(
                    "Location: {}:{}:{}",
                    location.file(),
                    location.line(),
                    location.column()
                ))
                .dim()
            );
        }

        default_hook(panic_info);
    }));
}

fn main() -> ExitCode {
    setup_panic_handler();

    match run_cli() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", style("Error:").red(), e);
            ExitCode::FAILURE
        }
    }
}

fn run_cli() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match cli.command {
        Commands::Analyze {
            tables,
            entry,
            procedures,
            app_dir,
            app_files,
            output,
            provider,
            model,
            max_depth,
        } => {
            commands::analyze::run(AnalyzeOptions {
                tables,
                entry,
                procedures,
                app_dir,
                app_files,
                output,
                overrides: ConfigOverrides {
                    provider,
                    model,
                    max_depth,
                },
            })?;
        }
        Commands::Scene {
            input,
            output,
            provider,
            model,
        } => {
            commands::scene::run(
                input,
                output,
                ConfigOverrides {
                    provider,
                    model,
                    max_depth: None,
                },
            )?;
        }
        Commands::Config { action } => match action {
            ConfigAction::Show { format } => commands::config::show(&format)?,
            ConfigAction::Path => commands::config::path()?,
            ConfigAction::Init { global, force } => commands::config::init(global, force)?,
        },
    }

    Ok(())
}
