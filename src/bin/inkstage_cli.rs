//! Inkstage CLI
//!
//! Commands: plan, render
//! Outputs JSON to stdout, logs to stderr
//! Returns 1 on bad input, 2 on render failure

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use inkstage_core::{LayerDocument, RenderConfig, RenderPipeline};

#[derive(Parser)]
#[command(name = "inkstage-cli")]
#[command(about = "Inkstage CLI - declarative image layers")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// JSON render config
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Directory for staged intermediates
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Leave intermediate files on disk
    #[arg(long)]
    keep_intermediates: bool,

    /// Kill a tool that runs longer than this
    #[arg(long)]
    timeout_secs: Option<u64>,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the consolidated plan for a layer document
    Plan {
        #[arg(short, long)]
        document: PathBuf,
    },

    /// Render a layer document
    Render {
        #[arg(short, long)]
        document: PathBuf,

        /// Destination of the final artifact
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => match RenderConfig::load(path) {
            Ok(c) => c,
            Err(e) => {
                println!("{}", serde_json::json!({"success": false, "error": e.to_string()}));
                return ExitCode::FAILURE;
            }
        },
        None => RenderConfig::default(),
    };
    if let Some(dir) = cli.output_dir {
        config.output_dir = dir;
    }
    if cli.keep_intermediates {
        config.keep_intermediates = true;
    }
    if cli.timeout_secs.is_some() {
        config.timeout_secs = cli.timeout_secs;
    }

    let pipeline = RenderPipeline::from_config(config);

    match cli.command {
        Commands::Plan { document } => {
            let layer = match LayerDocument::load_layer(&document) {
                Ok(l) => l,
                Err(e) => {
                    println!("{}", serde_json::json!({"success": false, "error": e.to_string()}));
                    return ExitCode::FAILURE;
                }
            };

            match pipeline.plan_layer(&layer) {
                Ok(plan) => {
                    let output = serde_json::json!({"success": true, "plan": plan});
                    println!("{}", serde_json::to_string_pretty(&output).unwrap_or_default());
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    println!("{}", serde_json::json!({"success": false, "error": e.to_string()}));
                    ExitCode::FAILURE
                }
            }
        }

        Commands::Render { document, output } => {
            let layer = match LayerDocument::load_layer(&document) {
                Ok(l) => l,
                Err(e) => {
                    println!("{}", serde_json::json!({"success": false, "error": e.to_string()}));
                    return ExitCode::FAILURE;
                }
            };

            match pipeline.render_with_report(&layer, &output) {
                Ok(report) => {
                    let output = serde_json::json!({"success": true, "report": report});
                    println!("{}", serde_json::to_string_pretty(&output).unwrap_or_default());
                    ExitCode::SUCCESS
                }
                Err(e) => {
                    println!("{}", serde_json::json!({"success": false, "error": e.to_string()}));
                    ExitCode::from(2)
                }
            }
        }
    }
}
