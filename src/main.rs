use clap::Parser;
use std::path::PathBuf;
use tracing::error;

mod config;
mod constants;
mod error;
mod logging;
mod pipeline;
mod run_context;
mod store;
mod table;

use crate::config::Settings;
use crate::pipeline::{StageArgs, StageReport, StageState};
use crate::run_context::{RunContext, RunState};

#[derive(Parser)]
#[command(name = "listings_cleaner")]
#[command(about = "Fetch a raw listings artifact, clean it, and publish the result")]
#[command(version = "0.1.0")]
struct Cli {
    /// Input artifact reference, name[:version|:alias]
    #[arg(long = "input_artifact")]
    input_artifact: String,

    /// Name to register the cleaned artifact under
    #[arg(long = "output_artifact")]
    output_artifact: String,

    /// Classification tag for the new artifact
    #[arg(long = "output_type")]
    output_type: String,

    /// Free-text description of the new artifact
    #[arg(long = "output_description")]
    output_description: String,

    /// Lower inclusive price bound
    #[arg(long = "min_price")]
    min_price: f64,

    /// Upper inclusive price bound
    #[arg(long = "max_price")]
    max_price: f64,

    /// Filesystem store root (overrides config and environment)
    #[arg(long)]
    store_root: Option<PathBuf>,

    /// Run log directory (overrides config and environment)
    #[arg(long)]
    runs_dir: Option<PathBuf>,
}

async fn run(cli: Cli) -> anyhow::Result<StageReport> {
    let mut settings = Settings::load()?;
    if let Some(root) = cli.store_root {
        settings.store_root = root;
    }
    if let Some(dir) = cli.runs_dir {
        settings.runs_dir = dir;
    }

    let store = settings.make_store();
    let mut ctx = RunContext::open(constants::JOB_TYPE, &settings.runs_dir)?;
    let args = StageArgs {
        input_artifact: cli.input_artifact,
        output_artifact: cli.output_artifact,
        output_type: cli.output_type,
        output_description: cli.output_description,
        min_price: cli.min_price,
        max_price: cli.max_price,
    };

    match pipeline::run_stage(store.as_ref(), &mut ctx, &args).await {
        Ok(report) => {
            ctx.finish(RunState::Finished)?;
            Ok(report)
        }
        Err(e) => {
            let _ = ctx.finish(RunState::Failed);
            Err(e.into())
        }
    }
}

#[tokio::main]
async fn main() {
    dotenv::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(report) => {
            println!("\n📊 Cleaning stage results:");
            println!("   Input:  {}:v{}", report.input.name, report.input.version);
            println!("   Output: {}:v{}", report.output.name, report.output.version);
            println!("   Rows:   {} in, {} out", report.rows_in, report.rows_out);
            println!("   Took:   {:.3}s", report.elapsed_secs);
        }
        Err(e) => {
            error!("Stage state: {}", StageState::Failed);
            error!("Cleaning stage failed: {:#}", e);
            eprintln!("❌ Cleaning stage failed: {:#}", e);
            std::process::exit(1);
        }
    }
}
