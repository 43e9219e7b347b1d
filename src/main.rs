#[macro_use]
extern crate log;

use std::path::PathBuf;

use clap::Parser;
use log::Level;

use commands::{
    analyze::AnalyzeArgs, configure::ConfigureArgs, harvest::HarvestArgs, run_test::RunTestArgs,
    start::StartArgs,
};
use context::{AvalancheContext, DEFAULT_AVALANCHE_PATH, DEFAULT_CONFIG_FILE};
use utils::results_uploader::result_handler;

mod commands;
mod context;
mod error;
mod utils;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Avalanche working directory holding the test files
    #[arg(long, global = true, default_value = DEFAULT_AVALANCHE_PATH)]
    avalanche_path: PathBuf,

    /// Name of the test configuration file inside a test directory
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    config_file: String,

    /// error, warn, info, debug or trace
    #[arg(long, global = true, default_value_t = String::from("info"))]
    log_level: String,

    /// Upload produced artifacts here (curl -T)
    #[clap(long, global = true)]
    push_results_url: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Patch the Avalanche test configuration
    ///
    /// Port reservation, license, output directory, trial mode, client
    /// associations and load phase durations. Every change is made in memory
    /// and the config file is replaced in one step.
    Configure(ConfigureArgs),

    /// Run the Avalanche test (`tclsh test.tcl`) in the Avalanche directory
    Start(StartArgs),

    /// Extract per-VLAN goodput counters from a client stats export
    ///
    /// Records are appended to the metric store under a test run id.
    Harvest(HarvestArgs),

    /// Judge stored goodput against a threshold and write a summary
    Analyze(AnalyzeArgs),

    /// Configure, start, harvest and analyze in one go
    Run(RunTestArgs),
}

fn main() -> anyhow::Result<()> {
    // parse command line arguments
    let args = Args::parse();

    // init logging
    let level: Level = args
        .log_level
        .parse()
        .map_err(|_| anyhow::anyhow!("unknown log level '{}'", args.log_level))?;
    simple_logger::init_with_level(level).map_err(|e| anyhow::anyhow!("{}", e))?;

    let ctx = AvalancheContext::new(args.avalanche_path, args.config_file);
    let handler = result_handler(args.push_results_url);

    match args.command {
        Commands::Configure(a) => commands::configure::run(&a, &ctx)?,
        Commands::Start(a) => commands::start::run(&a, &ctx)?,
        Commands::Harvest(mut a) => {
            commands::harvest::run(&mut a, handler.as_ref())?;
        }
        Commands::Analyze(a) => {
            commands::analyze::run(&a, handler.as_ref())?;
        }
        Commands::Run(a) => commands::run_test::run(a, &ctx, handler.as_ref())?,
    };

    Ok(())
}
