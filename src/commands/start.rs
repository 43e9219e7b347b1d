use clap::Parser;

use crate::{context::AvalancheContext, utils::external_prog::run_test};

#[derive(Parser, Debug, Clone)]
pub struct StartArgs {
    /// Interpreter running the test script
    #[arg(long, default_value_t = String::from("tclsh"))]
    interpreter: String,

    /// Test script inside the Avalanche path
    #[arg(long, default_value_t = String::from("test.tcl"))]
    script: String,
}

pub fn run(args: &StartArgs, ctx: &AvalancheContext) -> anyhow::Result<()> {
    info!("start: running Avalanche test in {}", ctx.avalanche_path.display());
    run_test(&ctx.avalanche_path, &args.interpreter, &args.script)?;
    Ok(())
}
