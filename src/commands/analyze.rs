use std::path::PathBuf;

use clap::Parser;

use crate::utils::{
    goodput::{classify, write_summary, Outcome, SummaryMode, Verdict},
    results_uploader::ResultHandler,
    store::{CsvResultStore, ResultStore},
};

use super::StoreArgs;

#[derive(Parser, Debug, Clone)]
pub struct VerdictArgs {
    /// Minimum goodput / received bits ratio for a VLAN to pass
    #[arg(long, default_value_t = 0.85)]
    min_goodput_ratio: f64,

    /// Summary file
    #[arg(long, default_value = "goodput_summary.txt")]
    summary: PathBuf,

    #[arg(long, value_enum, default_value_t = SummaryMode::Overwrite)]
    summary_mode: SummaryMode,

    /// Also print the verdicts to stdout as JSON lines
    #[arg(long, action)]
    json: bool,
}

#[derive(Parser, Debug, Clone)]
pub struct AnalyzeArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[command(flatten)]
    pub verdict: VerdictArgs,
}

pub fn run(args: &AnalyzeArgs, handler: &dyn ResultHandler) -> anyhow::Result<Vec<Verdict>> {
    let mut store = CsvResultStore::new(&args.store.store);
    store.connect()?;
    let pulled = store.pull(&args.store.query());
    store.close()?;
    let (count, records) = pulled?;

    if count == 0 {
        warn!("analyze: no records match {:?}", args.store.query());
    }

    let verdicts = classify(&records, args.verdict.min_goodput_ratio);
    for v in &verdicts {
        match v.outcome {
            Outcome::Pass => info!("analyze: {}", v),
            Outcome::Fail => warn!("analyze: {}", v),
        }
        if args.verdict.json {
            println!("{}", serde_json::to_string(v)?);
        }
    }

    write_summary(&args.verdict.summary, &verdicts, args.verdict.summary_mode)?;
    let failed = verdicts.iter().filter(|v| v.outcome == Outcome::Fail).count();
    info!(
        "analyze: {} VLANs, {} failed; summary in {}",
        verdicts.len(),
        failed,
        args.verdict.summary.display()
    );

    handler.handle_result(&args.verdict.summary);
    Ok(verdicts)
}
