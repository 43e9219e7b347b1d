use std::{fs, path::PathBuf};

use anyhow::Context;
use clap::Parser;

use crate::utils::{
    results_uploader::ResultHandler,
    run_id,
    stats::{extract_metrics, RunInfo},
    store::{CsvResultStore, ResultStore},
};

use super::StoreArgs;

/// Which stats export to read and which subnets to pick out of it.
#[derive(Parser, Debug, Clone)]
pub struct ExtractArgs {
    /// Client stats export written by the test
    #[arg(long)]
    stats_file: PathBuf,

    /// Client subnets to harvest (comma separated); every VLAN block when empty
    #[arg(long, value_delimiter = ',')]
    subnets: Vec<String>,
}

#[derive(Parser, Debug, Clone)]
pub struct HarvestArgs {
    #[command(flatten)]
    pub store: StoreArgs,

    #[command(flatten)]
    pub extract: ExtractArgs,
}

/// Extract metric records and push them to the store. Returns the test run id.
pub fn run(args: &mut HarvestArgs, handler: &dyn ResultHandler) -> anyhow::Result<String> {
    let stats = fs::read_to_string(&args.extract.stats_file)
        .with_context(|| format!("reading stats export '{}'", args.extract.stats_file.display()))?;

    let test_run_id = args.store.run_id.get_or_insert_with(run_id).clone();
    let info = RunInfo {
        test_run_id: test_run_id.clone(),
        test_name: args.store.test_name.clone(),
        timestamp: chrono::Local::now().naive_local(),
    };

    let records = extract_metrics(&stats, &args.extract.subnets, &info);
    info!(
        "harvest: subnets {:?}; {} VLAN records",
        args.extract.subnets,
        records.len()
    );

    if records.is_empty() {
        warn!(
            "harvest: no records in {}",
            args.extract.stats_file.display()
        );
    }

    let mut store = CsvResultStore::new(&args.store.store);
    store.connect()?;
    let pushed = store.push(&records);
    store.close()?;
    pushed?;

    info!("harvest: run {}; {} records stored", test_run_id, records.len());
    handler.handle_result(store.path());
    Ok(test_run_id)
}
