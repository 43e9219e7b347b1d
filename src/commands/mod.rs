pub mod configure;
pub mod start;

pub mod analyze;
pub mod harvest;


use std::path::PathBuf;

use clap::Parser;

use crate::utils::store::RecordQuery;

/// Where metric records are kept and which test run they belong to.
#[derive(Parser, Debug, Clone)]
pub struct StoreArgs {
    /// CSV file the metric records are appended to
    #[arg(long, default_value = "avalanche_metrics.csv")]
    store: PathBuf,

    /// Test run identifier, generated from the current time when harvesting
    #[arg(long)]
    run_id: Option<String>,

    #[arg(long, default_value_t = String::from("goodput"))]
    test_name: String,
}

impl StoreArgs {
    pub fn query(&self) -> RecordQuery {
        RecordQuery {
            test_run_id: self.run_id.clone(),
            test_name: Some(self.test_name.clone()),
        }
    }
}
