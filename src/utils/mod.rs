pub mod config_file;
pub mod directives;
pub mod external_prog;
pub mod goodput;
pub mod patch;
pub mod results_uploader;
pub mod stats;
pub mod store;

/// Identifier for a test run that didn't get one on the command line.
pub fn run_id() -> String {
    chrono::Local::now().format("%Y%m%d-%H%M%S").to_string()
}
