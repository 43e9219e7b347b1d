use std::path::{Path, PathBuf};

pub const DEFAULT_AVALANCHE_PATH: &str = "C:\\AvalancheExeDir";
pub const DEFAULT_CONFIG_FILE: &str = "config.tcl";

/// Where the Avalanche installation and its test files live.
#[derive(Debug, Clone)]
pub struct AvalancheContext {
    pub avalanche_path: PathBuf,
    pub config_file: String,
}

impl AvalancheContext {
    pub fn new(avalanche_path: impl Into<PathBuf>, config_file: impl Into<String>) -> Self {
        Self {
            avalanche_path: avalanche_path.into(),
            config_file: config_file.into(),
        }
    }

    pub fn config_path(&self) -> PathBuf {
        self.config_path_in(&self.avalanche_path)
    }

    pub fn config_path_in(&self, dir: &Path) -> PathBuf {
        dir.join(&self.config_file)
    }

    /// OutputDir used when none is given; Avalanche wants forward slashes.
    pub fn default_output_dir(&self) -> String {
        self.avalanche_path.to_string_lossy().replace('\\', "/")
    }
}

impl Default for AvalancheContext {
    fn default() -> Self {
        Self::new(DEFAULT_AVALANCHE_PATH, DEFAULT_CONFIG_FILE)
    }
}
