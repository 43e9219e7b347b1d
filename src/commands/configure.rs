use std::path::PathBuf;

use clap::Parser;

use crate::{
    context::AvalancheContext,
    utils::{
        config_file::ConfigFile,
        directives::{Associations, ConfigPlan, Runtime, LAYOUT_VERSION},
    },
};

#[derive(Parser, Debug, Clone, Default)]
pub struct ConfigureArgs {
    /// Test directories to patch, each holding its own config file.
    /// Defaults to the Avalanche path.
    #[arg(long = "test-dir")]
    test_dirs: Vec<PathBuf>,

    /// Force reserve the test ports (ReserveForce 1/0)
    #[arg(long)]
    reserve_ports: Option<bool>,

    /// License file to use
    #[arg(long)]
    license: Option<String>,

    /// Results output directory
    #[arg(long, conflicts_with = "default_output_dir")]
    output_dir: Option<String>,

    /// Point the results output directory at the Avalanche path
    #[arg(long, action)]
    default_output_dir: bool,

    /// Run the test in trial mode
    #[arg(long)]
    trial: Option<bool>,

    /// `all`, or comma separated client subnets to leave enabled
    #[arg(long, value_delimiter = ',')]
    associations: Vec<String>,

    /// Ramp up phase duration
    #[arg(long)]
    ramp_up_sec: Option<u64>,

    /// Steady state (soak) phase duration
    #[arg(long)]
    steady_sec: Option<u64>,

    /// Ramp down phase duration
    #[arg(long)]
    ramp_down_sec: Option<u64>,

    /// Limit the phase durations to these load profiles (comma separated)
    #[arg(long, value_delimiter = ',')]
    load_profiles: Vec<String>,
}

impl ConfigureArgs {
    pub fn plan(&self, ctx: &AvalancheContext) -> ConfigPlan {
        let associations = match self.associations.as_slice() {
            [] => None,
            [all] if all.eq_ignore_ascii_case("all") => Some(Associations::All),
            subnets => Some(Associations::Only(subnets.to_vec())),
        };
        let output_dir = if self.default_output_dir {
            Some(ctx.default_output_dir())
        } else {
            self.output_dir.clone()
        };

        ConfigPlan {
            reserve_ports: self.reserve_ports,
            license: self.license.clone(),
            output_dir,
            trial_mode: self.trial,
            associations,
            runtime: Runtime {
                ramp_up: self.ramp_up_sec,
                steady: self.steady_sec,
                ramp_down: self.ramp_down_sec,
                profiles: self.load_profiles.clone(),
            },
        }
    }
}

/// Patch every selected config file. One broken file doesn't stop the others.
pub fn run(args: &ConfigureArgs, ctx: &AvalancheContext) -> anyhow::Result<()> {
    let plan = args.plan(ctx);
    if plan.is_empty() {
        warn!("configure: nothing to change");
        return Ok(());
    }
    let directives = plan.directives();
    debug!("configure: {} directives for layout {}", directives.len(), LAYOUT_VERSION);

    let paths: Vec<_> = if args.test_dirs.is_empty() {
        vec![ctx.config_path()]
    } else {
        args.test_dirs.iter().map(|d| ctx.config_path_in(d)).collect()
    };

    let mut failed = 0;
    for path in &paths {
        let file = ConfigFile::new(path);
        match file.patch(&directives) {
            Ok(report) => info!(
                "configure: {}; {} directives, {} lines changed",
                file.path().display(),
                report.applied.len(),
                report.total_matches()
            ),
            Err(e) => {
                error!("configure: {}; left unchanged, {:#}", file.path().display(), e);
                failed += 1;
            }
        }
    }

    if failed > 0 {
        anyhow::bail!("{} of {} config files could not be patched", failed, paths.len());
    }
    Ok(())
}
