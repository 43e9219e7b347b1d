use std::{
    path::Path,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::Duration,
};

use subprocess::{Exec, ExitStatus, Popen};

use crate::error::ProcessError;

/// A vendor test started in the Avalanche working directory.
pub struct RunningTest {
    popen: Popen,
    command: String,
}

impl RunningTest {
    /// Block until the test exits or Ctrl+C is pressed, then collect its status.
    pub fn wait(mut self) -> Result<(), ProcessError> {
        let stop = Arc::new(AtomicBool::new(false));
        if let Err(e) = signal_hook::flag::register(signal_hook::consts::SIGINT, Arc::clone(&stop)) {
            warn!("process: can't watch for Ctrl+C, {}", e);
        }

        loop {
            if stop.load(Ordering::Relaxed) {
                warn!("process: interrupted, stopping '{}'", self.command);
                break;
            }
            match self.popen.wait_timeout(Duration::from_millis(200)) {
                Ok(Some(_)) => break,
                Ok(None) => {}
                Err(e) => {
                    warn!("process: waiting for '{}' failed, {}", self.command, e);
                    break;
                }
            }
        }

        self.stop()
    }

    pub fn stop(mut self) -> Result<(), ProcessError> {
        let status = match self.popen.exit_status() {
            Some(st) => st,
            None => {
                _ = self.popen.terminate();
                self.popen
                    .wait_timeout(Duration::from_secs(5))
                    .transpose()
                    .unwrap_or_else(|| {
                        _ = self.popen.kill();
                        self.popen.wait()
                    })
                    .map_err(|e| ProcessError::Failed {
                        command: self.command.clone(),
                        status: e.to_string(),
                    })?
            }
        };

        check_status(&self.command, status)
    }
}

fn check_status(command: &str, status: ExitStatus) -> Result<(), ProcessError> {
    if status.success() {
        info!("process: '{}' finished", command);
        Ok(())
    } else {
        Err(ProcessError::Failed {
            command: command.to_owned(),
            status: format!("{:?}", status),
        })
    }
}

/// Launch `interpreter script` with `dir` as the working directory.
pub fn start_test_async(dir: &Path, interpreter: &str, script: &str) -> Result<RunningTest, ProcessError> {
    if !dir.is_dir() {
        warn!("process: unknown directory {}", dir.display());
        return Err(ProcessError::DirectoryNotFound(dir.to_path_buf()));
    }
    let script_path = dir.join(script);
    if !script_path.is_file() {
        warn!("process: {} does not exist", script_path.display());
        return Err(ProcessError::ScriptNotFound(script_path));
    }

    let command = format!("{} {}", interpreter, script);
    info!("process: starting '{}' in {}", command, dir.display());
    let popen = Exec::cmd(interpreter)
        .arg(script)
        .cwd(dir)
        .popen()
        .map_err(|e| ProcessError::ExecutableNotFound(interpreter.to_owned(), e.to_string()))?;

    Ok(RunningTest { popen, command })
}

pub fn run_test(dir: &Path, interpreter: &str, script: &str) -> Result<(), ProcessError> {
    start_test_async(dir, interpreter, script)?.wait()
}
