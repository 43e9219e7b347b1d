use std::path::Path;

use subprocess::Exec;

/// What happens to artifacts (metric store, summary) once a step produced them.
pub trait ResultHandler {
    fn handle_result(&self, path: &Path);
}

/// Upload to `url` when one is given, otherwise keep artifacts local.
pub fn result_handler(url: Option<String>) -> Box<dyn ResultHandler> {
    match url {
        Some(url) => Box::new(ResultsUploader::new(url)),
        None => Box::new(ResultIgnorer {}),
    }
}

pub struct ResultIgnorer {}

impl ResultHandler for ResultIgnorer {
    fn handle_result(&self, path: &Path) {
        debug!("publish: {} kept local", path.display());
    }
}

pub struct ResultsUploader {
    push_url: String,
}

impl ResultsUploader {
    pub fn new(url: String) -> Self {
        Self { push_url: url }
    }
}

impl ResultHandler for ResultsUploader {
    fn handle_result(&self, file: &Path) {
        if !file.exists() {
            error!("publish: {} does not exist, not uploading", file.display());
            return;
        }

        let res = Exec::cmd("curl")
            .arg("--fail")
            .arg("--silent")
            .arg("--show-error")
            .arg("-T")
            .arg(file.as_os_str())
            .arg(&self.push_url)
            .join();

        match res {
            Ok(exit) if exit.success() => {
                info!("publish: {} uploaded to {}", file.display(), self.push_url)
            }
            Ok(exit) => error!(
                "publish: upload of {} failed, curl exit {:?}",
                file.display(),
                exit
            ),
            Err(err) => error!("publish: can't run curl for {}, {}", file.display(), err),
        };
    }
}
