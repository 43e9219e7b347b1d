use std::{
    fs,
    io::{ErrorKind, Write},
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;

use crate::error::ConfigAccessError;

use super::patch::{apply_directive, Directive};

/// A line-oriented config document on disk.
///
/// Lines keep their terminators so that a rewrite reproduces every untouched
/// byte, including CRLF endings written by the Windows tooling.
pub struct ConfigFile {
    path: PathBuf,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct PatchReport {
    /// (directive name, anchors matched) in application order
    pub applied: Vec<(String, usize)>,
}

impl PatchReport {
    pub fn total_matches(&self) -> usize {
        self.applied.iter().map(|(_, m)| m).sum()
    }
}

impl ConfigFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn read_lines(&self) -> Result<Vec<String>, ConfigAccessError> {
        let content = fs::read_to_string(&self.path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => ConfigAccessError::Missing(self.path.clone()),
            _ => ConfigAccessError::Read {
                path: self.path.clone(),
                source: e,
            },
        })?;

        Ok(split_lines(&content))
    }

    /// Replace the file with `lines`, atomically.
    ///
    /// The replacement is written to a temporary file in the same directory and
    /// renamed over the original only once fully written. The temporary file is
    /// removed on every failure path.
    pub fn rewrite(&self, lines: &[String]) -> Result<(), ConfigAccessError> {
        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p,
            _ => Path::new("."),
        };
        let write_err = |source| ConfigAccessError::Write {
            path: self.path.clone(),
            source,
        };

        let mut tmp = NamedTempFile::new_in(dir).map_err(write_err)?;
        // temp files are created owner-only, keep the mode the config had
        if let Ok(meta) = fs::metadata(&self.path) {
            tmp.as_file()
                .set_permissions(meta.permissions())
                .map_err(write_err)?;
        }
        for line in lines {
            tmp.write_all(line.as_bytes()).map_err(write_err)?;
        }
        tmp.as_file().sync_all().map_err(write_err)?;

        tmp.persist(&self.path)
            .map_err(|e| ConfigAccessError::Replace {
                path: self.path.clone(),
                source: e.error,
            })?;
        Ok(())
    }

    /// Apply `directives` in order to one in-memory copy and write it back once.
    ///
    /// A failing directive aborts the whole batch and leaves the file as it was.
    /// Nothing is written when no directive matched.
    pub fn patch(&self, directives: &[Directive]) -> anyhow::Result<PatchReport> {
        let mut lines = self.read_lines()?;
        let mut report = PatchReport::default();

        for directive in directives {
            let outcome = apply_directive(&lines, directive)?;
            if outcome.matches == 0 {
                info!(
                    "config: {}; directive: {}; no anchor found",
                    self.path.display(),
                    directive.name()
                );
            } else {
                info!(
                    "config: {}; directive: {}; matches: {}",
                    self.path.display(),
                    directive.name(),
                    outcome.matches
                );
            }
            report
                .applied
                .push((directive.name().to_owned(), outcome.matches));
            lines = outcome.lines;
        }

        if report.total_matches() > 0 {
            self.rewrite(&lines)?;
        }
        Ok(report)
    }
}

pub fn split_lines(content: &str) -> Vec<String> {
    content.split_inclusive('\n').map(String::from).collect()
}
