use std::{
    fmt,
    fs::OpenOptions,
    io::{BufWriter, Write},
    path::Path,
};

use anyhow::Context;
use serde::Serialize;

use super::stats::{MetricRecord, VlanTag};

pub const SUMMARY_HEADER: &str = "===== Avalanche goodput summary =====";
pub const SUMMARY_FOOTER: &str = "===== end of goodput summary =====";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Outcome {
    Pass,
    Fail,
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::Pass => write!(f, "PASS"),
            Outcome::Fail => write!(f, "FAIL"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    pub vlan_label: String,
    pub goodput_percent: Option<f64>,
    pub outcome: Outcome,
    pub diagnostic: Option<String>,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.goodput_percent {
            Some(pct) => write!(f, "VLAN {}: goodput {:.2}% {}", self.vlan_label, pct, self.outcome)?,
            None => write!(f, "VLAN {}: goodput n/a {}", self.vlan_label, self.outcome)?,
        }
        if let Some(diag) = &self.diagnostic {
            write!(f, " ({})", diag)?;
        }
        Ok(())
    }
}

/// Whether the summary replaces the previous one or is added after it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum SummaryMode {
    Overwrite,
    Append,
}

fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}

/// Inner tag 0 is how the export writes single-tagged VLANs.
pub fn vlan_label(vlan: VlanTag) -> String {
    match vlan.inner {
        None | Some(0) => vlan.outer.to_string(),
        Some(inner) => format!("{}/{}", vlan.outer, inner),
    }
}

/// Share of received bytes that was goodput, in percent rounded to 2 places.
///
/// Goodput is counted in bits. `None` when nothing was received.
pub fn goodput_percent(bytes_received: u64, goodput_cumulative_received: u64) -> Option<f64> {
    if bytes_received == 0 {
        return None;
    }
    Some(round2(
        goodput_cumulative_received as f64 / (bytes_received as f64 * 8.0) * 100.0,
    ))
}

/// Slack for the float error in `ratio * 100.0` (`0.07 * 100.0` is `7.000000000000001`).
const THRESHOLD_EPSILON: f64 = 1e-9;

pub fn classify(records: &[MetricRecord], min_goodput_ratio: f64) -> Vec<Verdict> {
    let threshold = min_goodput_ratio * 100.0 - THRESHOLD_EPSILON;

    records
        .iter()
        .map(|r| {
            let label = vlan_label(r.vlan());
            match goodput_percent(r.bytes_received, r.goodput_cumulative_received) {
                Some(pct) => Verdict {
                    vlan_label: label,
                    goodput_percent: Some(pct),
                    outcome: if pct >= threshold {
                        Outcome::Pass
                    } else {
                        Outcome::Fail
                    },
                    diagnostic: None,
                },
                None => {
                    warn!("goodput: VLAN {}; no bytes received", label);
                    Verdict {
                        vlan_label: label,
                        goodput_percent: None,
                        outcome: Outcome::Fail,
                        diagnostic: Some("no bytes received".into()),
                    }
                }
            }
        })
        .collect()
}

pub fn render_summary(verdicts: &[Verdict]) -> String {
    let mut out = String::new();
    out.push_str(SUMMARY_HEADER);
    out.push('\n');
    for v in verdicts {
        out.push_str(&v.to_string());
        out.push('\n');
    }
    out.push_str(SUMMARY_FOOTER);
    out.push('\n');
    out
}

pub fn write_summary(path: &Path, verdicts: &[Verdict], mode: SummaryMode) -> anyhow::Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .write(true)
        .append(mode == SummaryMode::Append)
        .truncate(mode == SummaryMode::Overwrite)
        .open(path)
        .with_context(|| format!("opening summary '{}'", path.display()))?;

    let mut out = BufWriter::new(file);
    out.write_all(render_summary(verdicts).as_bytes())?;
    out.flush()?;
    Ok(())
}
