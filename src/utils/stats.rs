//! Harvesting of the per-VLAN client stats export.
//!
//! The export is one long comma-delimited text in which every subscriber VLAN
//! is introduced by a `VLAN outer[/inner]` tag. The text between two tags is
//! that VLAN's block, and the metrics sit at fixed column positions in it.

use std::fmt;

use chrono::NaiveDateTime;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ExtractionError;

/// Columns per record in the export layout the offsets below belong to.
pub const COLUMN_STRIDE: usize = 712;
pub const COLUMN_BASE: usize = COLUMN_STRIDE * 2;
pub const BYTES_RECEIVED_COLUMN: usize = COLUMN_BASE + 9;
pub const GOODPUT_CUMULATIVE_COLUMN: usize = COLUMN_BASE + 249;
pub const GOODPUT_AVERAGE_RATE_COLUMN: usize = COLUMN_BASE + 250;

const VLAN_ANCHOR: &str =
    r"(?i)\bVLAN\b[ \t]*[:=,]?[ \t]*\{?[ \t]*(?P<outer>\d+)(?:[ \t]*/[ \t]*(?P<inner>\d+))?[ \t]*\}?";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VlanTag {
    pub outer: u32,
    pub inner: Option<u32>,
}

impl fmt::Display for VlanTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner {
            Some(inner) => write!(f, "{}/{}", self.outer, inner),
            None => write!(f, "{}", self.outer),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawBlock {
    pub vlan: VlanTag,
    /// `None` when the block runs to the end of the document
    pub next: Option<VlanTag>,
    pub text: String,
}

#[derive(Debug)]
struct Anchor {
    vlan: VlanTag,
    start: usize,
    end: usize,
}

fn scan_anchors(stats: &str) -> Vec<Anchor> {
    let re = Regex::new(VLAN_ANCHOR).expect("VLAN anchor is a valid regex");

    let mut anchors = Vec::new();
    let mut offset = 0;
    for line in stats.split_inclusive('\n') {
        if let Some(caps) = re.captures(line) {
            let whole = caps.get(0).expect("group 0 always exists");
            // digits only, overflow is the only way to fail
            let outer: Option<u32> = caps["outer"].parse().ok();
            let inner: Option<Option<u32>> = caps.name("inner").map(|m| m.as_str().parse().ok());
            match (outer, inner) {
                (Some(outer), None) | (Some(outer), Some(Some(_))) => anchors.push(Anchor {
                    vlan: VlanTag {
                        outer,
                        inner: inner.flatten(),
                    },
                    start: offset + whole.start(),
                    end: offset + whole.end(),
                }),
                _ => warn!("stats: VLAN tag '{}' out of range, ignored", whole.as_str()),
            }
        }
        offset += line.len();
    }
    anchors
}

/// Slice `stats` into VLAN blocks and keep those mentioning `subnet_filter`.
///
/// Blocks are paired positionally, so repeated or unsorted VLAN numbers are
/// fine. A document without tags yields no blocks.
pub fn extract_blocks(stats: &str, subnet_filter: &str) -> Vec<RawBlock> {
    let anchors = scan_anchors(stats);
    debug!("stats: {} VLAN anchors found", anchors.len());

    anchors
        .iter()
        .enumerate()
        .map(|(i, a)| {
            let succ = anchors.get(i + 1);
            let end = succ.map_or(stats.len(), |s| s.start);
            RawBlock {
                vlan: a.vlan,
                next: succ.map(|s| s.vlan),
                text: stats[a.end..end].to_owned(),
            }
        })
        .filter(|b| b.text.contains(subnet_filter))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BlockMetrics {
    pub bytes_received: u64,
    pub goodput_cumulative_received: u64,
    pub goodput_average_rate: f64,
}

fn column<'a>(cols: &[&'a str], block: &RawBlock, idx: usize) -> Result<&'a str, ExtractionError> {
    cols.get(idx)
        .map(|c| c.trim().trim_matches('"'))
        .ok_or_else(|| ExtractionError::TooFewColumns {
            vlan: block.vlan.to_string(),
            found: cols.len(),
            needed: idx,
        })
}

fn not_a_number(block: &RawBlock, column: usize, value: &str) -> ExtractionError {
    ExtractionError::NotANumber {
        vlan: block.vlan.to_string(),
        column,
        value: value.to_owned(),
    }
}

/// Counters are sometimes exported as `1234.0`.
fn parse_count(block: &RawBlock, column: usize, value: &str) -> Result<u64, ExtractionError> {
    if let Ok(v) = value.parse::<u64>() {
        return Ok(v);
    }
    match value.parse::<f64>() {
        Ok(v) if v >= 0.0 && v.fract() == 0.0 && v <= u64::MAX as f64 => Ok(v as u64),
        _ => Err(not_a_number(block, column, value)),
    }
}

pub fn parse_block(block: &RawBlock) -> Result<BlockMetrics, ExtractionError> {
    let cols: Vec<&str> = block.text.split(',').collect();

    let bytes = column(&cols, block, BYTES_RECEIVED_COLUMN)?;
    let cumulative = column(&cols, block, GOODPUT_CUMULATIVE_COLUMN)?;
    let rate = column(&cols, block, GOODPUT_AVERAGE_RATE_COLUMN)?;

    Ok(BlockMetrics {
        bytes_received: parse_count(block, BYTES_RECEIVED_COLUMN, bytes)?,
        goodput_cumulative_received: parse_count(block, GOODPUT_CUMULATIVE_COLUMN, cumulative)?,
        goodput_average_rate: rate
            .parse()
            .map_err(|_| not_a_number(block, GOODPUT_AVERAGE_RATE_COLUMN, rate))?,
    })
}

/// Where the subscribers of a subnet hang off the OLT.
///
/// Parsed from subnet names like `OctalOLT_Node1_Slot3_Pon2_Port5`; parts that
/// are absent stay empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Location {
    pub slot: Option<u32>,
    pub pon: Option<u32>,
    pub port: Option<u32>,
}

impl Location {
    pub fn from_subnet(name: &str) -> Self {
        let part = |key: &str| {
            Regex::new(&format!(r"(?i){}(\d+)", key))
                .expect("location patterns are valid regexes")
                .captures(name)
                .and_then(|c| c[1].parse::<u32>().ok())
        };
        Self {
            slot: part("slot"),
            pon: part("pon"),
            port: part("port"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct RunInfo {
    pub test_run_id: String,
    pub test_name: String,
    pub timestamp: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    pub test_run_id: String,
    pub test_name: String,
    pub outer_vlan: u32,
    pub inner_vlan: Option<u32>,
    pub slot: Option<u32>,
    pub pon: Option<u32>,
    pub port: Option<u32>,
    pub bytes_received: u64,
    pub goodput_cumulative_received: u64,
    pub goodput_average_rate: f64,
    pub timestamp: NaiveDateTime,
}

impl MetricRecord {
    pub fn vlan(&self) -> VlanTag {
        VlanTag {
            outer: self.outer_vlan,
            inner: self.inner_vlan,
        }
    }
}

/// Column of the block naming the client subnet it belongs to: the first
/// non-empty one containing `filter`.
fn subnet_field<'a>(block: &'a RawBlock, filter: &str) -> Option<&'a str> {
    block
        .text
        .split(',')
        .map(|c| c.trim().trim_matches('"'))
        .find(|c| !c.is_empty() && c.contains(filter))
}

/// Extract one record per VLAN block mentioning any of `subnets`, or per
/// block when `subnets` is empty.
///
/// A block is claimed by the first subnet in `subnets` it mentions, so names
/// that contain each other (`Slot1`, `Slot10`) never yield the same VLAN twice.
/// Slot, PON and port come from the block's own subnet column. Malformed
/// blocks are skipped with a warning, they don't fail the run.
pub fn extract_metrics(stats: &str, subnets: &[String], run: &RunInfo) -> Vec<MetricRecord> {
    let mut records = Vec::new();
    for block in extract_blocks(stats, "") {
        let claimed = if subnets.is_empty() {
            Some("")
        } else {
            subnets
                .iter()
                .map(String::as_str)
                .find(|s| block.text.contains(s))
        };
        let Some(filter) = claimed else {
            continue;
        };

        let m = match parse_block(&block) {
            Ok(m) => m,
            Err(e) => {
                warn!("stats: skipped block; {}", e);
                continue;
            }
        };
        if block.next.is_none() {
            debug!("stats: VLAN {} block runs to end of export", block.vlan);
        }
        let location = subnet_field(&block, filter)
            .map(Location::from_subnet)
            .unwrap_or_default();
        debug!(
            "stats: VLAN {} claimed by subnet '{}', {:?}",
            block.vlan, filter, location
        );

        records.push(MetricRecord {
            test_run_id: run.test_run_id.clone(),
            test_name: run.test_name.clone(),
            outer_vlan: block.vlan.outer,
            inner_vlan: block.vlan.inner,
            slot: location.slot,
            pon: location.pon,
            port: location.port,
            bytes_received: m.bytes_received,
            goodput_cumulative_received: m.goodput_cumulative_received,
            goodput_average_rate: m.goodput_average_rate,
            timestamp: run.timestamp,
        });
    }
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn tag(outer: u32, inner: Option<u32>) -> VlanTag {
        VlanTag { outer, inner }
    }

    /// A block body with the metric columns filled in.
    fn block_body(subnet: &str, bytes: &str, cumulative: &str, rate: &str) -> String {
        let mut cols = vec!["0".to_owned(); GOODPUT_AVERAGE_RATE_COLUMN + 3];
        cols[0] = subnet.to_owned();
        cols[BYTES_RECEIVED_COLUMN] = bytes.to_owned();
        cols[GOODPUT_CUMULATIVE_COLUMN] = cumulative.to_owned();
        cols[GOODPUT_AVERAGE_RATE_COLUMN] = rate.to_owned();
        format!("\n{}\n", cols.join(","))
    }

    fn run() -> RunInfo {
        RunInfo {
            test_run_id: "run-1".into(),
            test_name: "goodput".into(),
            timestamp: NaiveDateTime::parse_from_str("2016-05-04 10:00:00", "%Y-%m-%d %H:%M:%S")
                .unwrap(),
        }
    }

    #[test]
    fn test_pairs_follow_file_order() {
        let doc = "head\nVLAN 10\na,b\nVLAN 20\nc,d\nVLAN 30\ne,f\n";
        let blocks = extract_blocks(doc, "");
        let pairs: Vec<_> = blocks.iter().map(|b| (b.vlan, b.next)).collect();
        assert_eq!(
            pairs,
            vec![
                (tag(10, None), Some(tag(20, None))),
                (tag(20, None), Some(tag(30, None))),
                (tag(30, None), None),
            ]
        );
        assert_eq!(blocks[0].text, "\na,b\n");
        assert_eq!(blocks[2].text, "\ne,f\n");
    }

    #[test]
    fn test_no_anchors() {
        assert!(extract_blocks("a,b,c\nd,e,f\n", "").is_empty());
    }

    #[test]
    fn test_inner_tag_and_duplicates() {
        let doc = "Vlan: {100/200},x\nVLAN 100/200,y\nvlan=7,z";
        let blocks = extract_blocks(doc, "");
        assert_eq!(blocks.len(), 3);
        assert_eq!(blocks[0].vlan, tag(100, Some(200)));
        assert_eq!(blocks[1].vlan, tag(100, Some(200)));
        assert_eq!(blocks[1].text, ",y\n");
        assert_eq!(blocks[2].vlan, tag(7, None));
        assert_eq!(blocks[2].text, ",z");
    }

    #[test]
    fn test_subnet_filter() {
        let doc = "VLAN 10\nSlot3,1\nVLAN 20\nSlot4,2\n";
        let blocks = extract_blocks(doc, "Slot4");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].vlan, tag(20, None));
    }

    #[test]
    fn test_parse_block_columns() {
        let block = RawBlock {
            vlan: tag(10, None),
            next: None,
            text: block_body("Slot3", "1000", "7200.0", "12.5"),
        };
        assert_eq!(
            parse_block(&block).unwrap(),
            BlockMetrics {
                bytes_received: 1000,
                goodput_cumulative_received: 7200,
                goodput_average_rate: 12.5,
            }
        );
    }

    #[test]
    fn test_short_block_is_error() {
        let block = RawBlock {
            vlan: tag(10, Some(2)),
            next: None,
            text: "a,b,c".into(),
        };
        assert_eq!(
            parse_block(&block).unwrap_err(),
            ExtractionError::TooFewColumns {
                vlan: "10/2".into(),
                found: 3,
                needed: BYTES_RECEIVED_COLUMN,
            }
        );
    }

    #[test]
    fn test_extract_skips_malformed_blocks() {
        let doc = format!(
            "VLAN 10/1{}VLAN 20/1\nOctalOLT_Node1_Slot3_Pon2,short\nVLAN 30{}",
            block_body("OctalOLT_Node1_Slot3_Pon2", "1000", "7200", "1.5"),
            block_body("OctalOLT_Node1_Slot3_Pon2", "n/a", "0", "0"),
        );
        let records = extract_metrics(&doc, &["Slot3".to_owned()], &run());
        assert_eq!(records.len(), 1);

        let r = &records[0];
        assert_eq!(r.vlan(), tag(10, Some(1)));
        assert_eq!((r.slot, r.pon, r.port), (Some(3), Some(2), None));
        assert_eq!(r.bytes_received, 1000);
        assert_eq!(r.goodput_cumulative_received, 7200);
        assert_eq!(r.test_run_id, "run-1");
    }

    #[test]
    fn test_overlapping_subnets_claim_block_once() {
        let doc = format!(
            "VLAN 10{}VLAN 20{}",
            block_body("Node1_Slot1_Slot10", "1000", "7200", "1"),
            block_body("Node1_Slot10_Pon4", "1000", "4000", "1"),
        );
        let subnets = ["Slot1".to_owned(), "Slot10".to_owned()];
        let records = extract_metrics(&doc, &subnets, &run());

        let found: Vec<_> = records.iter().map(|r| (r.outer_vlan, r.slot, r.pon)).collect();
        assert_eq!(found, vec![(10, Some(1), None), (20, Some(10), Some(4))]);
    }

    #[test]
    fn test_location_without_filter() {
        let doc = format!(
            "VLAN 7{}",
            block_body("OctalOLT_Slot2_Pon5_Port1", "1000", "7200", "1")
        );
        let records = extract_metrics(&doc, &[], &run());
        assert_eq!(records.len(), 1);
        assert_eq!(
            (records[0].slot, records[0].pon, records[0].port),
            (Some(2), Some(5), Some(1))
        );
    }

    #[test]
    fn test_location_from_subnet() {
        assert_eq!(
            Location::from_subnet("OctalOLT_Node1_Slot3_Pon2_Port5"),
            Location {
                slot: Some(3),
                pon: Some(2),
                port: Some(5)
            }
        );
        assert_eq!(Location::from_subnet("Node1"), Location::default());
    }
}
