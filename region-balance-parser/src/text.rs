//! The plain textual snapshot format:
//!
//! ```text
//! <num_stores>
//! <store_id>
//! <num_regions>
//! <region_id>
//! <load_vector_literal>
//! ...
//! ```
//!
//! where a load vector literal is a bracketed, comma-separated list of floats,
//! e.g. `[12.5, 340.0]`.

use regex::Regex;
use std::sync::OnceLock;

use crate::error::ParseError;
use crate::ir::{RegionIr, SnapshotIr, StoreIr};

fn load_vector_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\[\s*([^\[\]]*)\]\s*$").expect("static regex is valid"))
}

fn parse_count(lines: &mut std::str::Lines, line_no: &mut usize, expected: &'static str) -> Result<usize, ParseError> {
    let raw = lines
        .next()
        .ok_or(ParseError::UnexpectedEof { expected })?;
    *line_no += 1;
    raw.trim()
        .parse::<usize>()
        .map_err(|_| ParseError::BadCount {
            line: *line_no,
            expected,
            found: raw.to_string(),
        })
}

fn parse_line(lines: &mut std::str::Lines, line_no: &mut usize, expected: &'static str) -> Result<String, ParseError> {
    let raw = lines
        .next()
        .ok_or(ParseError::UnexpectedEof { expected })?;
    *line_no += 1;
    Ok(raw.trim().to_string())
}

fn parse_load_vector(raw: &str, line_no: usize) -> Result<Vec<f64>, ParseError> {
    let captures = load_vector_re()
        .captures(raw.trim())
        .ok_or_else(|| ParseError::BadLoadVector {
            line: line_no,
            found: raw.to_string(),
        })?;
    let inner = captures.get(1).map(|m| m.as_str()).unwrap_or("");
    if inner.trim().is_empty() {
        return Ok(Vec::new());
    }
    inner
        .split(',')
        .map(|piece| {
            piece
                .trim()
                .parse::<f64>()
                .map_err(|_| ParseError::BadLoadVector {
                    line: line_no,
                    found: raw.to_string(),
                })
        })
        .collect()
}

/// Parse a snapshot dump previously produced by [`format_snapshot`].
pub fn parse_snapshot(text: &str) -> Result<SnapshotIr, ParseError> {
    let mut lines = text.lines();
    let mut line_no = 0usize;

    let num_stores = parse_count(&mut lines, &mut line_no, "store count")?;
    let mut stores = Vec::with_capacity(num_stores);
    for _ in 0..num_stores {
        let id = parse_line(&mut lines, &mut line_no, "store id")?;
        let num_regions = parse_count(&mut lines, &mut line_no, "region count")?;
        let mut regions = Vec::with_capacity(num_regions);
        for _ in 0..num_regions {
            let region_id = parse_line(&mut lines, &mut line_no, "region id")?;
            let raw_vals = parse_line(&mut lines, &mut line_no, "load vector")?;
            let vals = parse_load_vector(&raw_vals, line_no)?;
            regions.push(RegionIr::new(region_id, vals));
        }
        stores.push(StoreIr::new(id, Some(regions)));
    }
    Ok(SnapshotIr::new(stores))
}

/// Serialize a snapshot to the textual dump format.
pub fn format_snapshot(snapshot: &SnapshotIr) -> String {
    let mut out = String::new();
    out.push_str(&format!("{}\n", snapshot.stores.len()));
    for store in &snapshot.stores {
        out.push_str(&format!("{}\n", store.id));
        out.push_str(&format!("{}\n", store.regions.len()));
        for region in &store.regions {
            out.push_str(&format!("{}\n", region.id));
            let vals: Vec<String> = region.vals.iter().map(|v| v.to_string()).collect();
            out.push_str(&format!("[{}]\n", vals.join(", ")));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trips_a_snapshot() {
        let snapshot = SnapshotIr::new(vec![
            StoreIr::new(
                "s1".to_string(),
                Some(vec![
                    RegionIr::new("r1".to_string(), vec![1.0, 2.5]),
                    RegionIr::new("r2".to_string(), vec![0.0, 3.0]),
                ]),
            ),
            StoreIr::new("s2".to_string(), Some(vec![])),
        ]);

        let text = format_snapshot(&snapshot);
        let parsed = parse_snapshot(&text).expect("dump parses back");
        assert_eq!(parsed, snapshot);
    }

    #[test]
    fn rejects_truncated_input() {
        let err = parse_snapshot("1\ns1\n2\nr1\n[1.0]\n").unwrap_err();
        assert!(matches!(err, ParseError::UnexpectedEof { .. }));
    }

    #[test]
    fn rejects_malformed_load_vector() {
        let err = parse_snapshot("1\ns1\n1\nr1\nnot-a-vector\n").unwrap_err();
        assert!(matches!(err, ParseError::BadLoadVector { .. }));
    }

    #[test]
    fn parses_empty_load_vector() {
        let parsed = parse_snapshot("1\ns1\n1\nr1\n[]\n").expect("parses");
        assert_eq!(parsed.stores[0].regions[0].vals, Vec::<f64>::new());
    }
}
