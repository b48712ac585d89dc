use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};

use camino::Utf8Path;
use flate2::read::GzDecoder;

use crate::error::LrtError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FastaRecord {
    pub id: String,
    pub header: String,
    pub sequence: Vec<String>,
}

pub fn record_id(header: &str) -> &str {
    header
        .trim_start_matches('>')
        .split_whitespace()
        .next()
        .unwrap_or("")
}

fn open_lines(path: &Utf8Path) -> Result<Box<dyn BufRead>, LrtError> {
    let file = File::open(path.as_std_path())
        .map_err(|err| LrtError::Filesystem(format!("open {path}: {err}")))?;
    if path.as_str().ends_with(".gz") {
        Ok(Box::new(BufReader::new(GzDecoder::new(file))))
    } else {
        Ok(Box::new(BufReader::new(file)))
    }
}

pub fn query_ids_in_order(path: &Utf8Path) -> Result<Vec<String>, LrtError> {
    let reader = open_lines(path)?;
    let mut seen = HashSet::new();
    let mut ids = Vec::new();
    for line in reader.lines() {
        let line = line.map_err(|err| LrtError::Filesystem(format!("read {path}: {err}")))?;
        if line.starts_with('>') {
            let id = record_id(&line).to_string();
            if !id.is_empty() && seen.insert(id.clone()) {
                ids.push(id);
            }
        }
    }
    Ok(ids)
}

pub fn find_record(path: &Utf8Path, id: &str) -> Result<Option<FastaRecord>, LrtError> {
    let reader = open_lines(path)?;
    let mut current: Option<FastaRecord> = None;
    for line in reader.lines() {
        let line = line.map_err(|err| LrtError::Filesystem(format!("read {path}: {err}")))?;
        if line.starts_with('>') {
            if current.is_some() {
                return Ok(current);
            }
            if record_id(&line) == id {
                current = Some(FastaRecord {
                    id: id.to_string(),
                    header: line,
                    sequence: Vec::new(),
                });
            }
        } else if let Some(record) = current.as_mut() {
            record.sequence.push(line);
        }
    }
    Ok(current)
}
