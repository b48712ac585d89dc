use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::process::Command;

use camino::{Utf8Path, Utf8PathBuf};
use tracing::{debug, info, warn};

use crate::app::{ProgressEvent, ProgressSink};
use crate::convert::discover_archives;
use crate::error::LrtError;
use crate::fasta;

// Tabular output columns, in the search tool's fixed order:
// qseqid sseqid pident length mismatch gapopen qstart qend sstart send evalue bitscore
const TABULAR_COLUMNS: usize = 12;

#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub query_id: String,
    pub subject_id: String,
    pub percent_identity: f64,
    pub alignment_length: u64,
    pub e_value: f64,
    pub bit_score: f64,
    pub database: Utf8PathBuf,
}

#[derive(Debug, Clone, Copy)]
pub struct SearchOutcome {
    pub queries: usize,
    pub hits_written: usize,
}

pub struct SearchRunner {
    tool: String,
    threshold: f64,
}

impl SearchRunner {
    pub fn new(tool: impl Into<String>, threshold: f64) -> Self {
        Self {
            tool: tool.into(),
            threshold,
        }
    }

    fn run_database(
        &self,
        query_fasta: &Utf8Path,
        database: &Utf8Path,
    ) -> Result<Vec<SearchHit>, LrtError> {
        debug!(db = %database, "searching");
        let output = Command::new(&self.tool)
            .args([
                "-query",
                query_fasta.as_str(),
                "-db",
                database.as_str(),
                "-evalue",
                &self.threshold.to_string(),
                "-outfmt",
                "6",
            ])
            .output()
            .map_err(|err| LrtError::Subprocess {
                tool: self.tool.clone(),
                message: err.to_string(),
            })?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = if stderr.is_empty() {
                format!("search failed for {database}")
            } else {
                stderr
            };
            return Err(LrtError::Subprocess {
                tool: self.tool.clone(),
                message,
            });
        }
        parse_tabular(&String::from_utf8_lossy(&output.stdout), database)
    }

    pub fn search(
        &self,
        databases: &[Utf8PathBuf],
        query_fasta: &Utf8Path,
        output: &Utf8Path,
        sink: &dyn ProgressSink,
    ) -> Result<SearchOutcome, LrtError> {
        let query_order = fasta::query_ids_in_order(query_fasta)?;
        let mut hits = Vec::new();
        for database in databases {
            sink.event(ProgressEvent {
                message: format!("phase=Search; querying {database}"),
                elapsed: None,
            });
            hits.extend(self.run_database(query_fasta, database)?);
        }
        let best = select_best_hits(&hits, self.threshold);
        let hits_written = write_hit_sequences(&best, &query_order, output)?;
        info!(
            queries = query_order.len(),
            hits = hits_written,
            output = %output,
            "search finished"
        );
        Ok(SearchOutcome {
            queries: query_order.len(),
            hits_written,
        })
    }
}

pub fn parse_tabular(text: &str, database: &Utf8Path) -> Result<Vec<SearchHit>, LrtError> {
    let mut hits = Vec::new();
    for line in text.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let cols: Vec<&str> = line.split_whitespace().collect();
        if cols.len() < TABULAR_COLUMNS {
            return Err(LrtError::SearchParse(line.to_string()));
        }
        let parse_f64 = |value: &str| {
            value
                .parse::<f64>()
                .map_err(|_| LrtError::SearchParse(line.to_string()))
        };
        hits.push(SearchHit {
            query_id: cols[0].to_string(),
            subject_id: cols[1].to_string(),
            percent_identity: parse_f64(cols[2])?,
            alignment_length: cols[3]
                .parse()
                .map_err(|_| LrtError::SearchParse(line.to_string()))?,
            e_value: parse_f64(cols[10])?,
            bit_score: parse_f64(cols[11])?,
            database: database.to_path_buf(),
        });
    }
    Ok(hits)
}

// Best hit per query: the numerically smallest e-value at or below the
// threshold; ties keep the earlier row. Queries with nothing under the
// threshold simply produce no entry.
pub fn select_best_hits(hits: &[SearchHit], threshold: f64) -> HashMap<String, SearchHit> {
    let mut best: HashMap<String, SearchHit> = HashMap::new();
    for hit in hits {
        if !(hit.e_value <= threshold) {
            continue;
        }
        match best.get(&hit.query_id) {
            Some(current) if current.e_value <= hit.e_value => {}
            _ => {
                best.insert(hit.query_id.clone(), hit.clone());
            }
        }
    }
    best
}

// The unaligned subject sequence comes from the database FASTA itself, and
// records land in the order their query first appeared in the input file;
// downstream alignment expects query-synchronized output.
pub fn write_hit_sequences(
    best: &HashMap<String, SearchHit>,
    query_order: &[String],
    output: &Utf8Path,
) -> Result<usize, LrtError> {
    let file = File::create(output.as_std_path())
        .map_err(|err| LrtError::Filesystem(format!("create {output}: {err}")))?;
    let mut writer = BufWriter::new(file);
    let mut written = 0;
    for query_id in query_order {
        let Some(hit) = best.get(query_id) else {
            continue;
        };
        let Some(record) = fasta::find_record(&hit.database, &hit.subject_id)? else {
            warn!(
                subject = hit.subject_id.as_str(),
                db = %hit.database,
                "best-hit subject missing from database, skipping"
            );
            continue;
        };
        writeln!(writer, ">{}", hit.subject_id)
            .map_err(|err| LrtError::Filesystem(format!("write {output}: {err}")))?;
        for line in &record.sequence {
            writeln!(writer, "{line}")
                .map_err(|err| LrtError::Filesystem(format!("write {output}: {err}")))?;
        }
        written += 1;
    }
    writer
        .flush()
        .map_err(|err| LrtError::Filesystem(format!("flush {output}: {err}")))?;
    Ok(written)
}

pub fn discover_databases(
    base: &Utf8Path,
    archive_suffixes: &[&str],
) -> Result<Vec<Utf8PathBuf>, LrtError> {
    let db_suffixes: Vec<String> = archive_suffixes
        .iter()
        .map(|suffix| suffix.trim_end_matches(".gz").to_string())
        .collect();
    let refs: Vec<&str> = db_suffixes.iter().map(String::as_str).collect();
    discover_archives(base, &refs)
}
