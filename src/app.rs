use std::time::Duration;

use camino::Utf8PathBuf;
use serde::Serialize;
use tracing::info;

use crate::config::{FetchConfig, FetchMode, PredictConfig};
use crate::convert::{Converter, discover_archives};
use crate::engine::SyncEngine;
use crate::error::LrtError;
use crate::portal::CdsPortal;
use crate::search::{SearchRunner, discover_databases};
use crate::store::Store;

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

pub struct NullSink;

impl ProgressSink for NullSink {
    fn event(&self, _event: ProgressEvent) {}
}

pub struct TraceSink;

impl ProgressSink for TraceSink {
    fn event(&self, event: ProgressEvent) {
        info!("{}", event.message);
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct FetchSummary {
    pub listed: usize,
    pub updated: Vec<String>,
    pub converted: usize,
    pub failed_conversions: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictSummary {
    pub databases: usize,
    pub queries: usize,
    pub hits_written: usize,
    pub output: String,
}

pub struct App<P: CdsPortal, E: CdsPortal> {
    store: Store,
    phytozome: P,
    ensembl: E,
}

impl<P: CdsPortal, E: CdsPortal> App<P, E> {
    pub fn new(store: Store, phytozome: P, ensembl: E) -> Self {
        Self {
            store,
            phytozome,
            ensembl,
        }
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn fetch(
        &self,
        config: &FetchConfig,
        sink: &dyn ProgressSink,
    ) -> Result<FetchSummary, LrtError> {
        if config.mode == FetchMode::ConvertOnly {
            let archives = discover_archives(
                self.store.base(),
                &[
                    config.phytozome_suffix.as_str(),
                    config.ensembl_suffix.as_str(),
                ],
            )?;
            sink.event(ProgressEvent {
                message: format!("phase=Convert; {} archives on disk", archives.len()),
                elapsed: None,
            });
            let results = Converter::new(&config.format_tool).convert_all(&archives, sink);
            let converted = results.iter().filter(|(_, o)| o.success).count();
            return Ok(FetchSummary {
                listed: archives.len(),
                updated: Vec::new(),
                converted,
                failed_conversions: results.len() - converted,
            });
        }

        let mut listed = 0;
        let mut updated = Vec::new();
        let portals: [&dyn CdsPortal; 2] = [&self.ensembl, &self.phytozome];
        for portal in portals {
            let suffix = match portal.source() {
                crate::domain::Source::Phytozome => &config.phytozome_suffix,
                crate::domain::Source::Ensembl => &config.ensembl_suffix,
            };
            sink.event(ProgressEvent {
                message: format!("phase=List; querying {}", portal.source()),
                elapsed: None,
            });
            let resources = portal.list_resources(suffix, &config.allow_list)?;
            listed += resources.len();
            let engine = SyncEngine::new(&self.store, portal, config.retry);
            updated.extend(engine.sync(&resources, sink)?);
        }

        let (converted, failed_conversions) = if config.mode == FetchMode::FetchOnly {
            (0, 0)
        } else {
            let results = Converter::new(&config.format_tool).convert_all(&updated, sink);
            let ok = results.iter().filter(|(_, o)| o.success).count();
            (ok, results.len() - ok)
        };

        Ok(FetchSummary {
            listed,
            updated: updated.into_iter().map(Utf8PathBuf::into_string).collect(),
            converted,
            failed_conversions,
        })
    }

    pub fn predict(
        &self,
        config: &PredictConfig,
        sink: &dyn ProgressSink,
    ) -> Result<PredictSummary, LrtError> {
        let databases = discover_databases(
            self.store.base(),
            &[
                crate::config::PHYTOZOME_SUFFIX,
                crate::config::ENSEMBL_SUFFIX,
            ],
        )?;
        sink.event(ProgressEvent {
            message: format!("phase=Search; {} databases to search", databases.len()),
            elapsed: None,
        });

        let output = hit_output_path(self.store.base(), &config.query_fasta);
        let runner = SearchRunner::new(&config.search_tool, config.evalue);
        let outcome = runner.search(&databases, &config.query_fasta, &output, sink)?;

        Ok(PredictSummary {
            databases: databases.len(),
            queries: outcome.queries,
            hits_written: outcome.hits_written,
            output: output.into_string(),
        })
    }
}

fn hit_output_path(base: &camino::Utf8Path, query_fasta: &camino::Utf8Path) -> Utf8PathBuf {
    let stem = query_fasta
        .file_name()
        .map(|name| name.split('.').next().unwrap_or(name))
        .filter(|stem| !stem.is_empty())
        .unwrap_or("query");
    base.join(format!("{stem}_hits.fa"))
}
