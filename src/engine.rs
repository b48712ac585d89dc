use std::thread;
use std::time::Duration;

use camino::Utf8PathBuf;
use tracing::{debug, info};

use crate::app::{ProgressEvent, ProgressSink};
use crate::checksum;
use crate::domain::{RemoteResource, local_name};
use crate::error::LrtError;
use crate::portal::CdsPortal;
use crate::store::{LocalEntry, Metadata, Store, iso_timestamp};

pub type UpdatedFileSet = Vec<Utf8PathBuf>;

#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_millis(500),
        }
    }
}

impl RetryPolicy {
    fn backoff(&self, failed_attempts: u32) -> Duration {
        self.base_delay * failed_attempts
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceState {
    Absent,
    Stale,
    Current,
    Failed,
}

pub struct SyncEngine<'a> {
    store: &'a Store,
    portal: &'a dyn CdsPortal,
    policy: RetryPolicy,
}

impl<'a> SyncEngine<'a> {
    pub fn new(store: &'a Store, portal: &'a dyn CdsPortal, policy: RetryPolicy) -> Self {
        Self {
            store,
            portal,
            policy,
        }
    }

    // One resource is fully resolved, through as many download rounds as it
    // takes, before the next one is looked at.
    pub fn sync(
        &self,
        resources: &[RemoteResource],
        sink: &dyn ProgressSink,
    ) -> Result<UpdatedFileSet, LrtError> {
        let mut updated = Vec::new();
        for resource in resources {
            if let Some(path) = self.sync_one(resource, sink)? {
                updated.push(path);
            }
        }
        info!(
            source = %self.portal.source(),
            total = resources.len(),
            updated = updated.len(),
            "sync finished"
        );
        Ok(updated)
    }

    fn classify(&self, entry: &LocalEntry, resource: &RemoteResource) -> Result<ResourceState, LrtError> {
        if !self.store.exists(entry) {
            return Ok(ResourceState::Absent);
        }
        let Some(expected) = &resource.md5 else {
            // No published checksum on this source; presence is the only
            // stable signal across runs.
            return Ok(ResourceState::Current);
        };
        let computed = checksum::md5_hex(entry.path.as_std_path())?;
        if checksum::matches(&computed, expected) {
            Ok(ResourceState::Current)
        } else {
            Ok(ResourceState::Stale)
        }
    }

    fn sync_one(
        &self,
        resource: &RemoteResource,
        sink: &dyn ProgressSink,
    ) -> Result<Option<Utf8PathBuf>, LrtError> {
        let entry = self.store.local_entry(resource);
        self.store.ensure_species_dir(&entry)?;
        let name = local_name(&resource.url);

        let state = self.classify(&entry, resource)?;
        if state == ResourceState::Current {
            sink.event(ProgressEvent {
                message: format!("phase=Verify; {name} is current, skipping"),
                elapsed: None,
            });
            debug!(file = name, "current, no download");
            return Ok(None);
        }
        let reason = if state == ResourceState::Absent {
            "does not exist yet"
        } else {
            "is out of date"
        };
        sink.event(ProgressEvent {
            message: format!("phase=Verify; {name} {reason}, downloading"),
            elapsed: None,
        });

        for attempt in 1..=self.policy.max_attempts {
            if attempt > 1 {
                thread::sleep(self.policy.backoff(attempt - 1));
            }
            self.portal.fetch_to_file(&resource.url, &entry.path)?;
            let computed = checksum::md5_hex(entry.path.as_std_path())?;
            let verified = match &resource.md5 {
                Some(expected) => checksum::matches(&computed, expected),
                None => true,
            };
            if verified {
                sink.event(ProgressEvent {
                    message: format!("phase=Store; {name} downloaded and verified"),
                    elapsed: None,
                });
                info!(file = name, attempt, "downloaded");
                self.record_metadata(resource, name, computed)?;
                return Ok(Some(entry.path));
            }
            sink.event(ProgressEvent {
                message: format!(
                    "phase=Verify; {name} checksum mismatch on attempt {attempt}, retrying"
                ),
                elapsed: None,
            });
            debug!(file = name, attempt, "checksum mismatch");
        }

        sink.event(ProgressEvent {
            message: format!("phase=Verify; giving up on {name}"),
            elapsed: None,
        });
        Err(LrtError::DownloadRetriesExhausted {
            file: name.to_string(),
            attempts: self.policy.max_attempts,
        })
    }

    fn record_metadata(
        &self,
        resource: &RemoteResource,
        name: &str,
        computed: String,
    ) -> Result<(), LrtError> {
        let metadata = Metadata {
            source: resource.source.as_str().to_string(),
            species: resource.species.as_str().to_string(),
            url: resource.url.clone(),
            file: name.to_string(),
            md5: Some(computed),
            downloaded_at: iso_timestamp(),
            tool: format!("lrt-predict/{}", env!("CARGO_PKG_VERSION")),
        };
        Store::write_metadata(
            &self.store.metadata_path(&resource.species, name),
            &metadata,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_linearly() {
        let policy = RetryPolicy {
            max_attempts: 4,
            base_delay: Duration::from_millis(200),
        };
        assert_eq!(policy.backoff(1), Duration::from_millis(200));
        assert_eq!(policy.backoff(3), Duration::from_millis(600));
    }
}
