use std::fs;

use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};

use crate::domain::{RemoteResource, Species, local_name};
use crate::error::LrtError;

#[derive(Debug, Clone)]
pub struct Store {
    base: Utf8PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocalEntry {
    pub path: Utf8PathBuf,
    pub species_dir: Utf8PathBuf,
}

impl Store {
    pub fn new(base: Utf8PathBuf) -> Self {
        Self { base }
    }

    pub fn base(&self) -> &Utf8Path {
        &self.base
    }

    pub fn species_dir(&self, species: &Species) -> Utf8PathBuf {
        self.base.join(species.as_str())
    }

    pub fn local_entry(&self, resource: &RemoteResource) -> LocalEntry {
        let species_dir = self.species_dir(&resource.species);
        let path = species_dir.join(local_name(&resource.url));
        LocalEntry { path, species_dir }
    }

    pub fn ensure_species_dir(&self, entry: &LocalEntry) -> Result<(), LrtError> {
        fs::create_dir_all(entry.species_dir.as_std_path())
            .map_err(|err| LrtError::Filesystem(err.to_string()))
    }

    pub fn exists(&self, entry: &LocalEntry) -> bool {
        entry.path.as_std_path().is_file()
    }

    pub fn metadata_path(&self, species: &Species, filename: &str) -> Utf8PathBuf {
        self.base
            .join(".metadata")
            .join(species.as_str())
            .join(format!("{filename}.json"))
    }

    pub fn write_metadata(path: &Utf8Path, metadata: &Metadata) -> Result<(), LrtError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent.as_std_path())
                .map_err(|err| LrtError::Filesystem(err.to_string()))?;
        }
        let tmp_path = path.with_extension("json.tmp");
        let content = serde_json::to_vec_pretty(metadata)
            .map_err(|err| LrtError::Filesystem(err.to_string()))?;
        fs::write(tmp_path.as_std_path(), &content)
            .map_err(|err| LrtError::Filesystem(err.to_string()))?;
        fs::rename(tmp_path.as_std_path(), path.as_std_path())
            .map_err(|err| LrtError::Filesystem(err.to_string()))?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    pub source: String,
    pub species: String,
    pub url: String,
    pub file: String,
    pub md5: Option<String>,
    pub downloaded_at: String,
    pub tool: String,
}

pub fn iso_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Source;

    #[test]
    fn layout_places_resource_under_species_dir() {
        let store = Store::new(Utf8PathBuf::from("/data/cds"));
        let resource = RemoteResource {
            source: Source::Phytozome,
            url: "http://genome.jgi.doe.gov/x/y/speciesA_v2.cds.fa.gz".to_string(),
            md5: Some("d41d8cd98f00b204e9800998ecf8427e".to_string()),
            species: "speciesA".parse().unwrap(),
        };

        let entry = store.local_entry(&resource);
        assert_eq!(entry.species_dir, "/data/cds/speciesA");
        assert_eq!(entry.path, "/data/cds/speciesA/speciesA_v2.cds.fa.gz");
    }

    #[test]
    fn metadata_path_is_hidden_and_per_species() {
        let store = Store::new(Utf8PathBuf::from("/data/cds"));
        let species: Species = "Sitalica".parse().unwrap();
        let path = store.metadata_path(&species, "Sitalica_164_v2.1.cds.fa.gz");
        assert_eq!(
            path,
            "/data/cds/.metadata/Sitalica/Sitalica_164_v2.1.cds.fa.gz.json"
        );
    }
}
