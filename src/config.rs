use std::fs;

use camino::Utf8PathBuf;

use crate::domain::Species;
use crate::engine::RetryPolicy;
use crate::error::LrtError;
use crate::species;

pub const PHYTOZOME_SUFFIX: &str = ".cds.fa.gz";
pub const ENSEMBL_SUFFIX: &str = ".cds.all.fa.gz";
pub const DEFAULT_FORMAT_TOOL: &str = "format_cds_db";
pub const DEFAULT_SEARCH_TOOL: &str = "tblastx";

#[derive(Debug, Clone)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl Credentials {
    pub fn resolve(user: Option<String>, password: Option<String>) -> Result<Self, LrtError> {
        let user = user
            .or_else(|| non_empty_env("LRT_JGI_USER"))
            .ok_or(LrtError::MissingCredentials)?;
        let password = password
            .or_else(|| non_empty_env("LRT_JGI_PASSWORD"))
            .ok_or(LrtError::MissingCredentials)?;
        Ok(Self { user, password })
    }
}

fn non_empty_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    FetchAndConvert,
    FetchOnly,
    ConvertOnly,
}

#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub base: Utf8PathBuf,
    pub allow_list: Vec<Species>,
    pub phytozome_suffix: String,
    pub ensembl_suffix: String,
    pub retry: RetryPolicy,
    pub mode: FetchMode,
    pub format_tool: String,
}

impl FetchConfig {
    pub fn new(base: Utf8PathBuf) -> Self {
        Self {
            base,
            allow_list: species::default_allow_list(),
            phytozome_suffix: PHYTOZOME_SUFFIX.to_string(),
            ensembl_suffix: ENSEMBL_SUFFIX.to_string(),
            retry: RetryPolicy::default(),
            mode: FetchMode::FetchAndConvert,
            format_tool: DEFAULT_FORMAT_TOOL.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PredictConfig {
    pub base: Utf8PathBuf,
    pub query_fasta: Utf8PathBuf,
    pub evalue: f64,
    pub search_tool: String,
}

impl PredictConfig {
    pub fn new(base: Utf8PathBuf, query_fasta: Utf8PathBuf, evalue: f64) -> Self {
        Self {
            base,
            query_fasta,
            evalue,
            search_tool: DEFAULT_SEARCH_TOOL.to_string(),
        }
    }
}

pub fn load_species_list(path: &Utf8PathBuf) -> Result<Vec<Species>, LrtError> {
    let content = fs::read_to_string(path).map_err(|err| LrtError::SpeciesListRead {
        path: path.to_string(),
        message: err.to_string(),
    })?;
    let mut list = Vec::new();
    for line in content.lines() {
        let entry = line.split('#').next().unwrap_or("").trim();
        if entry.is_empty() {
            continue;
        }
        list.push(entry.parse()?);
    }
    Ok(list)
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn species_list_skips_comments_and_blanks() {
        let temp = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(temp.path().join("species.txt")).unwrap();
        fs::write(&path, "# panel\nAthaliana\n\nSitalica  # foxtail millet\n").unwrap();

        let list = load_species_list(&path).unwrap();
        let names: Vec<&str> = list.iter().map(|species| species.as_str()).collect();
        assert_eq!(names, vec!["Athaliana", "Sitalica"]);
    }

    #[test]
    fn species_list_rejects_bad_entries() {
        let temp = tempfile::tempdir().unwrap();
        let path = Utf8PathBuf::from_path_buf(temp.path().join("species.txt")).unwrap();
        fs::write(&path, "../escape\n").unwrap();

        let err = load_species_list(&path).unwrap_err();
        assert_matches!(err, LrtError::InvalidSpecies(_));
    }

    #[test]
    fn credentials_from_flags() {
        let creds =
            Credentials::resolve(Some("user".to_string()), Some("secret".to_string())).unwrap();
        assert_eq!(creds.user, "user");
        assert_eq!(creds.password, "secret");
    }
}
