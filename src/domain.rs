use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::LrtError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Phytozome,
    Ensembl,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Phytozome => "phytozome",
            Source::Ensembl => "ensembl",
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Species(String);

impl Species {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Species {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Species {
    type Err = LrtError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        let is_valid = !trimmed.is_empty()
            && trimmed
                .chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '-');
        if !is_valid {
            return Err(LrtError::InvalidSpecies(value.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteResource {
    pub source: Source,
    pub url: String,
    pub md5: Option<String>,
    pub species: Species,
}

pub fn local_name(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}

// Shared by the listers (allow-list filtering) and the store (directory
// placement); the two must never disagree on what a filename's species is.
pub fn species_from_filename(filename: &str) -> Option<Species> {
    let prefix = match filename.find('_') {
        Some(pos) => &filename[..pos],
        None => filename.split('.').next().unwrap_or(filename),
    };
    prefix.parse().ok()
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn parse_species_valid() {
        let species: Species = " Athaliana ".parse().unwrap();
        assert_eq!(species.as_str(), "Athaliana");
    }

    #[test]
    fn parse_species_invalid() {
        let err = "a/b".parse::<Species>().unwrap_err();
        assert_matches!(err, LrtError::InvalidSpecies(_));
        assert_matches!("".parse::<Species>(), Err(LrtError::InvalidSpecies(_)));
    }

    #[test]
    fn local_name_is_url_basename() {
        let url = "/PhytozomeV10/download/_JAMO/abc/Sitalica_164_v2.1.cds.fa.gz";
        assert_eq!(local_name(url), "Sitalica_164_v2.1.cds.fa.gz");
        assert_eq!(local_name("plain.fa.gz"), "plain.fa.gz");
    }

    #[test]
    fn species_from_filename_underscore_prefix() {
        let species = species_from_filename("Sitalica_164_v2.1.cds.fa.gz").unwrap();
        assert_eq!(species.as_str(), "Sitalica");
    }

    #[test]
    fn species_from_filename_dot_fallback() {
        let species = species_from_filename("Athaliana.cds.fa.gz").unwrap();
        assert_eq!(species.as_str(), "Athaliana");
    }
}
