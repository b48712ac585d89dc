use std::time::Duration;

use camino::Utf8Path;
use regex::Regex;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::debug;

use crate::domain::{RemoteResource, Source, Species, local_name, species_from_filename};
use crate::error::LrtError;
use crate::portal::{CdsPortal, stream_to_file};

pub const ENSEMBL_LISTING: &str = "https://ftp.ensemblgenomes.org/pub/plants/current/fasta/";

pub struct EnsemblClient {
    client: Client,
    listing_url: String,
}

impl EnsemblClient {
    // No sign-on step; the bulk listing endpoint is open.
    pub fn new() -> Result<Self, LrtError> {
        Self::with_listing_url(ENSEMBL_LISTING)
    }

    pub fn with_listing_url(listing_url: impl Into<String>) -> Result<Self, LrtError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("lrt-predict/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| LrtError::EnsemblHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| LrtError::EnsemblHttp(err.to_string()))?;
        Ok(Self {
            client,
            listing_url: listing_url.into(),
        })
    }
}

impl CdsPortal for EnsemblClient {
    fn source(&self) -> Source {
        Source::Ensembl
    }

    fn list_resources(
        &self,
        suffix: &str,
        allow_list: &[Species],
    ) -> Result<Vec<RemoteResource>, LrtError> {
        debug!(url = %self.listing_url, "fetching the bulk listing");
        let response = self
            .client
            .get(&self.listing_url)
            .send()
            .map_err(|err| LrtError::EnsemblHttp(err.to_string()))?;
        if !response.status().is_success() {
            return Err(LrtError::EnsemblStatus {
                status: response.status().as_u16(),
                message: "listing request failed".to_string(),
            });
        }
        let listing = response
            .text()
            .map_err(|err| LrtError::EnsemblHttp(err.to_string()))?;
        let resources = parse_listing(&listing, suffix, allow_list, &self.listing_url);
        debug!(count = resources.len(), "listing entries selected");
        Ok(resources)
    }

    fn fetch_to_file(&self, url: &str, dest: &Utf8Path) -> Result<(), LrtError> {
        debug!(%url, "fetching");
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| LrtError::EnsemblHttp(err.to_string()))?;
        if !response.status().is_success() {
            return Err(LrtError::EnsemblStatus {
                status: response.status().as_u16(),
                message: format!("download failed for {url}"),
            });
        }
        stream_to_file(response, dest)
    }
}

// Directory listings from the bulk endpoint come back either as HTML index
// pages or as plain text, one entry per line; take every link or token that
// ends with the archive suffix. No checksum column exists on this source.
pub fn parse_listing(
    listing: &str,
    suffix: &str,
    allow_list: &[Species],
    listing_url: &str,
) -> Vec<RemoteResource> {
    let href_re = Regex::new(r#"href\s*=\s*["']([^"']+)["']"#).unwrap();
    let mut candidates: Vec<&str> = href_re
        .captures_iter(listing)
        .map(|caps| caps.get(1).unwrap().as_str())
        .filter(|link| link.ends_with(suffix))
        .collect();
    if candidates.is_empty() {
        candidates = listing
            .lines()
            .flat_map(str::split_whitespace)
            .filter(|token| token.ends_with(suffix))
            .collect();
    }

    let mut resources = Vec::new();
    for link in candidates {
        let Some(species) = species_from_filename(local_name(link)) else {
            continue;
        };
        if !allow_list.contains(&species) {
            continue;
        }
        resources.push(RemoteResource {
            source: Source::Ensembl,
            url: resolve_link(link, listing_url),
            md5: None,
            species,
        });
    }
    resources
}

fn resolve_link(link: &str, listing_url: &str) -> String {
    if link.starts_with("http://") || link.starts_with("https://") {
        return link.to_string();
    }
    let base = listing_url.trim_end_matches('/');
    let relative = link.trim_start_matches('/');
    format!("{base}/{relative}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn html_listing_filters_by_suffix_and_allow_list() {
        let listing = concat!(
            "<html><body><pre>\n",
            "<a href=\"Athaliana_TAIR10.cds.all.fa.gz\">Athaliana_TAIR10.cds.all.fa.gz</a>\n",
            "<a href=\"Athaliana_TAIR10.pep.all.fa.gz\">Athaliana_TAIR10.pep.all.fa.gz</a>\n",
            "<a href=\"Zmays_B73.cds.all.fa.gz\">Zmays_B73.cds.all.fa.gz</a>\n",
            "<a href=\"Hvulgare_IBSC.cds.all.fa.gz\">Hvulgare_IBSC.cds.all.fa.gz</a>\n",
            "</pre></body></html>\n",
        );
        let allow: Vec<Species> =
            vec!["Athaliana".parse().unwrap(), "Zmays".parse().unwrap()];

        let resources = parse_listing(
            listing,
            ".cds.all.fa.gz",
            &allow,
            "https://ftp.ensemblgenomes.org/pub/plants/current/fasta/",
        );

        let urls: Vec<&str> = resources.iter().map(|r| r.url.as_str()).collect();
        assert_eq!(
            urls,
            vec![
                "https://ftp.ensemblgenomes.org/pub/plants/current/fasta/Athaliana_TAIR10.cds.all.fa.gz",
                "https://ftp.ensemblgenomes.org/pub/plants/current/fasta/Zmays_B73.cds.all.fa.gz",
            ]
        );
        assert!(resources.iter().all(|r| r.md5.is_none()));
    }

    #[test]
    fn plain_text_listing_is_accepted() {
        let listing = "-rw-r--r-- 1 ftp ftp 123 Athaliana_TAIR10.cds.all.fa.gz\n";
        let allow: Vec<Species> = vec!["Athaliana".parse().unwrap()];

        let resources = parse_listing(listing, ".cds.all.fa.gz", &allow, "https://host/fasta");
        assert_eq!(resources.len(), 1);
        assert_eq!(
            resources[0].url,
            "https://host/fasta/Athaliana_TAIR10.cds.all.fa.gz"
        );
    }
}
