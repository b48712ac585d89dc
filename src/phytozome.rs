use std::time::Duration;

use camino::Utf8Path;
use regex::Regex;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use tracing::debug;

use crate::config::Credentials;
use crate::domain::{RemoteResource, Source, Species, local_name, species_from_filename};
use crate::error::LrtError;
use crate::portal::{CdsPortal, stream_to_file};

pub const JGI_LOGIN: &str = "https://signon.jgi.doe.gov/signon/create";
pub const DL_BASE: &str = "https://genome.jgi.doe.gov";
pub const XML_URL: &str = "https://genome.jgi.doe.gov/ext-api/downloads/get-directory";
pub const XML_ORGANISM: &str = "PhytozomeV10";

const FAILED_LOGIN: &str = "Login and password do not match";
const EXPIRED_ACCOUNT: &str = "Sorry, your password has expired";

pub struct PhytozomeClient {
    client: Client,
    manifest_url: String,
    download_base: String,
    organism: String,
}

impl PhytozomeClient {
    // The portal session is a server-side login bound to the cookie jar, so
    // establishing the client and signing on are one step.
    pub fn sign_on(credentials: &Credentials) -> Result<Self, LrtError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("lrt-predict/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| LrtError::JgiHttp(err.to_string()))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .cookie_store(true)
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|err| LrtError::JgiHttp(err.to_string()))?;

        debug!(user = %credentials.user, "signing on to the JGI Genomes Portal");
        let login_page = client
            .get(JGI_LOGIN)
            .send()
            .map_err(|err| LrtError::JgiHttp(err.to_string()))?;
        if !login_page.status().is_success() {
            return Err(LrtError::JgiStatus {
                status: login_page.status().as_u16(),
                message: "sign-on page unavailable".to_string(),
            });
        }
        let page_text = login_page
            .text()
            .map_err(|err| LrtError::JgiHttp(err.to_string()))?;
        let token = extract_auth_token(&page_text)?;

        let response = client
            .post(JGI_LOGIN)
            .form(&[
                ("login", credentials.user.as_str()),
                ("password", credentials.password.as_str()),
                ("authenticity_token", token.as_str()),
            ])
            .send()
            .map_err(|err| LrtError::JgiHttp(err.to_string()))?;
        let body = response
            .text()
            .map_err(|err| LrtError::JgiHttp(err.to_string()))?;
        classify_login_response(&body)?;
        debug!("JGI sign-on accepted");

        Ok(Self {
            client,
            manifest_url: XML_URL.to_string(),
            download_base: DL_BASE.to_string(),
            organism: XML_ORGANISM.to_string(),
        })
    }
}

impl CdsPortal for PhytozomeClient {
    fn source(&self) -> Source {
        Source::Phytozome
    }

    fn list_resources(
        &self,
        suffix: &str,
        allow_list: &[Species],
    ) -> Result<Vec<RemoteResource>, LrtError> {
        debug!(organism = %self.organism, "fetching the downloads manifest");
        let response = self
            .client
            .get(&self.manifest_url)
            .query(&[("organism", self.organism.as_str())])
            .send()
            .map_err(|err| LrtError::JgiHttp(err.to_string()))?;
        if !response.status().is_success() {
            return Err(LrtError::JgiStatus {
                status: response.status().as_u16(),
                message: "manifest request failed".to_string(),
            });
        }
        let xml = response
            .text()
            .map_err(|err| LrtError::JgiHttp(err.to_string()))?;
        let resources = parse_manifest(&xml, suffix, allow_list, &self.download_base)?;
        debug!(count = resources.len(), "manifest entries selected");
        Ok(resources)
    }

    fn fetch_to_file(&self, url: &str, dest: &Utf8Path) -> Result<(), LrtError> {
        debug!(%url, "fetching");
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|err| LrtError::JgiHttp(err.to_string()))?;
        if !response.status().is_success() {
            return Err(LrtError::JgiStatus {
                status: response.status().as_u16(),
                message: format!("download failed for {url}"),
            });
        }
        stream_to_file(response, dest)
    }
}

// The sign-on form carries a single-use anti-forgery token; pull it out of
// the form field named authenticity_token rather than by position in the
// markup, so attribute reordering does not break the handshake.
fn extract_auth_token(page: &str) -> Result<String, LrtError> {
    let input_re = Regex::new(r"<input\b[^>]*>").unwrap();
    let name_re = Regex::new(r#"name\s*=\s*["']authenticity_token["']"#).unwrap();
    let value_re = Regex::new(r#"value\s*=\s*["']([^"']+)["']"#).unwrap();
    for tag in input_re.find_iter(page) {
        if !name_re.is_match(tag.as_str()) {
            continue;
        }
        if let Some(caps) = value_re.captures(tag.as_str()) {
            return Ok(caps[1].to_string());
        }
    }
    Err(LrtError::TokenNotFound)
}

fn classify_login_response(body: &str) -> Result<(), LrtError> {
    if body.contains(FAILED_LOGIN) {
        return Err(LrtError::LoginRejected);
    }
    if body.contains(EXPIRED_ACCOUNT) {
        return Err(LrtError::AccountExpired);
    }
    Ok(())
}

pub fn parse_manifest(
    xml: &str,
    suffix: &str,
    allow_list: &[Species],
    download_base: &str,
) -> Result<Vec<RemoteResource>, LrtError> {
    let doc =
        roxmltree::Document::parse(xml).map_err(|err| LrtError::ManifestParse(err.to_string()))?;
    let mut resources = Vec::new();
    for node in doc.descendants().filter(|node| node.has_tag_name("file")) {
        let Some(url) = node.attribute("url") else {
            continue;
        };
        if !url.ends_with(suffix) {
            continue;
        }
        let Some(species) = species_from_filename(local_name(url)) else {
            continue;
        };
        if !allow_list.contains(&species) {
            continue;
        }
        resources.push(RemoteResource {
            source: Source::Phytozome,
            url: resolve_url(url, download_base),
            md5: node.attribute("md5").map(str::to_string),
            species,
        });
    }
    Ok(resources)
}

fn resolve_url(url: &str, download_base: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else if url.starts_with('/') {
        format!("{download_base}{url}")
    } else {
        format!("{download_base}/{url}")
    }
}
