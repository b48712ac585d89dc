use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum LrtError {
    #[error("invalid species name: {0}")]
    InvalidSpecies(String),

    #[error("no JGI credentials: pass --user/--password or set LRT_JGI_USER/LRT_JGI_PASSWORD")]
    MissingCredentials,

    #[error("could not sign on to the JGI Genomes Portal: login and password do not match")]
    #[diagnostic(help("retrying with the same credentials cannot succeed; check them and run again"))]
    LoginRejected,

    #[error("could not sign on to the JGI Genomes Portal: the account has expired")]
    #[diagnostic(help("renew the portal account before fetching"))]
    AccountExpired,

    #[error("no authenticity token field on the sign-on page")]
    TokenNotFound,

    #[error("JGI request failed: {0}")]
    JgiHttp(String),

    #[error("JGI returned status {status}: {message}")]
    JgiStatus { status: u16, message: String },

    #[error("Ensembl request failed: {0}")]
    EnsemblHttp(String),

    #[error("Ensembl returned status {status}: {message}")]
    EnsemblStatus { status: u16, message: String },

    #[error("failed to parse the downloads manifest: {0}")]
    ManifestParse(String),

    #[error("{file}: checksum still wrong after {attempts} download attempts")]
    #[diagnostic(help("the remote copy or its published checksum may be corrupt"))]
    DownloadRetriesExhausted { file: String, attempts: u32 },

    #[error("required executables were not found on this system: {0}")]
    #[diagnostic(help("install the missing tools and make sure they are on PATH"))]
    MissingExecutables(String),

    #[error("failed to run {tool}: {message}")]
    Subprocess { tool: String, message: String },

    #[error("search produced an unparseable result row: {0}")]
    SearchParse(String),

    #[error("failed to read species list {path}: {message}")]
    SpeciesListRead { path: String, message: String },

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
