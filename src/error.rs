use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("no build data available for job \"{0}\"")]
    NoBuildData(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("job \"{0}\" is not in the queue")]
    NotInQueue(String),

    #[error("SCM class \"{class}\" is not supported (job \"{job}\")")]
    UnsupportedScm { class: String, job: String },

    #[error("no SCM configured for job \"{0}\"")]
    ScmNotConfigured(String),

    #[error("failed to invoke job \"{job}\": {reason}")]
    InvocationFailed { job: String, reason: String },

    #[error("server returned status {status} for {url}")]
    Http { status: u16, url: String },

    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("malformed job status: {0}")]
    Json(#[from] serde_json::Error),

    #[error("malformed config document: {0}")]
    XmlParse(#[from] xmltree::ParseError),

    #[error("failed to serialize config document: {0}")]
    XmlWrite(#[from] xmltree::Error),

    #[error("invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl Error {
    /// True for the distinguishable "resource not found" transport condition
    /// (HTTP 404), which queue cancellation treats as a success signature.
    pub fn is_http_not_found(&self) -> bool {
        matches!(self, Error::Http { status: 404, .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
