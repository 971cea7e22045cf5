use thiserror::Error;

pub type Result<T> = std::result::Result<T, DdnsError>;

/// Everything that can abort a run. Handled once, in `main`.
#[derive(Debug, Error)]
pub enum DdnsError {
    /// Every IP lookup endpoint failed or returned no usable address.
    #[error("IP resolution failed: {0}")]
    IpResolution(String),

    /// The provider answered with a non-success reply code.
    #[error("{operation} failed with code {code}: {detail}")]
    RequestFailed {
        operation: &'static str,
        code: String,
        detail: String,
    },

    #[error("configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Unexpected(#[from] anyhow::Error),
}

impl DdnsError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Lines written to the run log when this error ends a run.
    ///
    /// Unexpected errors are reported with their whole cause chain, one line
    /// per entry, under a `Long message` header.
    pub fn report_lines(&self) -> Vec<String> {
        match self {
            Self::IpResolution(detail) => {
                vec![format!("Failed to get current IP with response: '{detail}'")]
            }
            Self::RequestFailed { detail, .. } => {
                vec![format!("Failed to do a request with message: '{detail}'")]
            }
            Self::Config(detail) => vec![format!("Invalid configuration: {detail}")],
            Self::Unexpected(err) => {
                let mut lines = vec!["Long message".to_string()];
                lines.extend(
                    format!("{err:?}")
                        .lines()
                        .filter(|line| !line.trim().is_empty())
                        .map(str::to_string),
                );
                lines
            }
        }
    }
}
