use thiserror::Error;

use super::har::HarError;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("config error: {0}")]
    Config(String),
    #[error("load test failed: {0}")]
    Load(#[from] LoadError),
    #[error("{0}")]
    Har(#[from] HarError),
    #[error("command failed: {0}")]
    Command(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("anyhow error: {0}")]
    Anyhow(#[from] anyhow::Error),
}

impl CliError {
    /// Process exit code: 11 config, 20 I/O or startup, 50 anything else.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Config(_) => 11,
            Self::Load(LoadError::Config(_)) => 11,
            Self::Load(LoadError::ClientBuild { .. }) => 20,
            Self::Har(_) => 20,
            Self::Io(_) => 20,
            Self::Command(_) => 20,
            Self::Anyhow(_) => 50,
        }
    }
}

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("config error: {0}")]
    Config(String),
    #[error("http client build failed for worker {worker}: {source}")]
    ClientBuild {
        worker: usize,
        source: reqwest::Error,
    },
}

/// Why a replayed request produced no usable response.
#[derive(Error, Debug)]
pub enum SendError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

impl SendError {
    /// Short machine-friendly cause, carried into results.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Transport(e) if e.is_redirect() => "redirect",
            Self::Transport(e) if e.is_timeout() => "timeout",
            Self::Transport(e) if e.is_connect() => "connect",
            Self::Transport(e) if e.is_request() => "request",
            Self::Transport(e) if e.is_body() => "body",
            Self::Transport(_) => "transport",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_category() {
        assert_eq!(CliError::Config("bad".into()).exit_code(), 11);
        assert_eq!(
            CliError::from(LoadError::Config("workers".into())).exit_code(),
            11
        );
        assert_eq!(
            CliError::from(HarError::Empty("a.har".into())).exit_code(),
            20
        );
        assert_eq!(
            CliError::from(std::io::Error::other("disk")).exit_code(),
            20
        );
        assert_eq!(CliError::from(anyhow::anyhow!("boom")).exit_code(), 50);
    }
}
