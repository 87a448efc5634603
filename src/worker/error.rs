use crate::storage::StorageError;
use reqwest::StatusCode;
use thiserror::Error;

/// Why a single download attempt ended without a committed file
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Too many redirections")]
    TooManyRedirects,

    #[error("4XX response status code ({status})")]
    ClientError { status: StatusCode },

    #[error("5XX response status code ({status})")]
    ServerError { status: StatusCode },

    #[error("Document is too big (limit {limit} bytes)")]
    TooBigDocument { limit: u64 },

    #[error("Not enough disk space to write")]
    OutOfDiskSpace,

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Document is empty")]
    EmptyDocument,

    #[error("unexpected response status {status}")]
    UnexpectedStatus { status: StatusCode },

    #[error("{0}")]
    Transport(#[from] reqwest::Error),

    #[error("{0}")]
    Storage(#[from] StorageError),
}

pub type Result<T> = std::result::Result<T, DownloadError>;

impl DownloadError {
    /// Stable short name of the failure kind
    pub fn kind(&self) -> &'static str {
        match self {
            DownloadError::TooManyRedirects => "TooManyRedirects",
            DownloadError::ClientError { .. } => "ClientError",
            DownloadError::ServerError { .. } => "ServerError",
            DownloadError::TooBigDocument { .. } => "TooBigDocument",
            DownloadError::OutOfDiskSpace => "OutOfDiskSpace",
            DownloadError::InvalidInput(_) => "InvalidInput",
            DownloadError::EmptyDocument => "EmptyDocument",
            DownloadError::UnexpectedStatus { .. } => "UnexpectedStatus",
            DownloadError::Transport(err) if err.is_timeout() => "Timeout",
            DownloadError::Transport(err) if err.is_connect() => "ConnectError",
            DownloadError::Transport(_) => "TransportError",
            DownloadError::Storage(_) => "StorageError",
        }
    }

    /// Failures the downloader itself decided on, as opposed to transport or
    /// filesystem errors surfacing from below
    pub fn is_classified(&self) -> bool {
        matches!(
            self,
            DownloadError::TooManyRedirects
                | DownloadError::ClientError { .. }
                | DownloadError::ServerError { .. }
                | DownloadError::TooBigDocument { .. }
                | DownloadError::OutOfDiskSpace
                | DownloadError::InvalidInput(_)
                | DownloadError::EmptyDocument
        )
    }

    /// The warning line reported for `url`
    pub fn report_line(&self, url: &str) -> String {
        if self.is_classified() {
            format!("{url:?} - {self}")
        } else {
            format!("{url:?} - {}: {self}", self.kind())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classified_report_line() {
        let line = DownloadError::TooManyRedirects.report_line("http://loop");
        assert_eq!(line, "\"http://loop\" - Too many redirections");

        let line = DownloadError::ClientError {
            status: StatusCode::UNPROCESSABLE_ENTITY,
        }
        .report_line("http://x");
        assert!(line.starts_with("\"http://x\" - 4XX response status code"));
    }

    #[test]
    fn test_unclassified_report_line_names_kind() {
        let err = DownloadError::UnexpectedStatus {
            status: StatusCode::CONTINUE,
        };
        assert!(!err.is_classified());
        assert_eq!(
            err.report_line("http://x"),
            "\"http://x\" - UnexpectedStatus: unexpected response status 100 Continue"
        );
    }

    #[test]
    fn test_storage_errors_are_unclassified() {
        let err = DownloadError::from(StorageError::Stage(std::io::Error::other("disk gone")));
        assert!(!err.is_classified());
        assert_eq!(err.kind(), "StorageError");
    }
}
