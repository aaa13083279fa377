use reqwest::StatusCode;
use thiserror::Error;

/// Failure of a single page request, classified for the paginator.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network fault, throttling (429), 5xx or unreadable body. Retried on the same offset.
    #[error("transient fetch failure: {0}")]
    Transient(String),
    /// Any other non-success HTTP status. Ends pagination with whatever was collected.
    #[error("terminal HTTP status {0}")]
    Terminal(StatusCode),
}

impl FetchError {
    /// Classify a non-success status: only 429 and 5xx are retryable.
    pub fn from_status(status: StatusCode) -> Self {
        if status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error() {
            FetchError::Transient(format!("HTTP status {status}"))
        } else {
            FetchError::Terminal(status)
        }
    }
}

/// A raw item that cannot be turned into a canonical product.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("malformed record: field `{field}` {reason}")]
pub struct MalformedRecordError {
    pub field: &'static str,
    pub reason: String,
}

#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("store unavailable: {0}")]
    Unavailable(#[source] sqlx::Error),
    #[error("batch write rejected: {0}")]
    Rejected(#[source] sqlx::Error),
    #[error("invalid table name `{0}`")]
    InvalidTable(String),
}

impl PersistenceError {
    /// Pool/connection level errors mean the store could not be reached at all.
    pub fn from_sqlx(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::Io(_)
            | sqlx::Error::Tls(_) => PersistenceError::Unavailable(err),
            other => PersistenceError::Rejected(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn throttling_and_server_errors_are_transient() {
        assert!(matches!(
            FetchError::from_status(StatusCode::TOO_MANY_REQUESTS),
            FetchError::Transient(_)
        ));
        assert!(matches!(
            FetchError::from_status(StatusCode::BAD_GATEWAY),
            FetchError::Transient(_)
        ));
    }

    #[test]
    fn other_client_errors_are_terminal() {
        for status in [StatusCode::NOT_FOUND, StatusCode::FORBIDDEN, StatusCode::GONE] {
            match FetchError::from_status(status) {
                FetchError::Terminal(s) => assert_eq!(s, status),
                other => panic!("expected terminal for {status}, got {other:?}"),
            }
        }
    }

    #[test]
    fn unfollowed_redirects_and_informational_are_terminal() {
        for status in [
            StatusCode::MOVED_PERMANENTLY,
            StatusCode::NOT_MODIFIED,
            StatusCode::CONTINUE,
        ] {
            match FetchError::from_status(status) {
                FetchError::Terminal(s) => assert_eq!(s, status),
                other => panic!("expected terminal for {status}, got {other:?}"),
            }
        }
    }

    #[test]
    fn pool_timeouts_map_to_unavailable() {
        assert!(matches!(
            PersistenceError::from_sqlx(sqlx::Error::PoolTimedOut),
            PersistenceError::Unavailable(_)
        ));
        assert!(matches!(
            PersistenceError::from_sqlx(sqlx::Error::RowNotFound),
            PersistenceError::Rejected(_)
        ));
    }

    #[test]
    fn dropped_connection_mid_write_is_unavailable() {
        let reset = std::io::Error::new(std::io::ErrorKind::ConnectionReset, "reset by peer");
        assert!(matches!(
            PersistenceError::from_sqlx(sqlx::Error::Io(reset)),
            PersistenceError::Unavailable(_)
        ));
        assert!(matches!(
            PersistenceError::from_sqlx(sqlx::Error::Protocol("relation does not exist".into())),
            PersistenceError::Rejected(_)
        ));
    }
}
