//! Error taxonomy.
//!
//! Callers branch on kinds, not strings: the credential resolver treats
//! [`ApiError::is_auth_failure`] as "try the next source" and everything
//! else as fatal. Typed operations wrap transport failures in
//! [`ApiError::Call`] with a short human-readable context; the original
//! cause stays attached as the error source.

use thiserror::Error;

use crate::rpc::ApiErrorBody;

/// Classification of a server-reported error, derived from the error
/// message the way the server actually phrases it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiErrorKind {
    TokenExpired,
    SessionExpired,
    NotAuthorized,
    Other,
}

impl ApiErrorKind {
    /// Map a (redacted) server error message to a kind.
    pub fn classify(message: &str) -> Self {
        let lower = message.to_lowercase();
        if lower.contains("api token expired") {
            ApiErrorKind::TokenExpired
        } else if lower.contains("re-login") {
            ApiErrorKind::SessionExpired
        } else if lower.contains("not authorized") {
            ApiErrorKind::NotAuthorized
        } else {
            ApiErrorKind::Other
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    /// The server answered with a JSON-RPC error object (or an empty body).
    /// The message has already been redacted.
    #[error("{message}")]
    Request {
        kind: ApiErrorKind,
        message: String,
        error: Option<ApiErrorBody>,
    },

    /// The response body was not valid JSON-RPC. Carries the byte length of
    /// the body, never the body itself.
    #[error("malformed API response ({body_len} bytes)")]
    ResponseParsing {
        body_len: usize,
        #[source]
        source: serde_json::Error,
    },

    /// HTTP-level failure: connect, timeout, TLS, non-2xx status.
    #[error("request failed")]
    Transport(#[from] reqwest::Error),

    #[error("failed to log in to Zabbix: {0}")]
    Login(String),

    #[error("failed to log out of Zabbix")]
    Logout(#[source] Box<ApiError>),

    /// A typed operation failed; `context` names the operation in operator
    /// terms ("Failed to create host group \"Siteops\"").
    #[error("{context}")]
    Call {
        context: String,
        #[source]
        source: Box<ApiError>,
    },

    #[error("{0} not found")]
    NotFound(String),

    #[error("invalid version reported by apiinfo.version")]
    InvalidVersion(#[from] zbx_version::VersionParseError),

    #[error("{0}")]
    UnsupportedVersion(String),

    #[error("operation cancelled")]
    Cancelled,
}

impl ApiError {
    pub fn call(context: impl Into<String>, source: ApiError) -> Self {
        ApiError::Call {
            context: context.into(),
            source: Box::new(source),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        ApiError::NotFound(what.into())
    }

    pub(crate) fn request_other(message: impl Into<String>) -> Self {
        ApiError::Request {
            kind: ApiErrorKind::Other,
            message: message.into(),
            error: None,
        }
    }

    pub(crate) fn empty_response() -> Self {
        ApiError::request_other("received empty response")
    }

    /// The server-reported kind, looking through `Call`/`Logout` wrapping.
    pub fn kind(&self) -> Option<ApiErrorKind> {
        match self {
            ApiError::Request { kind, .. } => Some(*kind),
            ApiError::Call { source, .. } | ApiError::Logout(source) => source.kind(),
            _ => None,
        }
    }

    /// Whether this failure means "this credential is no good" rather than
    /// "the server is unreachable". The resolver continues past the former
    /// and aborts on the latter.
    pub fn is_auth_failure(&self) -> bool {
        match self {
            ApiError::Login(_) => true,
            ApiError::Request { kind, .. } => !matches!(kind, ApiErrorKind::Other),
            ApiError::Call { source, .. } => source.is_auth_failure(),
            _ => false,
        }
    }
}

/// Workspace-level error for front-ends that drive the whole stack.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] zbx_config::ConfigError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    SessionFile(#[from] zbx_auth::SessionFileError),
    #[error(transparent)]
    Export(#[from] crate::export::ExportError),
    #[error(transparent)]
    Import(#[from] crate::import::ImportError),
    #[error("no credential accepted by the server ({tried} source(s) tried)")]
    CredentialsExhausted { tried: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classify_matches_server_phrasing() {
        assert_eq!(
            ApiErrorKind::classify("Error: API token expired. No data"),
            ApiErrorKind::TokenExpired
        );
        assert_eq!(
            ApiErrorKind::classify("Session terminated, re-login, please."),
            ApiErrorKind::SessionExpired
        );
        assert_eq!(
            ApiErrorKind::classify("Not authorized."),
            ApiErrorKind::NotAuthorized
        );
        assert_eq!(
            ApiErrorKind::classify("Invalid params."),
            ApiErrorKind::Other
        );
    }

    #[test]
    fn classify_is_case_insensitive() {
        assert_eq!(
            ApiErrorKind::classify("NOT AUTHORIZED"),
            ApiErrorKind::NotAuthorized
        );
        assert_eq!(
            ApiErrorKind::classify("Api Token Expired"),
            ApiErrorKind::TokenExpired
        );
    }

    #[test]
    fn auth_failure_looks_through_call_wrapping() {
        let inner = ApiError::Request {
            kind: ApiErrorKind::SessionExpired,
            message: "re-login".to_string(),
            error: None,
        };
        let wrapped = ApiError::call("Failed to fetch hosts", inner);
        assert!(wrapped.is_auth_failure());
        assert_eq!(wrapped.kind(), Some(ApiErrorKind::SessionExpired));
    }

    #[test]
    fn other_request_errors_are_not_auth_failures() {
        let err = ApiError::request_other("Invalid params.");
        assert!(!err.is_auth_failure());

        let cancelled = ApiError::Cancelled;
        assert!(!cancelled.is_auth_failure());
    }

    #[test]
    fn login_failure_is_an_auth_failure() {
        assert!(ApiError::Login("bad password".to_string()).is_auth_failure());
    }
}
