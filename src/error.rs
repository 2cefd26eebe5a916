//! Error taxonomy of the data-access layer.
use std::sync::Arc;

use thiserror::Error;

/// The persistence layer is unreachable or rejected an operation.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Db(#[from] sea_orm::DbErr),

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

/// An external provider failed to produce a usable response.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("request to {url} failed: {source}")]
    Transport {
        url:    String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{url} responded with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("malformed response from {url}: {reason}")]
    Malformed { url: String, reason: String },
}

impl UpstreamError {
    pub fn malformed<U: ToString, R: ToString>(url: U, reason: R) -> Self {
        Self::Malformed {
            url:    url.to_string(),
            reason: reason.to_string(),
        }
    }
}

/// Failure of a single [`Cache::get_or_refresh()`](crate::Cache::get_or_refresh) call.
#[derive(Debug, Error)]
pub enum CacheError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Upstream(#[from] UpstreamError),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("no token provided")]
    MissingCredential,

    #[error("token is not valid: {0}")]
    InvalidCredential(String),
}

/// What a request handler reports to the routing layer.
#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("{context}: {source}")]
    Cache {
        context: String,
        #[source]
        source:  Arc<CacheError>,
    },

    #[error("{context}: {source}")]
    Upstream {
        context: String,
        #[source]
        source:  UpstreamError,
    },

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),
}

impl ServiceError {
    pub fn cache<S: ToString>(context: S) -> impl FnOnce(Arc<CacheError>) -> Self {
        move |source| Self::Cache {
            context: context.to_string(),
            source,
        }
    }

    pub fn upstream<S: ToString>(context: S) -> impl FnOnce(UpstreamError) -> Self {
        move |source| Self::Upstream {
            context: context.to_string(),
            source,
        }
    }

    pub fn bad_request<S: ToString>(msg: S) -> Self {
        Self::BadRequest(msg.to_string())
    }

    pub fn not_found<S: ToString>(msg: S) -> Self {
        Self::NotFound(msg.to_string())
    }

    /// HTTP status the routing layer is expected to respond with.
    pub fn status(&self) -> u16 {
        match self {
            Self::BadRequest(_) => 400,
            Self::Auth(AuthError::MissingCredential) => 401,
            Self::Auth(AuthError::InvalidCredential(_)) => 403,
            Self::NotFound(_) => 404,
            Self::Cache { .. } | Self::Upstream { .. } | Self::Storage(_) => 500,
        }
    }

    /// Message safe to show to the user. Internal failures never leak their details.
    pub fn user_message(&self) -> String {
        match self {
            Self::Cache { context, .. } | Self::Upstream { context, .. } => context.clone(),
            Self::Storage(_) => "Internal server error".to_string(),
            Self::Auth(AuthError::MissingCredential) => "No token provided.".to_string(),
            Self::Auth(AuthError::InvalidCredential(_)) => "Token is not valid.".to_string(),
            Self::BadRequest(msg) | Self::NotFound(msg) => msg.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        assert_eq!(ServiceError::bad_request("nope").status(), 400);
        assert_eq!(ServiceError::from(AuthError::MissingCredential).status(), 401);
        assert_eq!(
            ServiceError::from(AuthError::InvalidCredential("bad signature".into())).status(),
            403
        );
        assert_eq!(ServiceError::not_found("Bookmark not found.").status(), 404);
        let err = ServiceError::cache("Failed to fetch global data.")(Arc::new(CacheError::from(
            UpstreamError::Status {
                url:    "https://example.test/global".into(),
                status: 429,
            },
        )));
        assert_eq!(err.status(), 500);
        assert_eq!(err.user_message(), "Failed to fetch global data.");
    }

    #[test]
    fn storage_details_stay_internal() {
        let err = ServiceError::from(StorageError::Unavailable("connection refused".into()));
        assert_eq!(err.user_message(), "Internal server error");
        assert!(err.to_string().contains("connection refused"));
    }
}
