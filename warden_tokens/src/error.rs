//! Errors reported by the token manager and its gateway

use std::{error, sync::Arc};

use thiserror::Error;

/// A failure reported while requesting tokens from the authority
///
/// Errors are cheaply cloneable so that the outcome of a single refresh can be
/// handed to every caller that was waiting on it.
#[derive(Clone, Debug, Error)]
pub enum GatewayError {
    /// The authority answered with a structured error body
    #[error("authority rejected the request ({code}): {message}")]
    RemoteRejected {
        /// The authority's error code
        code: String,
        /// The authority's description of the error
        message: String,
    },
    /// The request could not be completed, timed out, or the connection failed
    #[error("unable to communicate with the authority")]
    TransportFailure {
        /// The underlying transport error
        #[source]
        cause: Arc<dyn error::Error + Send + Sync + 'static>,
    },
    /// The authority reported success but the body could not be understood
    #[error("malformed response from the authority: {detail}")]
    MalformedResponse {
        /// What was wrong with the response
        detail: String,
    },
}

impl GatewayError {
    /// Constructs a rejection from the authority's error code and message
    pub fn rejected(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::RemoteRejected {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Wraps a transport-level failure
    pub fn transport(cause: impl error::Error + Send + Sync + 'static) -> Self {
        Self::TransportFailure {
            cause: Arc::new(cause),
        }
    }

    /// Constructs an error for a response body that could not be used
    pub fn malformed(detail: impl Into<String>) -> Self {
        Self::MalformedResponse {
            detail: detail.into(),
        }
    }

    /// Whether retrying the same request later might succeed
    ///
    /// Rejections and malformed responses are not expected to change on retry.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransportFailure { .. })
    }
}

/// An error returned by the [`TokenManager`](crate::TokenManager)
#[derive(Clone, Debug, Error)]
pub enum TokenError {
    /// The operation requires client credentials, but none have been configured
    #[error("no client credentials have been configured")]
    NotConfigured,
    /// The operation requires tokens, but the manager is not authenticated
    #[error("not authenticated")]
    NotAuthenticated,
    /// The authority could not provide tokens
    #[error("error obtaining tokens from the authority")]
    Authority(#[from] GatewayError),
}

impl TokenError {
    /// Whether the caller must (re-)authenticate before tokens can be obtained again
    ///
    /// This is true when no tokens are held, and also when the authority rejected the
    /// request outright, which usually means the refresh token is no longer honored.
    pub fn requires_authentication(&self) -> bool {
        match self {
            Self::NotAuthenticated => true,
            Self::Authority(GatewayError::RemoteRejected { .. }) => true,
            Self::NotConfigured | Self::Authority(_) => false,
        }
    }

    /// The underlying gateway error, if the authority was involved
    pub fn gateway_error(&self) -> Option<&GatewayError> {
        match self {
            Self::Authority(error) => Some(error),
            _ => None,
        }
    }
}
