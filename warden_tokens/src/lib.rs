//! Concurrent lifecycle management for OAuth2 access tokens
//!
//! This library keeps the access token of a single application fresh on behalf of any
//! number of concurrent callers. Tokens are obtained with a password grant and renewed
//! with a refresh grant against the platform's token endpoint.
//!
//! The [`TokenManager`] is the single owner of the credentials and tokens. It:
//!
//! * hands out the current access token without touching the network while the token is
//!   fresh,
//! * renews a token that has entered its expiry buffer before handing it out, issuing
//!   only one refresh no matter how many callers are waiting on it,
//! * schedules a proactive refresh ahead of expiry, so that in steady state callers never
//!   wait on the network at all, and
//! * discards tokens it could not renew in the background, so that the next caller is
//!   told to re-authenticate rather than being handed a token about to be rejected.
//!
//! The network exchanges themselves are delegated to an [`OAuthGateway`]. The `http`
//! feature provides [`HttpGateway`](gateway::HttpGateway), which talks to the platform's
//! `/oauth2/token` endpoint.
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use warden_tokens::{gateway::HttpGateway, ManagerStatus, TokenManager};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//! let gateway = HttpGateway::with_timeout(Duration::from_secs(10));
//! let manager = TokenManager::new(gateway);
//!
//! manager
//!     .configure("client-id", "client-secret", "https://api.example.com")
//!     .await;
//! manager.authenticate("someone@example.com", "hunter2").await?;
//! assert_eq!(manager.status(), ManagerStatus::Authenticated);
//!
//! let token = manager.get_valid_token().await?;
//! tracing::info!(token = format_args!("{:#?}", token), "current access token");
//! # Ok(())
//! # }
//! ```
//!
//! # Features
//!
//! * `http` (default): Provides [`HttpGateway`](gateway::HttpGateway), a gateway based on
//!   [reqwest](https://docs.rs/reqwest).

#![cfg_attr(docsrs, feature(doc_cfg))]
#![warn(
    missing_docs,
    unused_import_braces,
    unused_imports,
    unused_qualifications
)]
#![deny(
    missing_debug_implementations,
    trivial_numeric_casts,
    unsafe_code,
    unused_must_use
)]

mod braids;
pub mod config;
mod digest;
mod error;
pub mod gateway;
mod manager;
mod scheduler;
mod session;
mod tokens;
mod watcher;

#[cfg(test)]
mod test_util;

pub use braids::*;
pub use config::{ClientConfig, ManagerConfig};
pub use error::{GatewayError, TokenError};
pub use gateway::{GrantedTokens, OAuthGateway};
pub use manager::TokenManager;
pub use session::{ManagerStatus, Session};
pub use tokens::{SubjectId, TokenState, TokenStatus};
pub use watcher::{BorrowedSession, ManagerDropped, SessionWatcher};
