//! The authority that issues tokens

use async_trait::async_trait;
use warden_clock::DurationSecs;

use crate::{
    AccessToken, ClientConfig, GatewayError, PasswordDigestRef, RefreshToken, RefreshTokenRef,
    SubjectId,
};

#[cfg(feature = "http")]
#[cfg_attr(docsrs, doc(cfg(feature = "http")))]
pub mod http;

#[cfg(feature = "http")]
pub use http::HttpGateway;

/// Tokens granted by the authority
#[derive(Clone, Debug)]
pub struct GrantedTokens {
    /// The new access token
    pub access_token: AccessToken,

    /// The new refresh token
    pub refresh_token: RefreshToken,

    /// How long the access token is valid for, from the time of the response
    pub expires_in: DurationSecs,

    /// The account the tokens were issued to
    ///
    /// Always present for password grants, but may be omitted on refresh.
    pub subject_id: Option<SubjectId>,
}

/// Performs the network exchanges needed to obtain tokens
///
/// Implementations only return data; the [`TokenManager`](crate::TokenManager)
/// decides what to do with it.
#[async_trait]
pub trait OAuthGateway: Send + Sync {
    /// Exchanges account credentials for a new token pair
    async fn password_grant(
        &self,
        client: &ClientConfig,
        username: &str,
        password: &PasswordDigestRef,
    ) -> Result<GrantedTokens, GatewayError>;

    /// Exchanges a refresh token for a new token pair
    async fn refresh_grant(
        &self,
        client: &ClientConfig,
        refresh_token: &RefreshTokenRef,
    ) -> Result<GrantedTokens, GatewayError>;
}
