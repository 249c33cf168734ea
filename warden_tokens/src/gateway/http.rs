//! A gateway that talks to the platform's token endpoint over HTTP

use std::time::Duration;

use async_trait::async_trait;

use super::OAuthGateway;
use crate::{ClientConfig, GatewayError, GrantedTokens, PasswordDigestRef, RefreshTokenRef};

mod dto;

/// How long a token request may take before it is abandoned
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

const TOKEN_PATH: &str = "oauth2/token";

/// Obtains tokens from `{base_url}/oauth2/token` with form-encoded requests
///
/// Every request is abandoned after the gateway's request timeout,
/// [`DEFAULT_REQUEST_TIMEOUT`] unless configured otherwise.
#[derive(Clone, Debug)]
pub struct HttpGateway {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpGateway {
    /// Constructs a gateway around an existing client
    pub fn new(client: reqwest::Client) -> Self {
        Self {
            client,
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Constructs a gateway whose requests give up after `timeout`
    pub fn with_timeout(timeout: Duration) -> Self {
        Self::default().request_timeout(timeout)
    }

    /// Sets how long a token request may take before it is abandoned
    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// How long a token request may take before it is abandoned
    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl Default for HttpGateway {
    fn default() -> Self {
        Self::new(reqwest::Client::new())
    }
}

#[async_trait]
impl OAuthGateway for HttpGateway {
    async fn password_grant(
        &self,
        client: &ClientConfig,
        username: &str,
        password: &PasswordDigestRef,
    ) -> Result<GrantedTokens, GatewayError> {
        let form = dto::PasswordGrantRequest {
            client_id: client.client_id(),
            client_secret: client.client_secret(),
            username,
            password,
        };

        request_token(&self.client, self.timeout, client, "password", &form).await
    }

    async fn refresh_grant(
        &self,
        client: &ClientConfig,
        refresh_token: &RefreshTokenRef,
    ) -> Result<GrantedTokens, GatewayError> {
        let form = dto::RefreshGrantRequest {
            client_id: client.client_id(),
            client_secret: client.client_secret(),
            grant_type: "refresh_token",
            refresh_token,
        };

        request_token(&self.client, self.timeout, client, "refresh_token", &form).await
    }
}

fn token_url(base_url: &str) -> Result<reqwest::Url, GatewayError> {
    let raw = format!("{}/{}", base_url.trim_end_matches('/'), TOKEN_PATH);
    reqwest::Url::parse(&raw).map_err(GatewayError::transport)
}

#[tracing::instrument(
    err,
    skip(http, client, form),
    fields(
        base_url = client.base_url(),
        client_id = %client.client_id(),
    ),
)]
async fn request_token<F: serde::Serialize>(
    http: &reqwest::Client,
    timeout: Duration,
    client: &ClientConfig,
    grant_type: &'static str,
    form: &F,
) -> Result<GrantedTokens, GatewayError> {
    let url = token_url(client.base_url())?;

    tracing::trace!("requesting token from authority");
    let resp = http
        .post(url)
        .timeout(timeout)
        .form(form)
        .send()
        .await
        .map_err(GatewayError::transport)?;

    let status = resp.status();
    tracing::debug!(
        response.status = status.as_u16(),
        "received token response from issuing authority"
    );

    let body = resp.bytes().await.map_err(GatewayError::transport)?;
    let parsed = serde_json::from_slice::<dto::TokenResponse>(&body);

    if !status.is_success() {
        let rejection = parsed.ok().and_then(|r| r.rejection());
        return Err(rejection.unwrap_or_else(|| {
            GatewayError::rejected(
                status.as_u16().to_string(),
                String::from_utf8_lossy(&body).into_owned(),
            )
        }));
    }

    let parsed = parsed.map_err(|error| {
        GatewayError::malformed(format!("token response is not valid JSON: {}", error))
    })?;

    if let Some(rejection) = parsed.rejection() {
        return Err(rejection);
    }

    let granted = parsed.into_granted()?;
    tracing::debug!(
        lifetime = granted.expires_in.0,
        has_subject = granted.subject_id.is_some(),
        "authority granted tokens"
    );

    Ok(granted)
}
