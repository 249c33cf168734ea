//! DTOs for the platform's token endpoint

use serde::{Deserialize, Serialize};
use warden_clock::DurationSecs;

use crate::{
    ClientIdRef, ClientSecretRef, GatewayError, GrantedTokens, PasswordDigestRef,
    RefreshTokenRef, SubjectId,
};

/// Form body of a password grant
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct PasswordGrantRequest<'a> {
    pub client_id: &'a ClientIdRef,
    pub client_secret: &'a ClientSecretRef,
    pub username: &'a str,
    pub password: &'a PasswordDigestRef,
}

/// Form body of a refresh grant
#[derive(Debug, Serialize)]
pub(super) struct RefreshGrantRequest<'a> {
    #[serde(rename = "clientId")]
    pub client_id: &'a ClientIdRef,
    #[serde(rename = "clientSecret")]
    pub client_secret: &'a ClientSecretRef,
    pub grant_type: &'static str,
    pub refresh_token: &'a RefreshTokenRef,
}

/// Body returned by the token endpoint
///
/// The platform reports some failures with a success status and an `errcode`,
/// so every field is optional until the body has been checked for an error.
#[derive(Debug, Default, Deserialize)]
pub(super) struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub uid: Option<i64>,
    #[serde(default)]
    pub errcode: Option<i64>,
    #[serde(default)]
    pub errmsg: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

impl TokenResponse {
    /// The error reported in the body, if any
    pub fn rejection(&self) -> Option<GatewayError> {
        if let Some(code) = self.errcode.filter(|&c| c != 0) {
            let message = self.errmsg.clone().unwrap_or_default();
            return Some(GatewayError::rejected(code.to_string(), message));
        }

        self.error.as_ref().map(|code| {
            let message = self.error_description.clone().unwrap_or_default();
            GatewayError::rejected(code.clone(), message)
        })
    }

    /// Converts a successful body into granted tokens
    pub fn into_granted(self) -> Result<GrantedTokens, GatewayError> {
        let access_token = self
            .access_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| GatewayError::malformed("response is missing `access_token`"))?;
        let refresh_token = self
            .refresh_token
            .filter(|t| !t.is_empty())
            .ok_or_else(|| GatewayError::malformed("response is missing `refresh_token`"))?;
        let expires_in = self
            .expires_in
            .ok_or_else(|| GatewayError::malformed("response is missing `expires_in`"))?;

        Ok(GrantedTokens {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
            expires_in: DurationSecs(expires_in),
            subject_id: self.uid.map(SubjectId),
        })
    }
}
