use std::{
    collections::VecDeque,
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use warden_clock::DurationSecs;

use crate::{
    ClientConfig, GatewayError, GrantedTokens, OAuthGateway, PasswordDigest, PasswordDigestRef,
    RefreshToken, RefreshTokenRef, SubjectId,
};

pub(crate) fn granted(
    access_token: &str,
    refresh_token: &str,
    expires_in: u64,
    subject_id: Option<i64>,
) -> GrantedTokens {
    GrantedTokens {
        access_token: access_token.into(),
        refresh_token: refresh_token.into(),
        expires_in: DurationSecs(expires_in),
        subject_id: subject_id.map(SubjectId),
    }
}

/// A gateway that replays scripted outcomes and records what it was asked
#[derive(Clone, Debug, Default)]
pub(crate) struct StubGateway {
    inner: Arc<StubState>,
}

#[derive(Debug, Default)]
struct StubState {
    password_grants: AtomicUsize,
    refresh_grants: AtomicUsize,
    password_outcomes: Mutex<VecDeque<Result<GrantedTokens, GatewayError>>>,
    refresh_outcomes: Mutex<VecDeque<Result<GrantedTokens, GatewayError>>>,
    refresh_latency: Mutex<Option<Duration>>,
    last_password: Mutex<Option<(String, PasswordDigest)>>,
    last_refresh_token: Mutex<Option<RefreshToken>>,
}

impl StubGateway {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push_password(&self, outcome: Result<GrantedTokens, GatewayError>) -> &Self {
        self.inner
            .password_outcomes
            .lock()
            .unwrap()
            .push_back(outcome);
        self
    }

    pub(crate) fn push_refresh(&self, outcome: Result<GrantedTokens, GatewayError>) -> &Self {
        self.inner
            .refresh_outcomes
            .lock()
            .unwrap()
            .push_back(outcome);
        self
    }

    /// Makes every refresh grant take `latency` to answer
    pub(crate) fn with_refresh_latency(self, latency: Duration) -> Self {
        *self.inner.refresh_latency.lock().unwrap() = Some(latency);
        self
    }

    pub(crate) fn password_grants(&self) -> usize {
        self.inner.password_grants.load(Ordering::SeqCst)
    }

    pub(crate) fn refresh_grants(&self) -> usize {
        self.inner.refresh_grants.load(Ordering::SeqCst)
    }

    pub(crate) fn last_password(&self) -> Option<(String, PasswordDigest)> {
        self.inner.last_password.lock().unwrap().clone()
    }

    pub(crate) fn last_refresh_token(&self) -> Option<RefreshToken> {
        self.inner.last_refresh_token.lock().unwrap().clone()
    }

    fn unscripted() -> GatewayError {
        GatewayError::rejected("stub", "no scripted response")
    }
}

#[async_trait]
impl OAuthGateway for StubGateway {
    async fn password_grant(
        &self,
        _client: &ClientConfig,
        username: &str,
        password: &PasswordDigestRef,
    ) -> Result<GrantedTokens, GatewayError> {
        self.inner.password_grants.fetch_add(1, Ordering::SeqCst);
        *self.inner.last_password.lock().unwrap() =
            Some((username.to_owned(), password.to_owned()));

        let outcome = self.inner.password_outcomes.lock().unwrap().pop_front();
        outcome.unwrap_or_else(|| Err(Self::unscripted()))
    }

    async fn refresh_grant(
        &self,
        _client: &ClientConfig,
        refresh_token: &RefreshTokenRef,
    ) -> Result<GrantedTokens, GatewayError> {
        self.inner.refresh_grants.fetch_add(1, Ordering::SeqCst);
        *self.inner.last_refresh_token.lock().unwrap() = Some(refresh_token.to_owned());

        let latency = *self.inner.refresh_latency.lock().unwrap();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        let outcome = self.inner.refresh_outcomes.lock().unwrap().pop_front();
        outcome.unwrap_or_else(|| Err(Self::unscripted()))
    }
}
