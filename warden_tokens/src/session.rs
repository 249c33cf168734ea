use std::sync::Arc;

use crate::{ClientConfig, TokenState};

/// The lifecycle status of a [`TokenManager`](crate::TokenManager)
///
/// Derived entirely from whether client credentials and tokens are present.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ManagerStatus {
    /// No client credentials have been configured
    NotConfigured,
    /// Client credentials are configured, but no tokens are held
    Configured,
    /// Client credentials are configured and tokens are held
    Authenticated,
}

/// A consistent snapshot of a manager's credentials and tokens
///
/// Snapshots are immutable; every state transition publishes a new one.
#[derive(Clone, Debug)]
pub struct Session {
    client: Option<Arc<ClientConfig>>,
    token: Option<Arc<TokenState>>,
}

impl Session {
    /// A session holding no credentials or tokens
    pub(crate) const fn empty() -> Self {
        Self {
            client: None,
            token: None,
        }
    }

    /// A session holding credentials, but no tokens
    pub(crate) fn configured(client: Arc<ClientConfig>) -> Self {
        Self {
            client: Some(client),
            token: None,
        }
    }

    /// A session holding both credentials and the tokens issued for them
    pub(crate) fn authenticated(client: Arc<ClientConfig>, token: Arc<TokenState>) -> Self {
        Self {
            client: Some(client),
            token: Some(token),
        }
    }

    /// The configured client credentials, if any
    #[inline]
    pub fn client(&self) -> Option<&Arc<ClientConfig>> {
        self.client.as_ref()
    }

    /// The current tokens, if any
    #[inline]
    pub fn token(&self) -> Option<&Arc<TokenState>> {
        self.token.as_ref()
    }

    /// The status implied by this snapshot
    pub fn status(&self) -> ManagerStatus {
        match (&self.client, &self.token) {
            (None, _) => ManagerStatus::NotConfigured,
            (Some(_), None) => ManagerStatus::Configured,
            (Some(_), Some(_)) => ManagerStatus::Authenticated,
        }
    }
}
