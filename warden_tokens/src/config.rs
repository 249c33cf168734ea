//! Client credentials and manager tuning

use warden_clock::{Clock, DurationSecs, System};

use crate::{
    gateway::GrantedTokens, ClientId, ClientIdRef, ClientSecret, ClientSecretRef, SubjectId,
    TokenState,
};

/// Default time before expiry at which a proactive refresh is scheduled
pub const DEFAULT_REFRESH_MARGIN: DurationSecs = DurationSecs(300);

/// Default minimum delay before a proactive refresh fires
pub const DEFAULT_MIN_REFRESH_DELAY: DurationSecs = DurationSecs(60);

/// Default window before expiry inside which a token is renewed before use
pub const DEFAULT_EXPIRY_BUFFER: DurationSecs = DurationSecs(60);

/// Application credentials and the API endpoint they are valid for
///
/// A `ClientConfig` is never modified after construction. Reconfiguring a
/// [`TokenManager`](crate::TokenManager) replaces it wholesale.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientConfig {
    client_id: ClientId,
    client_secret: ClientSecret,
    base_url: String,
}

impl ClientConfig {
    /// Constructs a new client configuration
    pub fn new(
        client_id: impl Into<ClientId>,
        client_secret: impl Into<ClientSecret>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: client_secret.into(),
            base_url: base_url.into(),
        }
    }

    /// The application's client ID
    #[inline]
    pub fn client_id(&self) -> &ClientIdRef {
        &self.client_id
    }

    /// The application's client secret
    #[inline]
    pub fn client_secret(&self) -> &ClientSecretRef {
        &self.client_secret
    }

    /// The base URL of the platform's API
    #[inline]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Configuration for token freshness and refresh scheduling
///
/// * `refresh_margin`: a proactive refresh is scheduled this long before expiry.
/// * `min_refresh_delay`: a proactive refresh never fires sooner than this after a
///   token is installed, which avoids refresh storms for very short-lived tokens.
/// * `expiry_buffer`: a token this close to expiry is renewed before being handed
///   to a caller.
#[derive(Clone, Debug)]
pub struct ManagerConfig<C = System> {
    pub(crate) refresh_margin: DurationSecs,
    pub(crate) min_refresh_delay: DurationSecs,
    pub(crate) expiry_buffer: DurationSecs,
    pub(crate) clock: C,
}

impl Default for ManagerConfig {
    /// Default manager configuration
    ///
    /// Refreshes five minutes before expiry, but no sooner than one minute after
    /// a token is issued. Tokens within one minute of expiry are renewed before use.
    /// Uses the system clock.
    fn default() -> Self {
        Self {
            refresh_margin: DEFAULT_REFRESH_MARGIN,
            min_refresh_delay: DEFAULT_MIN_REFRESH_DELAY,
            expiry_buffer: DEFAULT_EXPIRY_BUFFER,
            clock: System,
        }
    }
}

impl<C> ManagerConfig<C> {
    /// Sets how long before expiry a proactive refresh is scheduled
    pub fn with_refresh_margin(mut self, refresh_margin: DurationSecs) -> Self {
        self.refresh_margin = refresh_margin;
        self
    }

    /// Sets the minimum delay before a proactive refresh fires
    pub fn with_min_refresh_delay(mut self, min_refresh_delay: DurationSecs) -> Self {
        self.min_refresh_delay = min_refresh_delay;
        self
    }

    /// Sets how close to expiry a token may get before it is renewed on use
    pub fn with_expiry_buffer(mut self, expiry_buffer: DurationSecs) -> Self {
        self.expiry_buffer = expiry_buffer;
        self
    }

    /// Sets a custom clock to be used
    ///
    /// Useful for testing purposes
    pub fn with_clock<D>(self, clock: D) -> ManagerConfig<D> {
        ManagerConfig {
            refresh_margin: self.refresh_margin,
            min_refresh_delay: self.min_refresh_delay,
            expiry_buffer: self.expiry_buffer,
            clock,
        }
    }

    /// The configured refresh margin
    pub fn refresh_margin(&self) -> DurationSecs {
        self.refresh_margin
    }

    /// The configured minimum refresh delay
    pub fn min_refresh_delay(&self) -> DurationSecs {
        self.min_refresh_delay
    }

    /// The configured expiry buffer
    pub fn expiry_buffer(&self) -> DurationSecs {
        self.expiry_buffer
    }
}

impl<C: Clock> ManagerConfig<C> {
    /// Stamps freshly granted tokens with lifetime information
    ///
    /// The lifetime is measured from the current time, which should be the
    /// moment the authority's response was received.
    pub fn create_token(&self, granted: GrantedTokens, subject_id: SubjectId) -> TokenState {
        let issued = self.clock.now();
        let expiry = issued + granted.expires_in;
        let stale = (expiry - self.expiry_buffer).max(issued);

        TokenState {
            access_token: granted.access_token.into_boxed_ref(),
            refresh_token: granted.refresh_token.into_boxed_ref(),
            subject_id,
            lifetime: granted.expires_in,
            issued,
            stale,
            expiry,
        }
    }
}
