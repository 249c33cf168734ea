use std::{
    error, fmt,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use tokio::sync::{watch, Mutex};
use warden_clock::{Clock, System, UnixTime};

use crate::{
    gateway::OAuthGateway,
    scheduler::{RefreshScheduler, TimerId},
    AccessToken, ClientConfig, ClientId, ClientSecret, GatewayError, ManagerConfig,
    ManagerStatus, PasswordDigest, Session, SessionWatcher, SubjectId, TokenError, TokenState,
};


/// Holds the credentials and tokens for one application and keeps the tokens fresh
///
/// The manager is a cheaply cloneable handle; all clones share the same state.
/// Every state transition is serialized, so a refresh is never issued twice for
/// the same stale token, no matter how many callers ask for a token at once.
///
/// Once authenticated, the manager schedules a proactive refresh ahead of the
/// token's expiry. If that background refresh fails, the tokens are discarded
/// and callers are told they are no longer authenticated.
pub struct TokenManager<G, C = System> {
    shared: Arc<Shared<G, C>>,
}

struct Shared<G, C> {
    gateway: G,
    config: ManagerConfig<C>,
    published: watch::Sender<Arc<Session>>,
    completed_refreshes: AtomicU64,
    transitions: Mutex<Transitions>,
}

/// State only touched while the transition lock is held
struct Transitions {
    scheduler: RefreshScheduler,
    last_refresh_error: Option<GatewayError>,
}

/// What caused a refresh to be attempted
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Trigger {
    Manual,
    OnUse,
    Scheduled,
}

impl<G, C> Clone for TokenManager<G, C> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<G, C> fmt::Debug for TokenManager<G, C>
where
    G: fmt::Debug,
    C: fmt::Debug,
{
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.debug_struct("TokenManager")
            .field("gateway", &self.shared.gateway)
            .field("config", &self.shared.config)
            .field("session", &*self.shared.published.borrow())
            .finish()
    }
}

impl<G: OAuthGateway + 'static> TokenManager<G, System> {
    /// Constructs an unconfigured manager using the default configuration
    pub fn new(gateway: G) -> Self {
        Self::with_config(gateway, ManagerConfig::default())
    }
}

impl<G, C> TokenManager<G, C>
where
    G: OAuthGateway + 'static,
    C: Clock + Clone + Send + Sync + 'static,
{
    /// Constructs an unconfigured manager
    pub fn with_config(gateway: G, config: ManagerConfig<C>) -> Self {
        let scheduler = RefreshScheduler::new(config.refresh_margin, config.min_refresh_delay);
        let (published, _) = watch::channel(Arc::new(Session::empty()));

        Self {
            shared: Arc::new(Shared {
                gateway,
                config,
                published,
                completed_refreshes: AtomicU64::new(0),
                transitions: Mutex::new(Transitions {
                    scheduler,
                    last_refresh_error: None,
                }),
            }),
        }
    }

    /// Sets the application credentials
    ///
    /// Any tokens held for previous credentials are discarded.
    pub async fn configure(
        &self,
        client_id: impl Into<ClientId>,
        client_secret: impl Into<ClientSecret>,
        base_url: impl Into<String>,
    ) {
        let client = Arc::new(ClientConfig::new(client_id, client_secret, base_url));

        let mut transitions = self.shared.transitions.lock().await;
        transitions.scheduler.cancel();
        transitions.last_refresh_error = None;

        tracing::info!(
            client_id = %client.client_id(),
            base_url = client.base_url(),
            "client credentials configured"
        );
        self.publish(&mut transitions, Session::configured(client));
    }

    /// Obtains tokens for an account using its username and password
    ///
    /// On failure the manager's state is left unchanged.
    pub async fn authenticate(&self, username: &str, password: &str) -> Result<(), TokenError> {
        let mut transitions = self.shared.transitions.lock().await;
        let client = self
            .session()
            .client()
            .cloned()
            .ok_or(TokenError::NotConfigured)?;

        let digest = PasswordDigest::md5(password);

        tracing::debug!(username, "requesting tokens with password grant");
        let granted = self
            .shared
            .gateway
            .password_grant(&client, username, &digest)
            .await
            .map_err(|error| {
                tracing::warn!(
                    username,
                    error = (&error as &dyn error::Error),
                    "password grant failed"
                );
                error
            })?;

        let subject_id = granted.subject_id.ok_or_else(|| {
            GatewayError::malformed("password grant response did not identify the account")
        })?;

        let token = Arc::new(self.shared.config.create_token(granted, subject_id));
        tracing::info!(
            subject = %subject_id,
            lifetime = token.lifetime().0,
            expiry = token.expiry().0,
            "authenticated"
        );

        transitions.last_refresh_error = None;
        self.install(&mut transitions, client, token);
        Ok(())
    }

    /// Gets an access token that is safe to use right now
    ///
    /// A token inside its expiry buffer is refreshed before it is returned. If other
    /// callers are already waiting on that refresh, all of them share its outcome.
    pub async fn get_valid_token(&self) -> Result<AccessToken, TokenError> {
        let seen_refreshes = self.shared.completed_refreshes.load(Ordering::Acquire);
        {
            let session = self.session();
            let token = session.token().ok_or(TokenError::NotAuthenticated)?;
            if token.is_fresh_at(self.now()) {
                return Ok(token.access_token().to_owned());
            }
        }

        let mut transitions = self.shared.transitions.lock().await;

        let session = self.session();
        let token = session.token().ok_or(TokenError::NotAuthenticated)?;
        if token.is_fresh_at(self.now()) {
            tracing::trace!("token renewed while waiting");
            return Ok(token.access_token().to_owned());
        }

        if self.shared.completed_refreshes.load(Ordering::Acquire) != seen_refreshes {
            // A refresh finished while this caller waited; its outcome stands for
            // this caller too.
            return match &transitions.last_refresh_error {
                Some(error) => Err(error.clone().into()),
                None => Ok(token.access_token().to_owned()),
            };
        }

        tracing::debug!(
            status = ?token.token_status_at(self.now()),
            expiry = token.expiry().0,
            "token needs renewal before use"
        );
        let token = self.refresh_locked(&mut transitions, Trigger::OnUse).await?;
        Ok(token.access_token().to_owned())
    }

    /// Refreshes the tokens now, regardless of how long they remain valid
    ///
    /// If the refresh fails, the tokens already held are kept.
    pub async fn refresh(&self) -> Result<(), TokenError> {
        let mut transitions = self.shared.transitions.lock().await;
        self.refresh_locked(&mut transitions, Trigger::Manual)
            .await
            .map(drop)
    }

    /// The manager's current status
    pub fn status(&self) -> ManagerStatus {
        self.shared.published.borrow().status()
    }

    /// The configured client credentials
    pub fn get_client_config(&self) -> Result<Arc<ClientConfig>, TokenError> {
        self.session()
            .client()
            .cloned()
            .ok_or(TokenError::NotConfigured)
    }

    /// The account the current tokens were issued to
    pub fn get_subject_id(&self) -> Result<SubjectId, TokenError> {
        self.session()
            .token()
            .map(|t| t.subject_id())
            .ok_or(TokenError::NotAuthenticated)
    }

    /// Cancels any scheduled refresh and forgets all credentials and tokens
    pub async fn reset(&self) {
        let mut transitions = self.shared.transitions.lock().await;
        transitions.scheduler.cancel();
        transitions.last_refresh_error = None;

        tracing::info!("token manager reset");
        self.publish(&mut transitions, Session::empty());
    }

    /// A snapshot of the current credentials and tokens
    pub fn session(&self) -> Arc<Session> {
        self.shared.published.borrow().clone()
    }

    /// Subscribes to session transitions
    pub fn watch(&self) -> SessionWatcher {
        SessionWatcher::new(self.shared.published.subscribe())
    }

    /// When the pending proactive refresh is due, if one is scheduled
    pub async fn next_scheduled_refresh(&self) -> Option<UnixTime> {
        self.shared.transitions.lock().await.scheduler.due()
    }

    fn now(&self) -> UnixTime {
        self.shared.config.clock.now()
    }

    /// The only writer of the published session
    ///
    /// Requiring the transition guard ensures sessions are only replaced while
    /// transitions are serialized.
    fn publish(&self, _transitions: &mut Transitions, session: Session) {
        self.shared.published.send_replace(Arc::new(session));
    }

    /// Installs a new token and schedules its proactive refresh
    fn install(
        &self,
        transitions: &mut Transitions,
        client: Arc<ClientConfig>,
        token: Arc<TokenState>,
    ) {
        transitions.scheduler.cancel();
        let expiry = token.expiry();
        self.publish(transitions, Session::authenticated(client, token));

        let weak = Arc::downgrade(&self.shared);
        let clock = self.shared.config.clock.clone();
        transitions.scheduler.arm(clock, expiry, move |timer| async move {
            match weak.upgrade() {
                Some(shared) => TokenManager { shared }.scheduled_refresh(timer).await,
                None => tracing::trace!("token manager dropped before refresh came due"),
            }
        });
    }

    async fn scheduled_refresh(&self, timer: TimerId) {
        let mut transitions = self.shared.transitions.lock().await;
        if !transitions.scheduler.claim(timer) {
            tracing::trace!(timer, "superseded refresh timer fired, ignoring");
            return;
        }

        // A failure has already discarded the tokens and been logged
        self.refresh_locked(&mut transitions, Trigger::Scheduled)
            .await
            .ok();
    }

    /// Performs a refresh and settles its outcome
    ///
    /// `completed_refreshes` is only advanced once the outcome is final, so a
    /// caller that observes the new count also observes the outcome.
    async fn refresh_locked(
        &self,
        transitions: &mut Transitions,
        trigger: Trigger,
    ) -> Result<Arc<TokenState>, TokenError> {
        let session = self.session();
        let client = session.client().cloned().ok_or(TokenError::NotConfigured)?;
        let current = session.token().cloned().ok_or(TokenError::NotAuthenticated)?;

        tracing::debug!(?trigger, expiry = current.expiry().0, "refreshing token");
        let outcome = self
            .shared
            .gateway
            .refresh_grant(&client, current.refresh_token())
            .await;

        let settled = match outcome {
            Ok(granted) => {
                let subject_id = granted.subject_id.unwrap_or(current.subject_id());
                let token = Arc::new(self.shared.config.create_token(granted, subject_id));
                tracing::info!(
                    ?trigger,
                    lifetime = token.lifetime().0,
                    stale = token.stale().0,
                    expiry = token.expiry().0,
                    "received new tokens"
                );

                transitions.last_refresh_error = None;
                self.install(transitions, client, token.clone());
                Ok(token)
            }
            Err(error) if trigger == Trigger::Scheduled => {
                tracing::warn!(
                    error = (&error as &dyn error::Error),
                    "scheduled token refresh failed, discarding tokens"
                );
                transitions.last_refresh_error = Some(error.clone());
                self.publish(transitions, Session::configured(client));
                Err(error.into())
            }
            Err(error) => {
                tracing::warn!(
                    ?trigger,
                    error = (&error as &dyn error::Error),
                    "token refresh failed, keeping current tokens"
                );
                transitions.last_refresh_error = Some(error.clone());
                Err(error.into())
            }
        };

        self.shared.completed_refreshes.fetch_add(1, Ordering::Release);
        settled
    }
}
