use std::fmt;

use warden_clock::{Clock, DurationSecs, System, UnixTime};

use crate::{AccessTokenRef, RefreshTokenRef};

/// The identifier of the account a token pair was issued to
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubjectId(pub i64);

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// A fully-populated token pair with lifetime information
///
/// A value of this type only exists when every field is known; the absence of
/// tokens is represented by the absence of a `TokenState`.
#[derive(Debug)]
pub struct TokenState {
    pub(crate) access_token: Box<AccessTokenRef>,
    pub(crate) refresh_token: Box<RefreshTokenRef>,
    pub(crate) subject_id: SubjectId,
    pub(crate) lifetime: DurationSecs,
    pub(crate) issued: UnixTime,
    pub(crate) stale: UnixTime,
    pub(crate) expiry: UnixTime,
}

/// A token's lifecycle status
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TokenStatus {
    /// The token is fresh and valid
    Fresh,
    /// The token is valid, but is inside the expiry buffer and should be refreshed
    Stale,
    /// The token is no longer valid
    Expired,
}

impl TokenState {
    /// Gets the current access token
    #[inline]
    pub fn access_token(&self) -> &AccessTokenRef {
        &self.access_token
    }

    /// Gets the refresh token used to renew the access token
    #[inline]
    pub fn refresh_token(&self) -> &RefreshTokenRef {
        &self.refresh_token
    }

    /// Gets the identifier of the account the tokens were issued to
    #[inline]
    pub fn subject_id(&self) -> SubjectId {
        self.subject_id
    }

    /// Gets the token's lifetime as granted by the authority
    #[inline]
    pub fn lifetime(&self) -> DurationSecs {
        self.lifetime
    }

    /// Gets the time that the token response was received
    #[inline]
    pub fn issued(&self) -> UnixTime {
        self.issued
    }

    /// Gets the time that the token enters the expiry buffer
    #[inline]
    pub fn stale(&self) -> UnixTime {
        self.stale
    }

    /// Gets the time that the token will expire
    #[inline]
    pub fn expiry(&self) -> UnixTime {
        self.expiry
    }

    /// Gets the token's current lifetime status
    #[inline]
    pub fn token_status(&self) -> TokenStatus {
        self.token_status_with_clock(&System)
    }

    /// Gets the token's current lifetime status according to `clock`
    #[inline]
    pub fn token_status_with_clock<C: Clock>(&self, clock: &C) -> TokenStatus {
        self.token_status_at(clock.now())
    }

    /// Gets the token's lifetime status as of the provided time
    #[inline]
    pub fn token_status_at(&self, time: UnixTime) -> TokenStatus {
        if time < self.stale {
            TokenStatus::Fresh
        } else if time < self.expiry {
            TokenStatus::Stale
        } else {
            TokenStatus::Expired
        }
    }

    /// Whether the token can be handed out as of `time` without renewal
    #[inline]
    pub fn is_fresh_at(&self, time: UnixTime) -> bool {
        self.token_status_at(time) == TokenStatus::Fresh
    }

    /// Gets a duration for how much longer the token would be valid as of the
    /// provided time
    #[inline]
    pub fn until_expired_at(&self, time: UnixTime) -> DurationSecs {
        self.expiry - time
    }
}
