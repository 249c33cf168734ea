use std::future::Future;

use tokio::task::JoinHandle;
use warden_clock::{Clock, DurationSecs, UnixTime};

/// Identifies one arming of the refresh timer
pub(crate) type TimerId = u64;

/// Owns the single pending proactive-refresh timer of a manager
///
/// Arming always cancels whatever timer was previously pending, so at most
/// one timer is ever live.
#[derive(Debug)]
pub(crate) struct RefreshScheduler {
    refresh_margin: DurationSecs,
    min_delay: DurationSecs,
    next_id: TimerId,
    armed: Option<ArmedTimer>,
}

#[derive(Debug)]
struct ArmedTimer {
    id: TimerId,
    due: UnixTime,
    handle: JoinHandle<()>,
}

impl RefreshScheduler {
    pub(crate) fn new(refresh_margin: DurationSecs, min_delay: DurationSecs) -> Self {
        Self {
            refresh_margin,
            min_delay,
            next_id: 0,
            armed: None,
        }
    }

    /// When a token expiring at `expiry` should be proactively refreshed
    pub(crate) fn refresh_due(&self, now: UnixTime, expiry: UnixTime) -> UnixTime {
        (expiry - self.refresh_margin).max(now + self.min_delay)
    }

    /// Replaces any pending timer with one that runs `on_due` once the refresh
    /// for a token expiring at `expiry` comes due
    pub(crate) fn arm<C, F, Fut>(&mut self, clock: C, expiry: UnixTime, on_due: F) -> UnixTime
    where
        C: Clock + Send + Sync + 'static,
        F: FnOnce(TimerId) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.cancel();

        let id = self.next_id;
        self.next_id += 1;

        let due = self.refresh_due(clock.now(), expiry);
        tracing::debug!(
            timer = id,
            due = due.0,
            expiry = expiry.0,
            "scheduling proactive token refresh"
        );

        let handle = tokio::spawn(async move {
            sleep_until(&clock, due).await;
            on_due(id).await;
        });

        self.armed = Some(ArmedTimer { id, due, handle });
        due
    }

    /// Aborts the pending timer, if any
    pub(crate) fn cancel(&mut self) -> bool {
        if let Some(timer) = self.armed.take() {
            tracing::trace!(timer = timer.id, "cancelling scheduled refresh");
            timer.handle.abort();
            true
        } else {
            false
        }
    }

    /// Called by a timer that has fired
    ///
    /// Returns `true` if `id` is still the pending timer, in which case it is
    /// disarmed without being aborted. A `false` return means the timer was
    /// superseded and must not act.
    pub(crate) fn claim(&mut self, id: TimerId) -> bool {
        match &self.armed {
            Some(timer) if timer.id == id => {
                self.armed = None;
                true
            }
            _ => false,
        }
    }

    pub(crate) fn due(&self) -> Option<UnixTime> {
        self.armed.as_ref().map(|t| t.due)
    }
}

impl Drop for RefreshScheduler {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Sleeps until `clock` reports a time at or after `due`
///
/// The runtime's timer does not advance while the host is suspended, so rather
/// than sleeping for the whole interval, the clock is re-checked at least every
/// heartbeat. A host waking after `due` will notice within one heartbeat.
async fn sleep_until<C: Clock>(clock: &C, due: UnixTime) {
    const HEARTBEAT: DurationSecs = DurationSecs(30);
    loop {
        let now = clock.now();
        if now >= due {
            tracing::trace!("refresh now due");
            return;
        }

        let until_due = due - now;
        let delay = until_due.min(HEARTBEAT);
        tracing::trace!(
            delay = delay.0,
            until_due = until_due.0,
            "refresh not yet due, sleeping…"
        );
        tokio::time::sleep(delay.into()).await;
    }
}
