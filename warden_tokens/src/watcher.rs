use std::{ops, sync::Arc};

use thiserror::Error;
use tokio::sync::watch;

use crate::{ManagerStatus, Session};

/// Observes session transitions published by a [`TokenManager`](crate::TokenManager)
///
/// Useful for reacting to changes made in the background, such as a scheduled
/// refresh failing and the tokens being discarded.
#[derive(Clone, Debug)]
pub struct SessionWatcher {
    watcher: watch::Receiver<Arc<Session>>,
}

/// An outstanding borrow of the current session
///
/// This borrow should be held for as brief a time as possible, as outstanding
/// borrows will block the manager from publishing a new session.
#[derive(Debug)]
pub struct BorrowedSession<'a> {
    inner: watch::Ref<'a, Arc<Session>>,
}

impl<'a> ops::Deref for BorrowedSession<'a> {
    type Target = Session;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

/// The manager publishing sessions was dropped; no further updates will arrive
#[derive(Clone, Copy, Debug, Error)]
#[error("token manager dropped, no more sessions will be published")]
pub struct ManagerDropped {
    _p: (),
}

impl SessionWatcher {
    pub(crate) fn new(watcher: watch::Receiver<Arc<Session>>) -> Self {
        Self { watcher }
    }

    /// Waits for a new session to be published
    pub async fn changed(&mut self) -> Result<(), ManagerDropped> {
        self.watcher
            .changed()
            .await
            .map_err(|_| ManagerDropped { _p: () })
    }

    /// Borrows the current session
    pub fn session(&self) -> BorrowedSession {
        BorrowedSession {
            inner: self.watcher.borrow(),
        }
    }

    /// Takes an owned copy of the current session
    pub fn snapshot(&self) -> Arc<Session> {
        self.watcher.borrow().clone()
    }

    /// The status of the current session
    pub fn status(&self) -> ManagerStatus {
        self.watcher.borrow().status()
    }

    /// Waits until the manager reaches `status`
    ///
    /// Returns immediately if the manager is already in that state.
    pub async fn wait_for(&mut self, status: ManagerStatus) -> Result<(), ManagerDropped> {
        self.watcher
            .wait_for(|session| session.status() == status)
            .await
            .map(drop)
            .map_err(|_| ManagerDropped { _p: () })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{test_util::StubGateway, TokenManager};

    #[tokio::test]
    async fn sessions_follow_manager_transitions() {
        let manager = TokenManager::new(StubGateway::new());
        let mut watcher = manager.watch();
        assert_eq!(watcher.status(), ManagerStatus::NotConfigured);

        manager
            .configure("cid", "csec", "https://api.example")
            .await;
        watcher.changed().await.unwrap();

        assert_eq!(
            watcher.session().client().map(|c| c.base_url().to_owned()),
            Some("https://api.example".to_owned())
        );
        let configured = watcher.snapshot();

        manager.reset().await;
        watcher.changed().await.unwrap();

        assert_eq!(configured.status(), ManagerStatus::Configured);
        assert_eq!(watcher.status(), ManagerStatus::NotConfigured);
        assert!(watcher.session().client().is_none());
    }

    #[tokio::test]
    async fn dropping_the_manager_ends_the_watch() {
        let manager = TokenManager::new(StubGateway::new());
        let mut watcher = manager.watch();

        drop(manager);

        assert!(matches!(watcher.changed().await, Err(ManagerDropped { .. })));
        assert!(watcher
            .wait_for(ManagerStatus::Authenticated)
            .await
            .is_err());
        assert_eq!(watcher.status(), ManagerStatus::NotConfigured);
    }
}
