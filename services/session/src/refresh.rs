//! Single-flight refresh coordinator
//!
//! When several concurrent requests discover an expired token, exactly one
//! call to `POST /auth/refresh` goes upstream. The coordinator is an
//! explicit two-state machine: the first 401 observer flips Idle to
//! Refreshing and performs the call; later observers enqueue a waiter and
//! resume, in arrival order, with the same outcome.
//!
//! The refresh endpoint relies on the httpOnly refresh cookie carried by
//! the shared cookie jar; no body and no Authorization header are sent.

use std::sync::{Mutex, PoisonError};

use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::models::RefreshResponse;
use crate::store::SessionStore;

enum GateState {
    Idle,
    Refreshing {
        /// FIFO queue of requests that hit a 401 while the refresh was
        /// already in flight
        waiters: Vec<oneshot::Sender<Option<String>>>,
    },
}

/// Coordinates concurrent token refreshes into a single upstream call
pub struct RefreshGate {
    http: reqwest::Client,
    base_url: String,
    store: SessionStore,
    state: Mutex<GateState>,
}

impl RefreshGate {
    pub fn new(http: reqwest::Client, base_url: String, store: SessionStore) -> Self {
        Self {
            http,
            base_url,
            store,
            state: Mutex::new(GateState::Idle),
        }
    }

    /// Run (or join) one refresh cycle and return the token to retry with
    ///
    /// `None` means the session could not be recovered; the store has
    /// already been cleared by the time any caller observes it. `Some`
    /// means the store already holds the new token.
    pub async fn recover(&self) -> Option<String> {
        let rx = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            match &mut *state {
                GateState::Refreshing { waiters } => {
                    let (tx, rx) = oneshot::channel();
                    waiters.push(tx);
                    Some(rx)
                }
                GateState::Idle => {
                    *state = GateState::Refreshing {
                        waiters: Vec::new(),
                    };
                    None
                }
            }
        };

        if let Some(rx) = rx {
            // a refresh is already running; wait for its outcome
            return rx.await.unwrap_or(None);
        }

        let token = self.call_refresh().await;

        // store first, so no waiter can resume against a half-updated
        // session
        match &token {
            Some(t) => self.store.set_token(Some(t.clone())),
            None => self.store.clear(),
        }

        let waiters = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            match std::mem::replace(&mut *state, GateState::Idle) {
                GateState::Refreshing { waiters } => waiters,
                GateState::Idle => Vec::new(),
            }
        };

        for tx in waiters {
            let _ = tx.send(token.clone());
        }

        token
    }

    /// One raw call to the refresh endpoint
    ///
    /// A 401 here is the normal "no live refresh cookie" answer, not an
    /// error; transport failures also resolve to `None` so every waiter
    /// sees the same terminal outcome.
    async fn call_refresh(&self) -> Option<String> {
        let url = format!("{}/auth/refresh", self.base_url);

        match self.http.post(&url).send().await {
            Ok(resp) if resp.status().is_success() => match resp.json::<RefreshResponse>().await {
                Ok(body) => {
                    if body.access_token.is_some() {
                        info!("access token refreshed");
                    }
                    body.access_token
                }
                Err(err) => {
                    warn!("failed to decode refresh response: {}", err);
                    None
                }
            },
            Ok(resp) => {
                let status = resp.status();
                if status.as_u16() == 401 {
                    info!("refresh rejected, session is over");
                } else {
                    warn!("refresh failed with status {}", status);
                }
                None
            }
            Err(err) => {
                warn!("refresh request failed: {}", err);
                None
            }
        }
    }
}
