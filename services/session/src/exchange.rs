//! Credential exchanger
//!
//! Exchanges a short-lived identity assertion from the external identity
//! provider for a first-party `{accessToken, user}` session, with a fixed
//! retry/backoff schedule, cancellation support, and deduplication: the
//! provider may emit several near-duplicate notifications for one
//! underlying credential refresh, and only one of them may reach the
//! backend.

use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use common::error::{AuthError, AuthResult};
use tokio::sync::oneshot;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::http::ApiClient;
use crate::identity::{IdentityEvent, IdentityProvider};
use crate::models::{ExchangeRequest, ExchangeResponse, UserProfile};
use crate::store::SessionStore;

/// Total attempts per exchange, including the first one
const MAX_ATTEMPTS: usize = 3;

/// Fixed backoff schedule between attempts, not jittered
const BACKOFF: [Duration; 2] = [Duration::from_millis(250), Duration::from_millis(750)];

/// Successful result of a credential exchange
#[derive(Debug, Clone)]
pub struct ExchangeOutcome {
    pub access_token: String,
    pub user: Option<UserProfile>,
}

type SharedOutcome = Result<ExchangeOutcome, AuthError>;

enum FlightState {
    Idle,
    Running {
        /// Callers that observed the same window while an exchange was
        /// already in flight
        waiters: Vec<oneshot::Sender<SharedOutcome>>,
    },
}

struct DedupState {
    flight: FlightState,
    /// Cancellation handle for the in-flight exchange, if any
    current_cancel: Option<CancellationToken>,
    last_assertion: Option<String>,
    last_outcome: Option<ExchangeOutcome>,
    last_completed_at: Option<Instant>,
}

impl DedupState {
    fn forget(&mut self) {
        self.last_assertion = None;
        self.last_outcome = None;
        self.last_completed_at = None;
    }
}

enum Plan {
    Cached(ExchangeOutcome),
    Wait(oneshot::Receiver<SharedOutcome>),
    Lead,
}

/// Exchanges identity assertions for backend sessions
pub struct CredentialExchanger {
    http: reqwest::Client,
    base_url: String,
    store: SessionStore,
    window: Duration,
    state: Mutex<DedupState>,
}

impl CredentialExchanger {
    /// Build an exchanger sharing the client's cookie jar, so the refresh
    /// cookie set by the exchange response lands in the same jar the
    /// refresh coordinator reads from
    pub fn new(api: &ApiClient, window: Duration) -> Self {
        Self {
            http: api.raw_client(),
            base_url: api.base_url().to_string(),
            store: api.store().clone(),
            window,
            state: Mutex::new(DedupState {
                flight: FlightState::Idle,
                current_cancel: None,
                last_assertion: None,
                last_outcome: None,
                last_completed_at: None,
            }),
        }
    }

    /// One raw exchange: up to three attempts, retrying only on network
    /// failures, 5xx, and 429
    ///
    /// Any other 4xx means the assertion itself is invalid and fails
    /// immediately. An already-fired cancellation token takes precedence
    /// over the remaining retry budget.
    pub async fn exchange(
        &self,
        assertion: &str,
        cancel: &CancellationToken,
    ) -> AuthResult<ExchangeOutcome> {
        let url = format!("{}/auth/firebase/exchange", self.base_url);
        let body = ExchangeRequest {
            id_token: assertion.to_string(),
        };

        let mut last_err: Option<AuthError> = None;

        for attempt in 0..MAX_ATTEMPTS {
            if attempt > 0 {
                tokio::select! {
                    _ = cancel.cancelled() => return Err(AuthError::Cancelled),
                    _ = sleep(BACKOFF[attempt - 1]) => {}
                }
            }

            let send = self.http.post(&url).json(&body).send();
            let result = tokio::select! {
                _ = cancel.cancelled() => return Err(AuthError::Cancelled),
                result = send => result,
            };

            match result {
                Ok(resp) if resp.status().is_success() => {
                    let parsed: ExchangeResponse = resp
                        .json()
                        .await
                        .map_err(|e| AuthError::InvalidResponse(e.to_string()))?;
                    let token = match (parsed.ok, parsed.access_token) {
                        (true, Some(token)) => token,
                        _ => {
                            return Err(AuthError::InvalidResponse(
                                "exchange response carried no access token".to_string(),
                            ));
                        }
                    };
                    return Ok(ExchangeOutcome {
                        access_token: token,
                        user: parsed.user,
                    });
                }
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    // abort beats both the retry budget and classification
                    if cancel.is_cancelled() {
                        return Err(AuthError::Cancelled);
                    }
                    if status != 429 && (400..500).contains(&status) {
                        return Err(AuthError::Rejected { status });
                    }
                    warn!("exchange attempt {} failed with status {}", attempt + 1, status);
                    last_err = Some(AuthError::Upstream { status });
                }
                Err(err) => {
                    if cancel.is_cancelled() {
                        return Err(AuthError::Cancelled);
                    }
                    warn!("exchange attempt {} failed: {}", attempt + 1, err);
                    last_err = Some(AuthError::Network(err.to_string()));
                }
            }
        }

        Err(last_err
            .unwrap_or_else(|| AuthError::Network("exchange attempts exhausted".to_string())))
    }

    /// Dedup front door for assertion observations
    ///
    /// The decision between "recently exchanged", "join the in-flight
    /// exchange", and "lead a new one" is made synchronously under one
    /// lock, so two observations landing in the same scheduling window
    /// cannot both start an exchange. On success the session store is
    /// updated before any waiter resumes.
    pub async fn observe(
        &self,
        assertion: &str,
        cancel: &CancellationToken,
    ) -> AuthResult<ExchangeOutcome> {
        let plan = {
            let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

            let recently_exchanged = state.last_assertion.as_deref() == Some(assertion)
                && state
                    .last_completed_at
                    .is_some_and(|at| at.elapsed() < self.window);

            if let (true, Some(outcome)) = (recently_exchanged, state.last_outcome.clone()) {
                Plan::Cached(outcome)
            } else {
                match &mut state.flight {
                    FlightState::Running { waiters } => {
                        let (tx, rx) = oneshot::channel();
                        waiters.push(tx);
                        Plan::Wait(rx)
                    }
                    FlightState::Idle => {
                        state.flight = FlightState::Running {
                            waiters: Vec::new(),
                        };
                        state.current_cancel = Some(cancel.clone());
                        Plan::Lead
                    }
                }
            }
        };

        match plan {
            Plan::Cached(outcome) => {
                info!("identity assertion already exchanged recently, skipping");
                Ok(outcome)
            }
            Plan::Wait(rx) => rx.await.unwrap_or(Err(AuthError::Cancelled)),
            Plan::Lead => {
                let result = self.exchange(assertion, cancel).await;

                match &result {
                    Ok(outcome) => {
                        self.store
                            .set_session(Some(outcome.access_token.clone()), outcome.user.clone());
                        info!("identity assertion exchanged for backend session");
                    }
                    Err(AuthError::Cancelled) => {
                        // the caller superseded this exchange; leave the
                        // store alone
                    }
                    Err(err) => {
                        self.store.clear();
                        error!("credential exchange failed: {}", err);
                    }
                }

                let waiters = {
                    let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
                    if let Ok(outcome) = &result {
                        state.last_assertion = Some(assertion.to_string());
                        state.last_outcome = Some(outcome.clone());
                        state.last_completed_at = Some(Instant::now());
                    }
                    state.current_cancel = None;
                    match std::mem::replace(&mut state.flight, FlightState::Idle) {
                        FlightState::Running { waiters } => waiters,
                        FlightState::Idle => Vec::new(),
                    }
                };

                for tx in waiters {
                    let _ = tx.send(result.clone());
                }

                result
            }
        }
    }

    /// Handle one identity-change notification
    ///
    /// Sign-out cancels any in-flight exchange, forgets the dedup memory,
    /// and clears the session. Sign-in runs the deduplicated exchange; a
    /// non-cancellation failure performs a best-effort local sign-out and
    /// surfaces the error so the UI can show a notification. Cancellation
    /// is swallowed: the caller intentionally superseded the exchange.
    pub async fn on_identity_event(
        &self,
        event: IdentityEvent,
        identity: &dyn IdentityProvider,
    ) -> AuthResult<()> {
        match event {
            IdentityEvent::SignedOut => {
                let cancel = {
                    let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
                    state.forget();
                    state.current_cancel.take()
                };
                if let Some(cancel) = cancel {
                    cancel.cancel();
                }
                self.store.set_session(None, None);
                Ok(())
            }
            IdentityEvent::SignedIn { assertion } => {
                let cancel = CancellationToken::new();
                match self.observe(&assertion, &cancel).await {
                    Ok(_) => Ok(()),
                    Err(AuthError::Cancelled) => Ok(()),
                    Err(err) => {
                        if let Err(sign_out_err) = identity.sign_out().await {
                            warn!(
                                "identity sign-out after failed exchange also failed: {}",
                                sign_out_err
                            );
                        }
                        self.store.set_session(None, None);
                        Err(err)
                    }
                }
            }
        }
    }

    /// Ask the provider for its current assertion and resync the backend
    /// session (for example when the application regains focus)
    pub async fn resync(&self, identity: &dyn IdentityProvider) -> AuthResult<()> {
        match identity.current_assertion().await? {
            Some(assertion) => {
                self.on_identity_event(IdentityEvent::SignedIn { assertion }, identity)
                    .await
            }
            None => Ok(()),
        }
    }
}
