//! Refresh Coordinator
//!
//! Single-flight refresh of the shared bearer credential.
//!
//! The coordinator is either **Idle** or **Refreshing**. The first caller that
//! reports an authentication failure while Idle becomes the leader and performs
//! the one refresh exchange; every caller arriving while Refreshing is queued as
//! a waiter. When the exchange settles, the credential store is updated (or
//! purged) first, then every waiter is released with the same outcome and the
//! coordinator returns to Idle.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use thiserror::Error;
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::core::{HttpMethod, HttpRequest, HttpTransport};
use crate::credentials::CredentialStore;
use crate::error::{message_from_body, ClientError};
use crate::telemetry::{ClientMetrics, NoOpMetrics};
use crate::types::{ClientConfig, RefreshRequestBody, TokenResponse};

/// Why a refresh exchange failed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RefreshFailure {
    #[error("No refresh token available")]
    MissingRefreshToken,

    #[error("Refresh rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("Refresh response missing access_token")]
    MissingAccessToken,

    #[error("Refresh response is not valid JSON: {message}")]
    InvalidResponse { message: String },

    #[error("Refresh request failed: {message}")]
    Transport { message: String },

    #[error("Credential store failed during refresh: {message}")]
    Storage { message: String },
}

impl From<RefreshFailure> for ClientError {
    fn from(failure: RefreshFailure) -> Self {
        ClientError::auth_expired(failure.to_string())
    }
}

type RefreshOutcome = Result<(), RefreshFailure>;

#[derive(Default)]
struct RefreshState {
    in_flight: bool,
    waiters: Vec<oneshot::Sender<RefreshOutcome>>,
    /// Completed successful exchanges.
    generation: u64,
    /// Outcome of the most recent exchange, when it failed.
    last_failure: Option<RefreshFailure>,
}

enum Admission<'a> {
    /// An exchange settled after the caller's attempt began. Carries the
    /// failure if the most recent one failed.
    AlreadySettled(Option<RefreshFailure>),
    Lead(LeaderGuard<'a>),
    Wait(oneshot::Receiver<RefreshOutcome>),
}

/// Held by the caller driving the exchange. Dropping it unsettled (the leader's
/// future was cancelled) returns the coordinator to Idle and closes every
/// waiter's channel so they re-enter the protocol.
struct LeaderGuard<'a> {
    state: &'a Mutex<RefreshState>,
    settled: bool,
}

impl LeaderGuard<'_> {
    fn settle(mut self, outcome: &RefreshOutcome) {
        self.settled = true;

        let waiters = {
            let mut state = lock(self.state);
            match outcome {
                Ok(()) => {
                    state.generation += 1;
                    state.last_failure = None;
                }
                Err(failure) => state.last_failure = Some(failure.clone()),
            }
            state.in_flight = false;
            std::mem::take(&mut state.waiters)
        };

        for waiter in waiters {
            // A waiter whose caller went away has dropped its receiver.
            let _ = waiter.send(outcome.clone());
        }
    }
}

impl Drop for LeaderGuard<'_> {
    fn drop(&mut self) {
        if self.settled {
            return;
        }

        let mut state = lock(self.state);
        state.in_flight = false;
        let abandoned = std::mem::take(&mut state.waiters);
        drop(state);

        warn!(
            waiters = abandoned.len(),
            "Token refresh abandoned before settling"
        );
    }
}

fn lock(state: &Mutex<RefreshState>) -> MutexGuard<'_, RefreshState> {
    state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Single-flight refresh coordinator.
pub struct RefreshCoordinator<T: HttpTransport, S: CredentialStore> {
    config: ClientConfig,
    transport: Arc<T>,
    store: Arc<S>,
    metrics: Arc<dyn ClientMetrics>,
    state: Mutex<RefreshState>,
    exchanges: AtomicU64,
}

impl<T: HttpTransport, S: CredentialStore> RefreshCoordinator<T, S> {
    /// Create new refresh coordinator.
    pub fn new(config: ClientConfig, transport: Arc<T>, store: Arc<S>) -> Self {
        Self {
            config,
            transport,
            store,
            metrics: Arc::new(NoOpMetrics),
            state: Mutex::new(RefreshState::default()),
            exchanges: AtomicU64::new(0),
        }
    }

    /// Replace the metrics sink.
    pub fn with_metrics(mut self, metrics: Arc<dyn ClientMetrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Number of successful exchanges so far.
    ///
    /// Snapshot this before issuing a request and pass it to
    /// [`ensure_fresh_after_failure`](Self::ensure_fresh_after_failure) if the
    /// request is rejected.
    pub fn generation(&self) -> u64 {
        lock(&self.state).generation
    }

    /// Whether an exchange is in flight.
    pub fn is_refreshing(&self) -> bool {
        lock(&self.state).in_flight
    }

    /// Number of callers queued behind the in-flight exchange.
    pub fn waiting_count(&self) -> usize {
        lock(&self.state).waiters.len()
    }

    /// Number of refresh exchanges sent over the network.
    pub fn refresh_count(&self) -> u64 {
        self.exchanges.load(Ordering::SeqCst)
    }

    /// Make sure the stored credential is fresh after an authentication failure.
    ///
    /// `observed_generation` is the [`generation`](Self::generation) seen before
    /// the rejected attempt was issued. Exactly one exchange runs no matter how
    /// many callers arrive concurrently; all of them observe its outcome. On
    /// failure the credential store has been cleared before this returns, and
    /// the error is [`ClientError::AuthExpired`].
    ///
    /// A caller whose rejection arrives after a newer credential was installed
    /// skips the exchange, unless the session has since been purged: then it
    /// fails with the same [`ClientError::AuthExpired`].
    pub async fn ensure_fresh_after_failure(
        &self,
        observed_generation: u64,
    ) -> Result<(), ClientError> {
        loop {
            match self.admit(observed_generation) {
                Admission::AlreadySettled(last_failure) => {
                    debug!(
                        observed_generation,
                        "Credential already refreshed since the rejected attempt"
                    );
                    return self
                        .confirm_session(last_failure)
                        .await
                        .map_err(ClientError::from);
                }
                Admission::Wait(receiver) => {
                    self.metrics.record_refresh_joined();
                    debug!("Joining in-flight token refresh");

                    match receiver.await {
                        Ok(outcome) => return outcome.map_err(ClientError::from),
                        // Leader was cancelled; compete for leadership again.
                        Err(_) => continue,
                    }
                }
                Admission::Lead(guard) => {
                    let outcome = self.exchange().await;
                    guard.settle(&outcome);
                    return outcome.map_err(ClientError::from);
                }
            }
        }
    }

    /// Atomic check-and-set on the refresh state.
    fn admit(&self, observed_generation: u64) -> Admission<'_> {
        let mut state = lock(&self.state);

        if state.in_flight {
            let (sender, receiver) = oneshot::channel();
            state.waiters.push(sender);
            return Admission::Wait(receiver);
        }

        if state.generation > observed_generation {
            return Admission::AlreadySettled(state.last_failure.clone());
        }

        state.in_flight = true;
        Admission::Lead(LeaderGuard {
            state: &self.state,
            settled: false,
        })
    }

    /// A credential newer than the caller's attempt was installed; succeed only
    /// if the session still holds it.
    async fn confirm_session(&self, last_failure: Option<RefreshFailure>) -> RefreshOutcome {
        let pair = self
            .store
            .get()
            .await
            .map_err(|e| RefreshFailure::Storage {
                message: e.to_string(),
            })?;

        match pair {
            Some(pair) if !pair.access_token().is_empty() => Ok(()),
            _ => Err(last_failure.unwrap_or(RefreshFailure::MissingRefreshToken)),
        }
    }

    /// Run the exchange and apply its result to the credential store.
    async fn exchange(&self) -> RefreshOutcome {
        match self.refresh_credentials().await {
            Ok(()) => {
                self.metrics.record_refresh(true);
                info!("Access token refreshed successfully");
                Ok(())
            }
            Err(failure) => {
                self.metrics.record_refresh(false);
                warn!(error = %failure, "Token refresh failed, clearing stored credentials");

                if let Err(e) = self.store.clear().await {
                    warn!(error = %e, "Failed to clear credentials after refresh failure");
                }

                Err(failure)
            }
        }
    }

    async fn refresh_credentials(&self) -> RefreshOutcome {
        let pair = self
            .store
            .get()
            .await
            .map_err(|e| RefreshFailure::Storage {
                message: e.to_string(),
            })?
            .filter(|pair| !pair.refresh_token().is_empty())
            .ok_or(RefreshFailure::MissingRefreshToken)?;

        let body = serde_json::to_string(&RefreshRequestBody {
            refresh_token: pair.refresh_token(),
        })
        .map_err(|e| RefreshFailure::InvalidResponse {
            message: e.to_string(),
        })?;

        let mut headers = self.config.default_headers.clone();
        headers.remove("authorization");
        headers.insert("content-type".to_string(), "application/json".to_string());
        headers.insert("accept".to_string(), "application/json".to_string());

        let request = HttpRequest {
            method: HttpMethod::Post,
            url: self.config.refresh_url(),
            headers,
            body: Some(body),
            timeout: Some(self.config.timeout),
        };

        self.exchanges.fetch_add(1, Ordering::SeqCst);
        debug!(
            url = %request.url,
            token_age_secs = (Utc::now() - pair.obtained_at).num_seconds(),
            "Sending token refresh exchange"
        );

        let response = self
            .transport
            .send(request)
            .await
            .map_err(|e| RefreshFailure::Transport {
                message: e.to_string(),
            })?;

        if response.status != 200 {
            return Err(RefreshFailure::Rejected {
                status: response.status,
                message: message_from_body(&response.body),
            });
        }

        let token_response: TokenResponse =
            serde_json::from_str(&response.body).map_err(|e| RefreshFailure::InvalidResponse {
                message: e.to_string(),
            })?;

        let access_token = token_response
            .access_token()
            .ok_or(RefreshFailure::MissingAccessToken)?;

        let refreshed = pair.refreshed(
            access_token.to_string(),
            token_response.refresh_token().map(str::to_string),
        );

        self.store
            .set(refreshed)
            .await
            .map_err(|e| RefreshFailure::Storage {
                message: e.to_string(),
            })
    }
}
