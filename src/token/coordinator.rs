use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use futures::FutureExt;
use futures::future::{BoxFuture, Shared};

use crate::errors::RefreshError;
use crate::session::RemoteSessionService;
use crate::telemetry::{RefreshTelemetry, RefreshTrigger};

use super::{AccessToken, TokenStore};

pub type RefreshResult = Result<AccessToken, RefreshError>;

type PendingRefresh = Shared<BoxFuture<'static, RefreshResult>>;

struct InFlight {
    pending: PendingRefresh,
    telemetry: RefreshTelemetry,
}

/// Owns the single in-flight refresh slot.
///
/// The first caller to need a refresh starts it; everyone who arrives before
/// it settles awaits the same shared future and receives the same result.
pub struct RefreshCoordinator {
    store: Arc<dyn TokenStore>,
    session: Arc<dyn RemoteSessionService>,
    slot: Arc<Mutex<Option<InFlight>>>,
    started: Arc<AtomicU64>,
}

impl RefreshCoordinator {
    pub fn new(store: Arc<dyn TokenStore>, session: Arc<dyn RemoteSessionService>) -> Self {
        Self {
            store,
            session,
            slot: Arc::new(Mutex::new(None)),
            started: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn store(&self) -> Arc<dyn TokenStore> {
        Arc::clone(&self.store)
    }

    /// Whether a refresh is currently outstanding.
    pub fn is_refreshing(&self) -> bool {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Number of exchanges with the session service this coordinator has started.
    pub fn refreshes_started(&self) -> u64 {
        self.started.load(Ordering::SeqCst)
    }

    /// Refreshes the stored token, or joins the refresh already running.
    ///
    /// `observed` is the token the caller last saw. When the store no longer
    /// holds it, another refresh has already rotated the token and the stored
    /// one is returned without contacting the session service. `None` refreshes
    /// whatever is stored.
    pub async fn refresh(
        &self,
        trigger: RefreshTrigger,
        observed: Option<&AccessToken>,
    ) -> RefreshResult {
        // check-and-claim happens under one lock with no await in between
        let pending = {
            let mut slot = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
            match slot.as_ref() {
                Some(in_flight) => {
                    in_flight.telemetry.emit_joined(trigger);
                    in_flight.pending.clone()
                }
                None => {
                    let telemetry = RefreshTelemetry::new(trigger);
                    let pending = Self::exchange(
                        Arc::clone(&self.store),
                        Arc::clone(&self.session),
                        Arc::clone(&self.slot),
                        Arc::clone(&self.started),
                        telemetry.clone(),
                        observed.cloned(),
                    )
                    .boxed()
                    .shared();
                    *slot = Some(InFlight {
                        pending: pending.clone(),
                        telemetry,
                    });
                    pending
                }
            }
        };
        pending.await
    }

    async fn exchange(
        store: Arc<dyn TokenStore>,
        session: Arc<dyn RemoteSessionService>,
        slot: Arc<Mutex<Option<InFlight>>>,
        started: Arc<AtomicU64>,
        telemetry: RefreshTelemetry,
        observed: Option<AccessToken>,
    ) -> RefreshResult {
        let result = match store.get_token().await {
            Err(err) => Err(RefreshError::Store(err.to_string())),
            Ok(Some(current)) if observed.as_ref().is_some_and(|seen| *seen != current) => {
                telemetry.emit_superseded();
                Ok(current)
            }
            Ok(current) => {
                started.fetch_add(1, Ordering::SeqCst);
                telemetry.emit_start();
                let result = Self::rotate(store.as_ref(), session.as_ref(), current).await;
                match &result {
                    Ok(_) => telemetry.emit_success(),
                    Err(err) => telemetry.emit_failure(err),
                }
                result
            }
        };
        slot.lock().unwrap_or_else(PoisonError::into_inner).take();
        result
    }

    async fn rotate(
        store: &dyn TokenStore,
        session: &dyn RemoteSessionService,
        current: Option<AccessToken>,
    ) -> RefreshResult {
        let current = current.ok_or(RefreshError::NoToken)?;
        let fresh = session.refresh(&current).await?;
        if fresh.is_empty() {
            return Err(RefreshError::MissingToken);
        }
        let record = store
            .set_token_with_timestamp(fresh)
            .await
            .map_err(|e| RefreshError::Store(e.to_string()))?;
        Ok(record.token)
    }
}
