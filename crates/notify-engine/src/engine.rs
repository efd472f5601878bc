use std::sync::Arc;

use notify_identity::{IdentityService, KeyResolver};
use notify_relay::{PendingRequests, RelayClient};
use notify_stores::{KeyMaterialStore, MessageStore, RegistrationStore, SubscriptionStore, WatchStore};
use tokio::sync::{mpsc, Mutex};

use crate::config::{Clock, ConfigFetcher, EngineConfig};
use crate::error::EngineError;
use crate::events::EngineEvent;

/// Folds the source's global mutable flags (`initialized`, `finishedInitialLoad`,
/// `lastDisconnect`, `lastWatchIssued`) into one state record owned by the
/// engine (spec.md §9 design notes).
#[derive(Debug, Clone, Default)]
pub(crate) struct EngineState {
    pub initialized: bool,
    pub has_finished_initial_load: bool,
    pub last_disconnect_at: i64,
    pub last_watch_issued_at: i64,
}

/// Everything the engine needs injected, following spec.md §9's inversion:
/// small capability traits rather than a back-reference to an owning
/// client.
pub struct Engine {
    pub(crate) config: EngineConfig,
    pub(crate) identity: Arc<dyn IdentityService>,
    pub(crate) relay: Arc<dyn RelayClient>,
    pub(crate) subscriptions: Arc<dyn SubscriptionStore>,
    pub(crate) messages: Arc<dyn MessageStore>,
    pub(crate) watch_store: Arc<dyn WatchStore>,
    pub(crate) registration: Arc<dyn RegistrationStore>,
    pub(crate) key_material: Arc<dyn KeyMaterialStore>,
    pub(crate) key_resolver: Arc<KeyResolver>,
    pub(crate) config_fetcher: Arc<dyn ConfigFetcher>,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) pending: Arc<PendingRequests>,
    pub(crate) events_tx: mpsc::UnboundedSender<EngineEvent>,
    pub(crate) state: Mutex<EngineState>,
}

/// Dependencies an [`Engine`] is built from. Every field is a trait object
/// so callers can supply in-memory doubles in tests or production-backed
/// implementations without the engine knowing the difference.
pub struct EngineDependencies {
    pub config: EngineConfig,
    pub identity: Arc<dyn IdentityService>,
    pub relay: Arc<dyn RelayClient>,
    pub subscriptions: Arc<dyn SubscriptionStore>,
    pub messages: Arc<dyn MessageStore>,
    pub watch_store: Arc<dyn WatchStore>,
    pub registration: Arc<dyn RegistrationStore>,
    pub key_material: Arc<dyn KeyMaterialStore>,
    pub key_resolver: Arc<KeyResolver>,
    pub config_fetcher: Arc<dyn ConfigFetcher>,
    pub clock: Arc<dyn Clock>,
}

impl Engine {
    pub fn new(deps: EngineDependencies) -> (Self, mpsc::UnboundedReceiver<EngineEvent>) {
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        let engine = Self {
            config: deps.config,
            identity: deps.identity,
            relay: deps.relay,
            subscriptions: deps.subscriptions,
            messages: deps.messages,
            watch_store: deps.watch_store,
            registration: deps.registration,
            key_material: deps.key_material,
            key_resolver: deps.key_resolver,
            config_fetcher: deps.config_fetcher,
            clock: deps.clock,
            pending: Arc::new(PendingRequests::new()),
            events_tx,
            state: Mutex::new(EngineState::default()),
        };
        (engine, events_rx)
    }

    /// Connects the relay transport and re-watches the last-watched
    /// account, if any. Every other public operation fails with
    /// `NotInitialized` until this completes.
    pub async fn init(&self) -> Result<(), EngineError> {
        self.relay.connect().await?;
        {
            let mut state = self.state.lock().await;
            state.initialized = true;
        }

        if let Some(watched) = self.watch_store.find_last_watched().await? {
            if let Err(e) = self.issue_watch(&watched).await {
                tracing::warn!(error = %e, "re-watch on init failed, will retry on next connect");
            }
        }

        {
            let mut state = self.state.lock().await;
            state.has_finished_initial_load = true;
        }
        Ok(())
    }

    pub async fn has_finished_initial_load(&self) -> bool {
        self.state.lock().await.has_finished_initial_load
    }

    pub(crate) async fn require_initialized(&self) -> Result<(), EngineError> {
        if self.state.lock().await.initialized {
            Ok(())
        } else {
            Err(EngineError::NotInitialized)
        }
    }

    fn emit(&self, event: EngineEvent) {
        let _ = self.events_tx.send(event);
    }

    pub(crate) fn emit_event(&self, event: EngineEvent) {
        self.emit(event)
    }
}
