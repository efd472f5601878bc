//! The Notify protocol engine: a single-threaded cooperative state machine
//! driving JWT-authorized subscription lifecycle over an E2E-encrypted
//! relay (spec.md §4, §9 "Concurrency model redesign").
//!
//! [`Engine`] owns no network or storage code directly — every capability
//! (identity, relay transport, the five stores, config fetch, the clock)
//! is injected as a trait object via [`EngineDependencies`], so the whole
//! engine is testable against in-memory doubles (`notify-stores` and
//! `notify-relay`'s `test-support` feature).

mod config;
mod dispatch;
mod engine;
mod error;
mod events;
mod operations;
mod reconcile;
mod registration;
mod watch;

pub use config::{Clock, ConfigFetcher, EngineConfig, ExplorerApiConfigFetcher, SystemClock};
pub use engine::{Engine, EngineDependencies};
pub use error::EngineError;
pub use events::EngineEvent;

/// Drains relay events into [`Engine::handle_relay_event`] until the
/// transport shuts down for good. Callers spawn this as its own task
/// alongside the engine; it's kept separate from [`Engine::init`] so tests
/// can drive `handle_relay_event` directly without a background task.
pub async fn run_dispatch_loop(engine: std::sync::Arc<Engine>) {
    while let Some(event) = engine.relay.next_event().await {
        engine.handle_relay_event(event).await;
    }
}
