//! Storage trait interfaces for the Notify protocol engine, consumed as a
//! store interface (spec.md §6). In-memory implementations are available
//! behind the `test-support` feature for engine tests; production
//! deployments supply their own backend.

mod error;
mod key_material;
mod message;
mod registration;
mod subscription;
mod watch;

pub use error::StoreError;
pub use key_material::KeyMaterialStore;
pub use message::MessageStore;
pub use registration::RegistrationStore;
pub use subscription::SubscriptionStore;
pub use watch::WatchStore;

#[cfg(feature = "test-support")]
pub use key_material::memory::InMemoryKeyMaterialStore;
#[cfg(feature = "test-support")]
pub use message::memory::InMemoryMessageStore;
#[cfg(feature = "test-support")]
pub use registration::memory::InMemoryRegistrationStore;
#[cfg(feature = "test-support")]
pub use subscription::memory::InMemorySubscriptionStore;
#[cfg(feature = "test-support")]
pub use watch::memory::InMemoryWatchStore;
