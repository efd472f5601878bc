//! Identity-key lifecycle and dapp key resolution for the Notify protocol
//! engine (spec.md §6 "Identity service" / "Keyserver HTTP" / "Dapp DID
//! document").

mod error;
mod resolver;
mod service;

pub use error::IdentityError;
pub use resolver::{KeyResolver, ResolvedKeys};
pub use service::{HttpIdentityService, IdentityService, RegistrationPreparation};
