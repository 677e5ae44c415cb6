//! Port definitions (hexagonal architecture)
//!
//! Ports define the interfaces for external dependencies. The core depends
//! only on these traits, not on concrete implementations.

mod credential_store;
mod resource_api;

pub use credential_store::CredentialStore;
pub use resource_api::ResourceApi;
