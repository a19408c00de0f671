//! Authentication module for managing user sessions and credentials.
//!
//! This module provides:
//! - `SessionHandle`: the shared session state, persisted before it is published
//! - `SessionStore`: hydrate, login, register and logout
//! - `BearerToken`: a credential normalized to `Bearer <value>`
//! - `CredentialStore`: where the credential lives between runs (file, OS
//!   keychain or memory)

pub mod credentials;
pub mod session;
pub mod store;
pub mod token;

pub use credentials::{
    CredentialStore, FileCredentialStore, KeyringCredentialStore, MemoryCredentialStore,
    StoredCredentials,
};
pub use session::{Session, SessionHandle, SessionStatus};
pub use store::SessionStore;
pub use token::{BearerToken, LoginResponse};
