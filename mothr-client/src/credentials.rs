//! Credential storage
//!
//! The session manager keeps its bearer credential in a [`CredentialStore`].
//! The store is injectable so callers can share or persist credentials
//! without the client touching process-wide state.

use parking_lot::RwLock;
use std::fmt;

/// Bearer credential issued by the service
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    pub access_token: String,
    pub refresh_token: Option<String>,
}

impl Credential {
    pub fn new(access_token: impl Into<String>, refresh_token: Option<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token,
        }
    }

    /// Value for the `Authorization` header
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.access_token)
    }
}

// Tokens stay out of logs.
impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access_token", &"<redacted>")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// Storage for the current credential
pub trait CredentialStore: Send + Sync {
    /// Returns the current credential, if any
    fn load(&self) -> Option<Credential>;

    /// Replaces the current credential
    fn store(&self, credential: Credential);

    /// Forgets the current credential
    fn clear(&self);
}

/// In-memory implementation of CredentialStore
#[derive(Default)]
pub struct InMemoryCredentialStore {
    credential: RwLock<Option<Credential>>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that starts out holding `credential`
    pub fn with_credential(credential: Credential) -> Self {
        Self {
            credential: RwLock::new(Some(credential)),
        }
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn load(&self) -> Option<Credential> {
        self.credential.read().clone()
    }

    fn store(&self, credential: Credential) {
        *self.credential.write() = Some(credential);
    }

    fn clear(&self) {
        *self.credential.write() = None;
    }
}
