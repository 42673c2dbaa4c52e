//! Credential Store
//!
//! Capability interface over the persisted access/refresh pair.

use async_trait::async_trait;
use std::sync::Mutex;

use crate::error::{ClientError, StorageError};
use crate::types::CredentialPair;

/// Credential store interface.
///
/// Holds at most one [`CredentialPair`]. The refresh coordinator is the only
/// writer while a refresh is in flight, so implementations need no
/// concurrent-write protocol beyond being `Send + Sync`.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Current credential pair, if authenticated.
    async fn get(&self) -> Result<Option<CredentialPair>, ClientError>;

    /// Replace the stored pair.
    async fn set(&self, pair: CredentialPair) -> Result<(), ClientError>;

    /// Remove both tokens.
    async fn clear(&self) -> Result<(), ClientError>;
}

/// In-memory credential store implementation.
#[derive(Default)]
pub struct InMemoryCredentialStore {
    pair: Mutex<Option<CredentialPair>>,
}

impl InMemoryCredentialStore {
    /// Create an empty (unauthenticated) store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store already holding a pair.
    pub fn with_pair(pair: CredentialPair) -> Self {
        Self {
            pair: Mutex::new(Some(pair)),
        }
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn get(&self) -> Result<Option<CredentialPair>, ClientError> {
        let pair = self.pair.lock().map_err(|e| {
            ClientError::Storage(StorageError::ReadFailed {
                message: e.to_string(),
            })
        })?;
        Ok(pair.clone())
    }

    async fn set(&self, pair: CredentialPair) -> Result<(), ClientError> {
        let mut current = self.pair.lock().map_err(|e| {
            ClientError::Storage(StorageError::WriteFailed {
                message: e.to_string(),
            })
        })?;
        *current = Some(pair);
        Ok(())
    }

    async fn clear(&self) -> Result<(), ClientError> {
        let mut current = self.pair.lock().map_err(|e| {
            ClientError::Storage(StorageError::DeleteFailed {
                message: e.to_string(),
            })
        })?;
        current.take();
        Ok(())
    }
}

/// Mock credential store for testing.
#[derive(Default)]
pub struct MockCredentialStore {
    pair: Mutex<Option<CredentialPair>>,
    set_history: Mutex<Vec<CredentialPair>>,
    get_count: Mutex<usize>,
    clear_count: Mutex<usize>,
    should_fail: Mutex<bool>,
}

impl MockCredentialStore {
    /// Create new mock credential store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a pair.
    pub fn with_pair(self, pair: CredentialPair) -> Self {
        *self.pair.lock().unwrap() = Some(pair);
        self
    }

    /// Set store to fail all operations.
    pub fn set_should_fail(&self, should_fail: bool) -> &Self {
        *self.should_fail.lock().unwrap() = should_fail;
        self
    }

    /// Pairs written through `set`, in order.
    pub fn get_set_history(&self) -> Vec<CredentialPair> {
        self.set_history.lock().unwrap().clone()
    }

    /// Number of `get` calls.
    pub fn get_count(&self) -> usize {
        *self.get_count.lock().unwrap()
    }

    /// Number of `clear` calls.
    pub fn clear_count(&self) -> usize {
        *self.clear_count.lock().unwrap()
    }

    /// Current access token, without touching the call counters.
    pub fn current_access_token(&self) -> Option<String> {
        self.pair
            .lock()
            .unwrap()
            .as_ref()
            .map(|p| p.access_token().to_string())
    }

    fn check_error(&self, make: impl FnOnce() -> StorageError) -> Result<(), ClientError> {
        if *self.should_fail.lock().unwrap() {
            return Err(ClientError::Storage(make()));
        }
        Ok(())
    }
}

#[async_trait]
impl CredentialStore for MockCredentialStore {
    async fn get(&self) -> Result<Option<CredentialPair>, ClientError> {
        self.check_error(|| StorageError::ReadFailed {
            message: "Mock storage failure".to_string(),
        })?;

        *self.get_count.lock().unwrap() += 1;
        Ok(self.pair.lock().unwrap().clone())
    }

    async fn set(&self, pair: CredentialPair) -> Result<(), ClientError> {
        self.check_error(|| StorageError::WriteFailed {
            message: "Mock storage failure".to_string(),
        })?;

        self.set_history.lock().unwrap().push(pair.clone());
        *self.pair.lock().unwrap() = Some(pair);
        Ok(())
    }

    async fn clear(&self) -> Result<(), ClientError> {
        self.check_error(|| StorageError::DeleteFailed {
            message: "Mock storage failure".to_string(),
        })?;

        *self.clear_count.lock().unwrap() += 1;
        self.pair.lock().unwrap().take();
        Ok(())
    }
}

#[cfg(test)]
mockall::mock! {
    /// Expectation-driven store for ordering and failure-injection tests.
    pub Store {}

    #[async_trait]
    impl CredentialStore for Store {
        async fn get(&self) -> Result<Option<CredentialPair>, ClientError>;
        async fn set(&self, pair: CredentialPair) -> Result<(), ClientError>;
        async fn clear(&self) -> Result<(), ClientError>;
    }
}
