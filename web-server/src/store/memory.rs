// web-server/src/store/memory.rs
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use common::models::profile::{NewProfile, Profile};
use dashmap::DashMap;

use super::{ProfileStore, Result, StoreError};

/// In-memory profile store for development and tests
#[derive(Default)]
pub struct MemoryProfileStore {
    profiles: DashMap<i32, Profile>,
    next_id: AtomicI32,
    // Serializes uniqueness checks with the write that follows them
    write_lock: Mutex<()>,
}

impl MemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn find_live<F>(&self, predicate: F) -> Option<Profile>
    where
        F: Fn(&Profile) -> bool,
    {
        self.profiles
            .iter()
            .find(|entry| !entry.value().is_deleted() && predicate(entry.value()))
            .map(|entry| entry.value().clone())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, ()>> {
        self.write_lock
            .lock()
            .map_err(|_| StoreError::Database("memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl ProfileStore for MemoryProfileStore {
    async fn find_by_id(&self, id: i32) -> Result<Option<Profile>> {
        Ok(self
            .profiles
            .get(&id)
            .filter(|entry| !entry.value().is_deleted())
            .map(|entry| entry.value().clone()))
    }

    async fn find_by_wallet(&self, wallet_address: &str, chain_id: i64) -> Result<Option<Profile>> {
        Ok(self.find_live(|p| p.wallet_address == wallet_address && p.chain_id == chain_id))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Profile>> {
        Ok(self.find_live(|p| p.username == username))
    }

    async fn create(&self, profile: NewProfile) -> Result<Profile> {
        let _guard = self.lock()?;

        if self
            .find_live(|p| p.wallet_address == profile.wallet_address && p.chain_id == profile.chain_id)
            .is_some()
        {
            return Err(StoreError::WalletTaken);
        }
        if self.find_live(|p| p.username == profile.username).is_some() {
            return Err(StoreError::UsernameTaken);
        }

        let now = Utc::now();
        let created = Profile {
            id: self.next_id.fetch_add(1, Ordering::SeqCst) + 1,
            wallet_address: profile.wallet_address,
            chain_id: profile.chain_id,
            username: profile.username,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        self.profiles.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_username(&self, id: i32, username: &str) -> Result<Profile> {
        let _guard = self.lock()?;

        if self.find_live(|p| p.username == username && p.id != id).is_some() {
            return Err(StoreError::UsernameTaken);
        }

        let mut entry = self
            .profiles
            .get_mut(&id)
            .filter(|entry| !entry.value().is_deleted())
            .ok_or(StoreError::NotFound)?;
        let profile = entry.value_mut();
        profile.username = username.to_string();
        profile.updated_at = Utc::now();
        Ok(profile.clone())
    }

    async fn soft_delete(&self, id: i32) -> Result<bool> {
        let _guard = self.lock()?;

        match self.profiles.get_mut(&id) {
            Some(mut entry) if !entry.value().is_deleted() => {
                entry.value_mut().deleted_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WALLET: &str = "0x71C7656EC7ab88b098defB751B7401B5f6d8976F";

    fn new_profile(username: &str) -> NewProfile {
        NewProfile {
            wallet_address: WALLET.to_string(),
            chain_id: 11155111,
            username: username.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_find() {
        let store = MemoryProfileStore::new();
        let created = store.create(new_profile("alice")).await.unwrap();
        assert_eq!(created.id, 1);

        let by_wallet = store.find_by_wallet(WALLET, 11155111).await.unwrap().unwrap();
        assert_eq!(by_wallet.username, "alice");
        assert!(store.find_by_wallet(WALLET, 1).await.unwrap().is_none());
        assert!(store.find_by_username("alice").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_uniqueness() {
        let store = MemoryProfileStore::new();
        store.create(new_profile("alice")).await.unwrap();

        let same_wallet = store.create(new_profile("bob")).await;
        assert!(matches!(same_wallet, Err(StoreError::WalletTaken)));

        let mut other_wallet = new_profile("alice");
        other_wallet.chain_id = 1;
        assert!(matches!(store.create(other_wallet).await, Err(StoreError::UsernameTaken)));
    }

    #[tokio::test]
    async fn test_update_username() {
        let store = MemoryProfileStore::new();
        let alice = store.create(new_profile("alice")).await.unwrap();
        let mut other = new_profile("bob");
        other.chain_id = 1;
        store.create(other).await.unwrap();

        assert!(matches!(
            store.update_username(alice.id, "bob").await,
            Err(StoreError::UsernameTaken)
        ));
        let renamed = store.update_username(alice.id, "carol").await.unwrap();
        assert_eq!(renamed.username, "carol");
        assert!(renamed.updated_at >= alice.updated_at);
        assert!(matches!(store.update_username(99, "dave").await, Err(StoreError::NotFound)));
    }

    #[tokio::test]
    async fn test_soft_delete_frees_wallet_and_username() {
        let store = MemoryProfileStore::new();
        let alice = store.create(new_profile("alice")).await.unwrap();

        assert!(store.soft_delete(alice.id).await.unwrap());
        assert!(!store.soft_delete(alice.id).await.unwrap());
        assert!(store.find_by_id(alice.id).await.unwrap().is_none());

        let again = store.create(new_profile("alice")).await.unwrap();
        assert_ne!(again.id, alice.id);
    }
}
