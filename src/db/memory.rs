use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::db::{PlannerStore, StoreError};
use crate::models::account::{Favorite, UserPreferences, Wishlist};
use crate::models::share::SharedTrip;

#[derive(Default)]
struct Collections {
    favorites: Vec<Favorite>,
    wishlists: Vec<Wishlist>,
    shares: HashMap<String, SharedTrip>,
    preferences: HashMap<String, UserPreferences>,
}

/// Process-local store used when no database is configured, and in tests.
#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<Collections>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn collections(&self) -> MutexGuard<'_, Collections> {
        self.inner.lock().unwrap_or_else(|p| p.into_inner())
    }
}

#[async_trait]
impl PlannerStore for MemoryStore {
    fn backend_name(&self) -> &'static str {
        "memory"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }

    async fn list_favorites(&self, user_id: &str) -> Result<Vec<Favorite>, StoreError> {
        let mut favorites: Vec<Favorite> = self
            .collections()
            .favorites
            .iter()
            .filter(|f| f.user_id == user_id)
            .cloned()
            .collect();
        favorites.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(favorites)
    }

    async fn add_favorite(&self, favorite: Favorite) -> Result<Favorite, StoreError> {
        let mut collections = self.collections();
        if collections
            .favorites
            .iter()
            .any(|f| f.user_id == favorite.user_id && f.destination_key == favorite.destination_key)
        {
            return Err(StoreError::Conflict(format!(
                "{} is already a favorite",
                favorite.destination_name
            )));
        }
        collections.favorites.push(favorite.clone());
        Ok(favorite)
    }

    async fn remove_favorite(&self, user_id: &str, id: &str) -> Result<(), StoreError> {
        let mut collections = self.collections();
        let before = collections.favorites.len();
        collections
            .favorites
            .retain(|f| !(f.id == id && f.user_id == user_id));
        if collections.favorites.len() == before {
            return Err(StoreError::NotFound("Favorite"));
        }
        Ok(())
    }

    async fn list_wishlists(&self, user_id: &str) -> Result<Vec<Wishlist>, StoreError> {
        let mut wishlists: Vec<Wishlist> = self
            .collections()
            .wishlists
            .iter()
            .filter(|w| w.user_id == user_id)
            .cloned()
            .collect();
        wishlists.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(wishlists)
    }

    async fn get_wishlist(&self, user_id: &str, id: &str) -> Result<Wishlist, StoreError> {
        self.collections()
            .wishlists
            .iter()
            .find(|w| w.id == id && w.user_id == user_id)
            .cloned()
            .ok_or(StoreError::NotFound("Wishlist"))
    }

    async fn create_wishlist(&self, wishlist: Wishlist) -> Result<Wishlist, StoreError> {
        self.collections().wishlists.push(wishlist.clone());
        Ok(wishlist)
    }

    async fn save_wishlist(&self, wishlist: Wishlist) -> Result<Wishlist, StoreError> {
        let mut collections = self.collections();
        let slot = collections
            .wishlists
            .iter_mut()
            .find(|w| w.id == wishlist.id && w.user_id == wishlist.user_id)
            .ok_or(StoreError::NotFound("Wishlist"))?;
        *slot = wishlist.clone();
        Ok(wishlist)
    }

    async fn delete_wishlist(&self, user_id: &str, id: &str) -> Result<(), StoreError> {
        let mut collections = self.collections();
        let before = collections.wishlists.len();
        collections
            .wishlists
            .retain(|w| !(w.id == id && w.user_id == user_id));
        if collections.wishlists.len() == before {
            return Err(StoreError::NotFound("Wishlist"));
        }
        Ok(())
    }

    async fn create_share(&self, share: SharedTrip) -> Result<SharedTrip, StoreError> {
        self.collections()
            .shares
            .insert(share.id.clone(), share.clone());
        Ok(share)
    }

    async fn get_share(&self, id: &str) -> Result<SharedTrip, StoreError> {
        self.collections()
            .shares
            .get(id)
            .cloned()
            .ok_or(StoreError::NotFound("Shared trip"))
    }

    async fn get_preferences(
        &self,
        user_id: &str,
    ) -> Result<Option<UserPreferences>, StoreError> {
        Ok(self.collections().preferences.get(user_id).cloned())
    }

    async fn put_preferences(
        &self,
        preferences: UserPreferences,
    ) -> Result<UserPreferences, StoreError> {
        self.collections()
            .preferences
            .insert(preferences.user_id.clone(), preferences.clone());
        Ok(preferences)
    }
}
