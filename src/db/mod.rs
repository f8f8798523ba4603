pub mod memory;
pub mod mongo;

use async_trait::async_trait;
use thiserror::Error;

use crate::models::account::{Favorite, UserPreferences, Wishlist};
use crate::models::share::SharedTrip;

pub use memory::MemoryStore;
pub use mongo::MongoStore;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("{0}")]
    Conflict(String),
    #[error("Storage backend error: {0}")]
    Backend(String),
}

impl From<mongodb::error::Error> for StoreError {
    fn from(err: mongodb::error::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}

/// Per-user saved data. Every call is scoped to one user id except shares,
/// which anyone with the id may read.
#[async_trait]
pub trait PlannerStore: Send + Sync {
    fn backend_name(&self) -> &'static str;

    async fn ping(&self) -> Result<(), StoreError>;

    async fn list_favorites(&self, user_id: &str) -> Result<Vec<Favorite>, StoreError>;
    /// Fails with `Conflict` if the user already saved this destination.
    async fn add_favorite(&self, favorite: Favorite) -> Result<Favorite, StoreError>;
    async fn remove_favorite(&self, user_id: &str, id: &str) -> Result<(), StoreError>;

    async fn list_wishlists(&self, user_id: &str) -> Result<Vec<Wishlist>, StoreError>;
    async fn get_wishlist(&self, user_id: &str, id: &str) -> Result<Wishlist, StoreError>;
    async fn create_wishlist(&self, wishlist: Wishlist) -> Result<Wishlist, StoreError>;
    /// Replace an existing wishlist owned by `wishlist.user_id`.
    async fn save_wishlist(&self, wishlist: Wishlist) -> Result<Wishlist, StoreError>;
    async fn delete_wishlist(&self, user_id: &str, id: &str) -> Result<(), StoreError>;

    async fn create_share(&self, share: SharedTrip) -> Result<SharedTrip, StoreError>;
    async fn get_share(&self, id: &str) -> Result<SharedTrip, StoreError>;

    async fn get_preferences(&self, user_id: &str)
        -> Result<Option<UserPreferences>, StoreError>;
    async fn put_preferences(&self, preferences: UserPreferences)
        -> Result<UserPreferences, StoreError>;
}
