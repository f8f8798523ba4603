use async_trait::async_trait;
use futures::TryStreamExt;
use log::{info, warn};
use bson::doc;
use mongodb::{
    options::{ClientOptions, ServerApi, ServerApiVersion},
    Client, Collection, Database,
};
use std::time::Duration;

use crate::db::{PlannerStore, StoreError};
use crate::models::account::{Favorite, UserPreferences, Wishlist};
use crate::models::share::SharedTrip;

const FAVORITES: &str = "Favorites";
const WISHLISTS: &str = "Wishlists";
const SHARES: &str = "SharedTrips";
const PREFERENCES: &str = "Preferences";

pub async fn create_mongo_client(uri: &str) -> Result<Client, mongodb::error::Error> {
    info!("Connecting to MongoDB");

    let mut client_options = ClientOptions::parse(uri).await?;

    client_options.connect_timeout = Some(Duration::from_secs(10));
    client_options.server_selection_timeout = Some(Duration::from_secs(10));
    client_options.max_pool_size = Some(10);
    client_options.min_pool_size = Some(1);

    // MongoDB 5.0+
    let server_api = ServerApi::builder().version(ServerApiVersion::V1).build();
    client_options.server_api = Some(server_api);

    let client = Client::with_options(client_options)?;

    match client
        .database("admin")
        .run_command(doc! {"ping": 1})
        .await
    {
        Ok(_) => info!("Connected to MongoDB and verified with ping"),
        Err(e) => warn!("Connected to MongoDB but ping failed: {}", e),
    }

    Ok(client)
}

pub struct MongoStore {
    db: Database,
}

impl MongoStore {
    pub fn new(client: &Client, database: &str) -> Self {
        Self {
            db: client.database(database),
        }
    }

    fn favorites(&self) -> Collection<Favorite> {
        self.db.collection(FAVORITES)
    }

    fn wishlists(&self) -> Collection<Wishlist> {
        self.db.collection(WISHLISTS)
    }

    fn shares(&self) -> Collection<SharedTrip> {
        self.db.collection(SHARES)
    }

    fn preferences(&self) -> Collection<UserPreferences> {
        self.db.collection(PREFERENCES)
    }
}

#[async_trait]
impl PlannerStore for MongoStore {
    fn backend_name(&self) -> &'static str {
        "mongodb"
    }

    async fn ping(&self) -> Result<(), StoreError> {
        self.db.run_command(doc! {"ping": 1}).await?;
        Ok(())
    }

    async fn list_favorites(&self, user_id: &str) -> Result<Vec<Favorite>, StoreError> {
        let cursor = self
            .favorites()
            .find(doc! { "userId": user_id })
            .sort(doc! { "createdAt": -1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn add_favorite(&self, favorite: Favorite) -> Result<Favorite, StoreError> {
        let existing = self
            .favorites()
            .find_one(doc! {
                "userId": &favorite.user_id,
                "destinationKey": &favorite.destination_key,
            })
            .await?;
        if existing.is_some() {
            return Err(StoreError::Conflict(format!(
                "{} is already a favorite",
                favorite.destination_name
            )));
        }

        self.favorites().insert_one(&favorite).await?;
        Ok(favorite)
    }

    async fn remove_favorite(&self, user_id: &str, id: &str) -> Result<(), StoreError> {
        let result = self
            .favorites()
            .delete_one(doc! { "_id": id, "userId": user_id })
            .await?;
        if result.deleted_count == 0 {
            return Err(StoreError::NotFound("Favorite"));
        }
        Ok(())
    }

    async fn list_wishlists(&self, user_id: &str) -> Result<Vec<Wishlist>, StoreError> {
        let cursor = self
            .wishlists()
            .find(doc! { "userId": user_id })
            .sort(doc! { "updatedAt": -1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn get_wishlist(&self, user_id: &str, id: &str) -> Result<Wishlist, StoreError> {
        self.wishlists()
            .find_one(doc! { "_id": id, "userId": user_id })
            .await?
            .ok_or(StoreError::NotFound("Wishlist"))
    }

    async fn create_wishlist(&self, wishlist: Wishlist) -> Result<Wishlist, StoreError> {
        self.wishlists().insert_one(&wishlist).await?;
        Ok(wishlist)
    }

    async fn save_wishlist(&self, wishlist: Wishlist) -> Result<Wishlist, StoreError> {
        let result = self
            .wishlists()
            .replace_one(
                doc! { "_id": &wishlist.id, "userId": &wishlist.user_id },
                &wishlist,
            )
            .await?;
        if result.matched_count == 0 {
            return Err(StoreError::NotFound("Wishlist"));
        }
        Ok(wishlist)
    }

    async fn delete_wishlist(&self, user_id: &str, id: &str) -> Result<(), StoreError> {
        let result = self
            .wishlists()
            .delete_one(doc! { "_id": id, "userId": user_id })
            .await?;
        if result.deleted_count == 0 {
            return Err(StoreError::NotFound("Wishlist"));
        }
        Ok(())
    }

    async fn create_share(&self, share: SharedTrip) -> Result<SharedTrip, StoreError> {
        self.shares().insert_one(&share).await?;
        Ok(share)
    }

    async fn get_share(&self, id: &str) -> Result<SharedTrip, StoreError> {
        self.shares()
            .find_one(doc! { "_id": id })
            .await?
            .ok_or(StoreError::NotFound("Shared trip"))
    }

    async fn get_preferences(
        &self,
        user_id: &str,
    ) -> Result<Option<UserPreferences>, StoreError> {
        Ok(self.preferences().find_one(doc! { "_id": user_id }).await?)
    }

    async fn put_preferences(
        &self,
        preferences: UserPreferences,
    ) -> Result<UserPreferences, StoreError> {
        self.preferences()
            .replace_one(doc! { "_id": &preferences.user_id }, &preferences)
            .upsert(true)
            .await?;
        Ok(preferences)
    }
}
