pub mod aggregates;

use crate::{
    models::{Bootcamp, Course, Resource, Review, User},
    utils::config::DatabaseConfig,
};
use anyhow::{Context, Result};
use mongodb::{
    bson::{doc, Document},
    options::IndexOptions,
    Client, Collection, IndexModel,
};

/// MongoDB handle shared by every request. Cloning is cheap.
#[derive(Clone)]
pub struct Database {
    client: Client,
    db: mongodb::Database,
}

impl Database {
    /// Create a client without touching the network; connections are opened on first use
    pub async fn new(uri: &str, name: &str) -> Result<Self> {
        let client = Client::with_uri_str(uri)
            .await
            .context("Invalid MongoDB connection string")?;
        let db = client.database(name);
        Ok(Self { client, db })
    }

    /// Create a client and verify the server answers
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let database = Self::new(&config.uri, &config.name).await?;
        database
            .db
            .run_command(doc! { "ping": 1 })
            .await
            .context("Failed to ping MongoDB")?;
        tracing::info!(database = %config.name, "MongoDB connected");
        Ok(database)
    }

    /// Get a reference to the underlying driver database
    pub fn inner(&self) -> &mongodb::Database {
        &self.db
    }

    /// Typed collection for a resource
    pub fn collection<R: Resource + Send + Sync>(&self) -> Collection<R> {
        self.db.collection::<R>(R::COLLECTION)
    }

    /// Untyped view of a resource's collection, for projections and pipelines
    pub fn raw<R: Resource>(&self) -> Collection<Document> {
        self.db.collection::<Document>(R::COLLECTION)
    }

    pub fn bootcamps(&self) -> Collection<Bootcamp> {
        self.collection()
    }

    pub fn courses(&self) -> Collection<Course> {
        self.collection()
    }

    pub fn reviews(&self) -> Collection<Review> {
        self.collection()
    }

    pub fn users(&self) -> Collection<User> {
        self.collection()
    }

    /// Create the unique and geospatial indexes the API relies on
    pub async fn ensure_indexes(&self) -> Result<()> {
        let unique = || IndexOptions::builder().unique(true).build();

        self.users()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "email": 1 })
                    .options(unique())
                    .build(),
            )
            .await
            .context("Failed to create users.email index")?;

        self.bootcamps()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "name": 1 })
                    .options(unique())
                    .build(),
            )
            .await
            .context("Failed to create bootcamps.name index")?;

        self.bootcamps()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "location": "2dsphere" })
                    .build(),
            )
            .await
            .context("Failed to create bootcamps.location index")?;

        self.courses()
            .create_index(IndexModel::builder().keys(doc! { "bootcamp": 1 }).build())
            .await
            .context("Failed to create courses.bootcamp index")?;

        // One review per user per bootcamp
        self.reviews()
            .create_index(
                IndexModel::builder()
                    .keys(doc! { "bootcamp": 1, "user": 1 })
                    .options(unique())
                    .build(),
            )
            .await
            .context("Failed to create reviews.bootcamp_user index")?;

        tracing::debug!("MongoDB indexes ensured");
        Ok(())
    }

    /// Close pooled connections; call once the server has stopped
    pub async fn shutdown(self) {
        self.client.shutdown().await;
        tracing::info!("MongoDB connection closed");
    }
}
