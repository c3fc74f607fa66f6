use async_trait::async_trait;
use bson::{doc, Document};
use mongodb::options::{
    ClientOptions, Credential, FindOneAndUpdateOptions, IndexOptions, ResolverConfig, ReturnDocument,
};
use mongodb::{Client, Collection, Database, IndexModel};
use tracing::{error, info, instrument};

use crate::config::MongoConfig;
use crate::repository::repository_error::{RepositoryError, RepositoryResult};

/// Open a client from `MongoConfig` and return the configured database
#[instrument(skip(config), fields(database = %config.database))]
pub async fn connect(config: &MongoConfig) -> Result<Database, mongodb::error::Error> {
    let mut client_options = ClientOptions::parse_with_resolver_config(&config.uri, ResolverConfig::cloudflare()).await?;
    client_options.app_name = Some("SwachhtaPrahariBackend".to_string());
    client_options.max_pool_size = Some(config.pool_size);
    client_options.connect_timeout = Some(std::time::Duration::from_secs(config.connection_timeout_secs));

    if let (Some(username), Some(password)) = (&config.username, &config.password) {
        client_options.credential = Some(
            Credential::builder()
                .username(username.clone())
                .password(password.clone())
                .build(),
        );
    }

    let client = Client::with_options(client_options)?;
    let db = client.database(&config.database);
    db.run_command(doc! { "ping": 1 }, None).await?;
    info!("Connected to MongoDB");
    Ok(db)
}

pub(crate) async fn create_index<T>(
    collection: &Collection<T>,
    keys: Document,
    options: Option<IndexOptions>,
) -> RepositoryResult<()> {
    let model = IndexModel::builder().keys(keys).options(options).build();
    collection.create_index(model, None).await.map_err(|e| {
        error!("Failed to create index on {}: {}", collection.name(), e);
        RepositoryError::database(format!("Failed to create index on {}: {}", collection.name(), e))
    })?;
    Ok(())
}

pub(crate) fn unique() -> Option<IndexOptions> {
    Some(IndexOptions::builder().unique(true).build())
}

/// Store-side monotonically increasing sequences
#[async_trait]
pub trait CounterRepository: Send + Sync {
    /// Atomically increments and returns the counter called `name`, starting at 1
    async fn next_sequence(&self, name: &str) -> RepositoryResult<i64>;
}

pub struct MongoCounterRepository {
    collection: Collection<Document>,
}

impl MongoCounterRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            collection: db.collection::<Document>("counters"),
        }
    }
}

#[async_trait]
impl CounterRepository for MongoCounterRepository {
    #[instrument(skip(self))]
    async fn next_sequence(&self, name: &str) -> RepositoryResult<i64> {
        let options = FindOneAndUpdateOptions::builder()
            .upsert(true)
            .return_document(ReturnDocument::After)
            .build();
        let counter = self
            .collection
            .find_one_and_update(doc! { "_id": name }, doc! { "$inc": { "seq": 1_i64 } }, options)
            .await
            .map_err(|e| RepositoryError::database(format!("Failed to advance counter {}: {}", name, e)))?
            .ok_or_else(|| RepositoryError::database(format!("Counter {} missing after upsert", name)))?;

        counter
            .get_i64("seq")
            .or_else(|_| counter.get_i32("seq").map(i64::from))
            .map_err(|e| RepositoryError::serialization(format!("Counter {} has no numeric seq: {}", name, e)))
    }
}
