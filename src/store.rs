//! Location store
//!
//! Caches resolved place names as `Location` rows keyed by normalized name.
//! Rows are created lazily, first write wins, and nothing is ever updated or
//! deleted here.

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow, bail};
use async_trait::async_trait;
use fjall::Keyspace;
use tokio::task;

use crate::models::{Coordinates, Location, normalize_name};

#[async_trait]
pub trait LocationStore: Send + Sync {
    /// Look a location up by (normalized) name
    async fn get(&self, name: &str) -> Result<Option<Location>>;

    /// Return the stored location for `name`, creating it from `coordinates`
    /// when absent. An existing row is returned unchanged even if
    /// `coordinates` differ.
    async fn get_or_create(&self, name: &str, coordinates: Coordinates) -> Result<Location>;
}

fn checked_key(name: &str) -> Result<String> {
    let key = normalize_name(name);
    if key.is_empty() {
        bail!("location name must not be empty");
    }
    Ok(key)
}

/// Row to insert for `name`, keyed the way lookups key it
fn candidate_row(name: &str, coordinates: Coordinates) -> Result<(String, Location)> {
    let candidate = Location::new(name.trim(), coordinates);
    let key = candidate.key();
    if key.is_empty() {
        bail!("location name must not be empty");
    }
    Ok((key, candidate))
}

fn get_from_store(store: &Keyspace, key: Vec<u8>) -> Result<Option<Vec<u8>>> {
    Ok(store.get(key)?.map(|v| v.to_vec()))
}

/// Location table persisted in a fjall keyspace, values encoded with postcard
pub struct FjallLocationStore {
    _db: fjall::Database,
    store: Keyspace,
    // Held across the existence check and the insert of `get_or_create`
    write_lock: Arc<Mutex<()>>,
}

impl FjallLocationStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let db = fjall::Database::builder(&path).open()?;
        let store = db.keyspace("locations", fjall::KeyspaceCreateOptions::default)?;
        tracing::debug!("Opened location store at {}", path.as_ref().display());
        Ok(Self {
            _db: db,
            store,
            write_lock: Arc::new(Mutex::new(())),
        })
    }
}

#[async_trait]
impl LocationStore for FjallLocationStore {
    #[tracing::instrument(name = "location_get", level = "debug", skip(self))]
    async fn get(&self, name: &str) -> Result<Option<Location>> {
        let key = checked_key(name)?;
        let store = self.store.clone();

        let maybe_bytes = task::spawn_blocking(move || get_from_store(&store, key.into_bytes())).await??;

        match maybe_bytes {
            Some(bytes) => {
                tracing::debug!("Location found");
                Ok(Some(postcard::from_bytes(&bytes)?))
            }
            None => {
                tracing::debug!("Location not found");
                Ok(None)
            }
        }
    }

    #[tracing::instrument(name = "location_get_or_create", level = "debug", skip(self))]
    async fn get_or_create(&self, name: &str, coordinates: Coordinates) -> Result<Location> {
        let (key, candidate) = candidate_row(name, coordinates)?;
        let store = self.store.clone();
        let write_lock = Arc::clone(&self.write_lock);

        task::spawn_blocking(move || -> Result<Location> {
            let _guard = write_lock
                .lock()
                .map_err(|_| anyhow!("location store lock poisoned"))?;

            if let Some(bytes) = get_from_store(&store, key.clone().into_bytes())? {
                let existing: Location = postcard::from_bytes(&bytes)?;
                tracing::debug!("Reusing stored location '{}'", existing.name);
                return Ok(existing);
            }

            let bytes = postcard::to_stdvec(&candidate)?;
            store.insert(key.into_bytes(), bytes)?;
            tracing::info!(
                "Stored new location '{}' at ({})",
                candidate.name,
                candidate.coordinates()
            );
            Ok(candidate)
        })
        .await?
    }
}

/// Process-local location table, for tests and ephemeral runs
#[derive(Default)]
pub struct InMemoryLocationStore {
    rows: tokio::sync::Mutex<HashMap<String, Location>>,
}

impl InMemoryLocationStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.rows.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.rows.lock().await.is_empty()
    }
}

#[async_trait]
impl LocationStore for InMemoryLocationStore {
    async fn get(&self, name: &str) -> Result<Option<Location>> {
        let key = checked_key(name)?;
        Ok(self.rows.lock().await.get(&key).cloned())
    }

    async fn get_or_create(&self, name: &str, coordinates: Coordinates) -> Result<Location> {
        let (key, candidate) = candidate_row(name, coordinates)?;
        let mut rows = self.rows.lock().await;
        Ok(rows.entry(key).or_insert(candidate).clone())
    }
}
