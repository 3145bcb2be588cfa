//! Shared server state.

use anyhow::Result;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use uuid::Uuid;

use skyguard_core::artifact::ArtifactSigner;
use skyguard_core::zones::ZoneIndex;

use crate::config::Config;
use crate::persistence::{self, Database};

pub struct AppState {
    db: Database,
    config: Config,
    signer: ArtifactSigner,
    /// Rebuilt from the database whenever the zone dataset changes.
    zones: RwLock<ZoneIndex>,
    /// Per-flight append serialization. Appends for different flights
    /// proceed in parallel; appends for the same flight queue here so the
    /// chain tail read and insert happen without interleaving.
    append_locks: DashMap<Uuid, Arc<Mutex<()>>>,
}

impl AppState {
    pub fn new(db: Database, config: Config, signer: ArtifactSigner) -> Self {
        Self {
            db,
            config,
            signer,
            zones: RwLock::new(ZoneIndex::default()),
            append_locks: DashMap::new(),
        }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn signer(&self) -> &ArtifactSigner {
        &self.signer
    }

    pub fn zones(&self) -> &RwLock<ZoneIndex> {
        &self.zones
    }

    /// Rebuild the in-memory zone index from persisted zones.
    pub async fn reload_zones(&self) -> Result<()> {
        let records = persistence::zones::load_all_zones(self.db.pool()).await?;
        let index = ZoneIndex::new(records)?;
        *self.zones.write().await = index;
        Ok(())
    }

    pub fn append_lock(&self, flight_id: Uuid) -> Arc<Mutex<()>> {
        self.append_locks
            .entry(flight_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }
}
