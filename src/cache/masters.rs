//! Build-once cache of masters

use crate::cache::master::{ImageKey, Master, Naming};
use crate::error::{MastersError, MastersResult};
use crate::orchestration::{MachineLookup, MasterBuilder, Substrate};
use crate::preseed::{ConfigServer, ServerScope};
use crate::registry::ImageRegistry;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Maps image keys to masters, finding or building each one at most once.
///
/// `get` and `get_if_present` run under one cache-wide lock, and a build
/// holds it for its whole duration: the substrate does not tolerate
/// concurrent machine creation, so builds (and lookups queued behind them)
/// are serialized. Entries are never evicted.
pub struct MasterCache {
    masters: Mutex<HashMap<ImageKey, Arc<Master>>>,
    registry: Arc<ImageRegistry>,
    substrate: Arc<dyn Substrate>,
    builder: MasterBuilder,
    config_server: Arc<dyn ConfigServer>,
    naming: Naming,
    preconfiguration_url: String,
}

impl MasterCache {
    pub fn new(
        registry: Arc<ImageRegistry>,
        substrate: Arc<dyn Substrate>,
        builder: MasterBuilder,
        config_server: Arc<dyn ConfigServer>,
        naming: Naming,
        preconfiguration_url: String,
    ) -> Self {
        Self {
            masters: Mutex::new(HashMap::new()),
            registry,
            substrate,
            builder,
            config_server,
            naming,
            preconfiguration_url,
        }
    }

    /// Return the master for `key`, discovering or building it if needed.
    ///
    /// A failed call caches nothing; the next call starts over.
    pub async fn get(&self, key: &ImageKey) -> MastersResult<Arc<Master>> {
        let mut masters = self.masters.lock().await;
        if let Some(master) = masters.get(key) {
            debug!("Master cache hit for {}", key);
            return Ok(master.clone());
        }

        self.naming.validate(key)?;
        let machine_name = self.naming.machine_name(key);

        let master = match self.substrate.find_machine(&machine_name).await {
            MachineLookup::Found(machine) => {
                info!("Found existing master {} for {}", machine, key);
                Master::discovered(key.clone(), machine)
            }
            MachineLookup::NotFound => {
                info!("No master {} registered, building {}", machine_name, key);
                self.build(key, &machine_name).await?
            }
            MachineLookup::Failed(reason) => {
                return Err(MastersError::Substrate {
                    machine: machine_name,
                    reason,
                })
            }
        };

        let master = Arc::new(master);
        masters.insert(key.clone(), master.clone());
        Ok(master)
    }

    async fn build(&self, key: &ImageKey, machine_name: &str) -> MastersResult<Master> {
        let recipe = self.registry.recipe_for(key.as_str())?;

        let scope = ServerScope::start(
            self.config_server.clone(),
            &self.preconfiguration_url,
            &recipe.preseed_cfg,
        )
        .await?;
        let built = self.builder.build(recipe, machine_name).await;
        scope.close().await;

        let machine = built?;
        info!("Built master {} for {}", machine, key);
        Ok(Master::built(key.clone(), machine, recipe.clone()))
    }

    /// Return the cached master for `key` without touching the substrate
    pub async fn get_if_present(&self, key: &ImageKey) -> Option<Arc<Master>> {
        self.masters.lock().await.get(key).cloned()
    }

    /// Number of cached masters
    pub async fn len(&self) -> usize {
        self.masters.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Recipes this cache can build
    pub fn registry(&self) -> &ImageRegistry {
        &self.registry
    }
}
