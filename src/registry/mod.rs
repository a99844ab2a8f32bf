//! Image registry
//!
//! Read-only mapping from image key to build recipe, loaded once at startup.
//! Nothing mutates it afterwards, so it is shared as a plain `Arc` with no lock.

mod recipe;

pub use recipe::{BuildRecipe, DiskSettings, LoginCredentials};

use crate::error::{MastersError, MastersResult};
use recipe::RecipeDocument;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Recipes keyed by image id
#[derive(Debug, Clone, Default)]
pub struct ImageRegistry {
    recipes: BTreeMap<String, BuildRecipe>,
}

impl ImageRegistry {
    /// Build a registry from recipes, rejecting duplicate ids
    pub fn from_recipes(
        recipes: impl IntoIterator<Item = BuildRecipe>,
    ) -> Result<Self, String> {
        let mut map = BTreeMap::new();
        for recipe in recipes {
            if recipe.id.is_empty() {
                return Err("image with empty id".to_string());
            }
            if map.contains_key(&recipe.id) {
                return Err(format!("duplicate image id '{}'", recipe.id));
            }
            map.insert(recipe.id.clone(), recipe);
        }
        Ok(Self { recipes: map })
    }

    /// Load recipes from a TOML file on disk
    pub async fn load(path: &Path) -> MastersResult<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            MastersError::io(format!("reading image registry {}", path.display()), e)
        })?;
        let registry = Self::parse(&content).map_err(|reason| MastersError::RegistryInvalid {
            path: path.to_path_buf(),
            reason,
        })?;
        debug!(
            "Loaded {} image recipe(s) from {}",
            registry.len(),
            path.display()
        );
        Ok(registry)
    }

    /// Parse recipes from a TOML string
    pub fn parse(content: &str) -> Result<Self, String> {
        let document: RecipeDocument = toml::from_str(content).map_err(|e| e.to_string())?;
        Self::from_recipes(document.images)
    }

    /// Recipe for an image key; a missing recipe means the key cannot be built
    pub fn recipe_for(&self, key: &str) -> MastersResult<&BuildRecipe> {
        self.recipes
            .get(key)
            .ok_or_else(|| MastersError::invalid_key(key, "no recipe registered for this image"))
    }

    /// Iterate recipes in key order
    pub fn recipes(&self) -> impl Iterator<Item = &BuildRecipe> {
        self.recipes.values()
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }
}
