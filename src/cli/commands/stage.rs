//! Stage command - download an image's ISOs ahead of a build

use crate::cli::args::StageArgs;
use crate::cli::load_registry;
use crate::config::Config;
use crate::error::MastersResult;
use crate::orchestration::{create_builder, create_substrate};
use crate::ui::{self, TaskSpinner, UiContext};
use std::path::Path;
use std::sync::Arc;

/// Execute the stage command
pub async fn execute(args: StageArgs, config: &Config, images: &Path) -> MastersResult<()> {
    let ctx = UiContext::detect();
    let registry = load_registry(images).await?;

    // Fail on unknown keys before downloading anything
    let recipes = args
        .keys
        .iter()
        .map(|key| registry.recipe_for(key))
        .collect::<MastersResult<Vec<_>>>()?;

    let builder = create_builder(config, Arc::new(create_substrate(config))).await?;

    for recipe in recipes {
        let mut spinner = TaskSpinner::new(&ctx);
        spinner.start(&format!("Staging ISOs for {}...", recipe.id));

        match builder.stage(recipe).await {
            Ok(staged) => {
                spinner.stop(&format!("Staged {}", recipe.id));
                ui::key_value(&ctx, "Install ISO", &staged.install_iso.display().to_string());
                ui::key_value(
                    &ctx,
                    "Guest additions",
                    &staged.guest_additions_iso.display().to_string(),
                );
            }
            Err(e) => {
                spinner.stop_error(&format!("Staging {} failed", recipe.id));
                return Err(e);
            }
        }
    }

    Ok(())
}
