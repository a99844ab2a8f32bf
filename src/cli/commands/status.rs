//! Status command - check VirtualBox and the state of each master

use crate::artifact::file_name_for;
use crate::cache::{ImageKey, Naming};
use crate::cli::load_registry;
use crate::config::{self, Config};
use crate::error::MastersResult;
use crate::orchestration::{create_substrate, resolve_version, MachineLookup, Substrate, VBoxManage};
use crate::registry::ImageRegistry;
use crate::ui::{self, UiContext};
use std::path::Path;

/// Execute the status command
pub async fn execute(config: &Config, images: &Path) -> MastersResult<()> {
    let ctx = UiContext::detect();
    ui::intro(&ctx, "Masters Status");

    let vbox = create_substrate(config);
    let installed = check_virtualbox(&ctx, config, &vbox).await;

    ui::section(&ctx, "Workspace");
    let working_dir = config::working_dir(config);
    ui::key_value_status(
        &ctx,
        "Working dir",
        &working_dir.display().to_string(),
        working_dir.is_dir(),
    );
    ui::key_value_status(&ctx, "Images", &images.display().to_string(), images.exists());

    let registry = load_registry(images).await?;
    if registry.is_empty() {
        ui::step_info(&ctx, "No images defined");
    } else {
        check_masters(&ctx, config, &registry, installed.then_some(&vbox)).await;
    }

    if installed {
        ui::outro_success(&ctx, "VirtualBox ready");
    } else {
        ui::outro_error(&ctx, "VirtualBox not available - masters cannot be built");
    }

    Ok(())
}

async fn check_virtualbox(ctx: &UiContext, config: &Config, vbox: &VBoxManage) -> bool {
    ui::section(ctx, "VirtualBox");

    if !vbox.is_installed().await {
        ui::step_warn_hint(
            ctx,
            &format!("{} not found", config.substrate.vboxmanage),
            "Install VirtualBox or set substrate.vboxmanage",
        );
        return false;
    }

    match resolve_version(config, vbox).await {
        Ok(version) => {
            ui::step_ok_detail(ctx, "VBoxManage", &version.to_string());
            ui::key_value(ctx, "Guest additions", &version.guest_additions_url());
            true
        }
        Err(e) => {
            ui::step_error(ctx, &e.to_string());
            false
        }
    }
}

async fn check_masters(
    ctx: &UiContext,
    config: &Config,
    registry: &ImageRegistry,
    vbox: Option<&VBoxManage>,
) {
    ui::section(ctx, "Masters");
    let naming = Naming::from(&config.naming);
    let isos = config::isos_dir(config);

    for recipe in registry.recipes() {
        let name = naming.machine_name(&ImageKey::from(recipe.id.as_str()));

        let staged = file_name_for(&recipe.iso)
            .map(|file| isos.join(file).exists())
            .unwrap_or(false);
        let iso_note = if staged { "ISO staged" } else { "ISO not staged" };

        match vbox {
            None => ui::remark(ctx, &format!("{}: {}", name, iso_note)),
            Some(vbox) => match vbox.find_machine(&name).await {
                MachineLookup::Found(machine) => {
                    ui::step_ok_detail(ctx, &name, &format!("registered {}", machine.id))
                }
                MachineLookup::NotFound => {
                    ui::step_info(ctx, &format!("{}: not built, {}", name, iso_note))
                }
                MachineLookup::Failed(reason) => {
                    ui::step_error(ctx, &format!("{}: lookup failed: {}", name, reason))
                }
            },
        }
    }
}
