//! Images command - list buildable images

use crate::cli::args::{ImagesArgs, OutputFormat};
use crate::cli::load_registry;
use crate::error::MastersResult;
use crate::registry::{BuildRecipe, ImageRegistry};
use crate::ui::{self, UiContext};
use console::style;
use serde::Serialize;
use std::path::Path;

#[derive(Debug, Serialize)]
struct ImageView<'a> {
    id: &'a str,
    name: &'a str,
    os_family: &'a str,
    os_version: &'a str,
    os_64bit: bool,
    iso: &'a str,
}

impl<'a> From<&'a BuildRecipe> for ImageView<'a> {
    fn from(recipe: &'a BuildRecipe) -> Self {
        Self {
            id: &recipe.id,
            name: &recipe.name,
            os_family: &recipe.os_family,
            os_version: &recipe.os_version,
            os_64bit: recipe.os_64bit,
            iso: &recipe.iso,
        }
    }
}

/// Execute the images command
pub async fn execute(args: ImagesArgs, images: &Path) -> MastersResult<()> {
    let registry = load_registry(images).await?;

    if registry.is_empty() {
        match args.format {
            OutputFormat::Json => println!("[]"),
            OutputFormat::Plain => {}
            OutputFormat::Table => {
                let ctx = UiContext::detect();
                ui::step_info(&ctx, &format!("No images defined in {}", images.display()));
            }
        }
        return Ok(());
    }

    match args.format {
        OutputFormat::Table => print_table(&registry),
        OutputFormat::Json => print_json(&registry)?,
        OutputFormat::Plain => print_plain(&registry),
    }

    Ok(())
}

fn os_label(recipe: &BuildRecipe) -> String {
    let arch = if recipe.os_64bit { "64-bit" } else { "32-bit" };
    format!("{} {} {}", recipe.os_family, recipe.os_version, arch)
        .trim()
        .to_string()
}

fn print_table(registry: &ImageRegistry) {
    println!(
        "{:<20} {:<24} {:<50}",
        style("ID").bold(),
        style("OS").bold(),
        style("ISO").bold()
    );
    println!("{}", "-".repeat(94));

    for recipe in registry.recipes() {
        println!("{:<20} {:<24} {:<50}", recipe.id, os_label(recipe), recipe.iso);
    }

    println!();
    println!("{} image(s)", registry.len());
}

fn print_json(registry: &ImageRegistry) -> MastersResult<()> {
    let views: Vec<ImageView<'_>> = registry.recipes().map(ImageView::from).collect();
    println!("{}", serde_json::to_string_pretty(&views)?);
    Ok(())
}

fn print_plain(registry: &ImageRegistry) {
    for recipe in registry.recipes() {
        println!("{}", recipe.id);
    }
}
