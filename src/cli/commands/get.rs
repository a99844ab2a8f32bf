//! Get command - resolve masters, building missing ones

use crate::cache::{ImageKey, Master, MasterOrigin};
use crate::cli::args::{GetArgs, OutputFormat};
use crate::cli::load_registry;
use crate::config::Config;
use crate::error::MastersResult;
use crate::orchestration::create_cache;
use crate::ui::{self, TaskSpinner, UiContext};
use chrono::{DateTime, Utc};
use console::style;
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;

/// Serialized view of a master
#[derive(Debug, Serialize)]
struct MasterView<'a> {
    key: &'a str,
    machine_id: &'a str,
    machine_name: &'a str,
    origin: String,
    acquired_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    recipe: Option<&'a str>,
}

impl<'a> From<&'a Master> for MasterView<'a> {
    fn from(master: &'a Master) -> Self {
        Self {
            key: master.key().as_str(),
            machine_id: &master.machine().id,
            machine_name: &master.machine().name,
            origin: master.origin().to_string(),
            acquired_at: master.acquired_at(),
            recipe: master.recipe().map(|r| r.id.as_str()),
        }
    }
}

/// Execute the get command
pub async fn execute(args: GetArgs, config: &Config, images: &Path) -> MastersResult<()> {
    let ctx = UiContext::detect();
    let show_progress = matches!(args.format, OutputFormat::Table);

    let registry = load_registry(images).await?;
    let cache = create_cache(config, registry).await?;

    let mut masters: Vec<Arc<Master>> = Vec::with_capacity(args.keys.len());
    for key in args.keys {
        let key = ImageKey::from(key);
        let mut spinner = TaskSpinner::new(&ctx);
        if show_progress {
            spinner.start(&format!("Resolving master {}...", key));
        }

        match cache.get(&key).await {
            Ok(master) => {
                if show_progress {
                    spinner.stop(&format!("{} ready ({})", key, master.origin()));
                }
                masters.push(master);
            }
            Err(e) => {
                if show_progress {
                    spinner.stop_error(&format!("{} failed", key));
                }
                return Err(e);
            }
        }
    }

    match args.format {
        OutputFormat::Table => print_table(&ctx, &masters),
        OutputFormat::Json => print_json(&masters)?,
        OutputFormat::Plain => print_plain(&masters),
    }

    Ok(())
}

fn print_table(ctx: &UiContext, masters: &[Arc<Master>]) {
    ui::section(ctx, "Masters");

    println!(
        "{:<20} {:<36} {:<12} {:<30}",
        style("IMAGE").bold(),
        style("MACHINE ID").bold(),
        style("ORIGIN").bold(),
        style("NAME").bold()
    );
    println!("{}", "-".repeat(100));

    for master in masters {
        let origin = match master.origin() {
            MasterOrigin::Built => style("built").green(),
            MasterOrigin::Discovered => style("discovered").cyan(),
        };
        println!(
            "{:<20} {:<36} {:<12} {:<30}",
            master.key(),
            master.machine().id,
            origin,
            master.machine().name
        );
    }
}

fn print_json(masters: &[Arc<Master>]) -> MastersResult<()> {
    let views: Vec<MasterView<'_>> = masters.iter().map(|m| MasterView::from(m.as_ref())).collect();
    println!("{}", serde_json::to_string_pretty(&views)?);
    Ok(())
}

fn print_plain(masters: &[Arc<Master>]) {
    for master in masters {
        println!("{}", master.machine().name);
    }
}
