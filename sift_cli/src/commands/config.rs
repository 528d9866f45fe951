use crate::cli::{Cli, ConfigAction};
use crate::commands::{config_store, Result};
use crate::output::{format_output, OutputData};
use owo_colors::OwoColorize;
use sift_core::SearchConfig;

pub fn run(cli: &Cli, action: &ConfigAction) -> Result<()> {
    let store = config_store(cli);
    match action {
        ConfigAction::Show => {
            let config = store.load()?;
            format_output(
                &OutputData::Config {
                    path: store.path().display().to_string(),
                    exists: store.exists(),
                    config,
                },
                &cli.output,
            )
        }
        ConfigAction::Path => {
            println!("{}", store.path().display());
            Ok(())
        }
        ConfigAction::Init { force } => {
            if store.exists() && !force {
                println!(
                    "{} {} already exists (use --force to overwrite)",
                    "•".yellow(),
                    store.path().display()
                );
                return Ok(());
            }
            store.save(&SearchConfig::default())?;
            println!("{} Wrote {}", "✓".green(), store.path().display());
            Ok(())
        }
    }
}
