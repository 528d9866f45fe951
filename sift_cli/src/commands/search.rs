use crate::cli::{Cli, SearchArgs};
use crate::commands::{config_store, CommandError, Result};
use crate::output::{format_output, OutputData};
use sift_core::{EntityStore, MemoryCatalog, SearchSettings, Taxon};
use tracing::debug;

pub async fn run(cli: &Cli, args: &SearchArgs) -> Result<()> {
    let config = config_store(cli).load()?;
    let catalog = MemoryCatalog::from_path(&args.catalog)?;

    let taxon = match &args.taxon {
        Some(name) => Some(resolve_taxon(&catalog, name).await?),
        None => None,
    };

    let settings = build_settings(args, taxon);
    debug!(
        target: "sift::cli",
        catalog = %args.catalog.display(),
        kinds = settings.kinds.len(),
        "Searching"
    );

    let service = catalog.into_service(config);
    let response = service.search(&settings).await?;
    format_output(&OutputData::Search(response), &cli.output)
}

fn build_settings(args: &SearchArgs, taxon: Option<Taxon>) -> SearchSettings {
    let mut settings = SearchSettings::new(args.query.clone())
        .with_max_results(args.max_results)
        .with_mode(args.mode.into())
        .with_sources(!args.no_db, !args.no_index, !args.no_characteristics)
        .with_go(args.go)
        .with_fill_results(!args.ids_only)
        .with_return_on_db_hit(args.return_on_db_hit)
        .with_strict_taxon_filter(args.strict_taxon);
    if !args.kinds.is_empty() {
        settings = settings.with_kinds(args.kinds.iter().copied());
    }
    if let Some(uri) = &args.term_uri {
        settings = settings.with_term_uri(uri.clone());
    }
    if let Some(taxon) = taxon {
        settings = settings.with_taxon(taxon);
    }
    settings
}

/// Finds a catalog taxon by id, scientific name or common name.
async fn resolve_taxon(catalog: &MemoryCatalog, name: &str) -> Result<Taxon> {
    let taxa = catalog
        .taxa()
        .await
        .map_err(|e| CommandError::InvalidArgument(e.to_string()))?;
    find_taxon(&taxa, name)
        .cloned()
        .ok_or_else(|| CommandError::InvalidArgument(format!("Unknown taxon '{}'", name)))
}

fn find_taxon<'a>(taxa: &'a [Taxon], name: &str) -> Option<&'a Taxon> {
    let name = name.trim();
    if let Ok(id) = name.parse::<u64>() {
        return taxa.iter().find(|t| t.id == id);
    }
    taxa.iter().find(|t| {
        t.scientific_name.eq_ignore_ascii_case(name)
            || t.common_name
                .as_deref()
                .is_some_and(|c| c.eq_ignore_ascii_case(name))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{Commands, ModeArg};
    use clap::Parser;
    use sift_core::{EntityKind, SearchMode};

    fn taxa() -> Vec<Taxon> {
        vec![
            Taxon::new(9606, "Homo sapiens").with_common_name("human"),
            Taxon::new(10090, "Mus musculus").with_common_name("mouse"),
        ]
    }

    fn args(argv: &[&str]) -> SearchArgs {
        match Cli::parse_from(argv.iter().copied()).command {
            Commands::Search(args) => args,
            _ => panic!("expected search"),
        }
    }

    #[test]
    fn test_find_taxon_by_id_and_name() {
        let taxa = taxa();
        assert_eq!(find_taxon(&taxa, "10090").map(|t| t.id), Some(10090));
        assert_eq!(find_taxon(&taxa, "Human").map(|t| t.id), Some(9606));
        assert_eq!(find_taxon(&taxa, "mus musculus").map(|t| t.id), Some(10090));
        assert!(find_taxon(&taxa, "zebrafish").is_none());
        assert!(find_taxon(&taxa, "7955").is_none());
    }

    #[test]
    fn test_build_settings_defaults_to_all_kinds() {
        let args = args(&["sift", "search", "grin1", "-c", "c.yaml"]);
        let settings = build_settings(&args, None);
        assert_eq!(settings.kinds.len(), EntityKind::ALL.len());
        assert!(settings.use_database && settings.use_index && settings.use_characteristics);
        assert!(settings.fill_results);
        assert_eq!(settings.mode, SearchMode::Balanced);
        assert!(matches!(args.mode, ModeArg::Balanced));
    }

    #[test]
    fn test_build_settings_flags() {
        let args = args(&[
            "sift", "search", "grin1", "-c", "c.yaml", "-k", "experiment", "--no-db",
            "--ids-only", "--strict-taxon", "-n", "5", "--term-uri", "http://x/T_1",
        ]);
        let settings = build_settings(&args, Some(Taxon::new(9606, "Homo sapiens")));
        assert_eq!(settings.kinds.len(), 1);
        assert!(settings.includes(EntityKind::Experiment));
        assert!(!settings.use_database);
        assert!(!settings.fill_results);
        assert!(settings.strict_taxon_filter);
        assert_eq!(settings.max_results, 5);
        assert_eq!(settings.term_uri.as_deref(), Some("http://x/T_1"));
        assert_eq!(settings.taxon.map(|t| t.id), Some(9606));
    }
}
