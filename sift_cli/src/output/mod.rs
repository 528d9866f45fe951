use crate::cli::OutputFormat;
use crate::commands::Result;
use serde::Serialize;
use sift_core::{EntityKind, SearchConfig, SearchResponse};

mod pretty;

#[derive(Debug, Clone, Serialize)]
pub struct KindInfo {
    pub kind: EntityKind,
    pub has_taxon: bool,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum OutputData {
    Search(SearchResponse),
    Kinds(Vec<KindInfo>),
    Config {
        path: String,
        exists: bool,
        config: SearchConfig,
    },
}

pub fn format_output(data: &OutputData, format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(data)?);
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(data)?);
        }
        OutputFormat::Pretty => {
            print!("{}", format_pretty(data));
        }
    }
    Ok(())
}

fn format_pretty(data: &OutputData) -> String {
    match data {
        OutputData::Search(response) => pretty::format_search(response),
        OutputData::Kinds(kinds) => pretty::format_kinds(kinds),
        OutputData::Config {
            path,
            exists,
            config,
        } => pretty::format_config(path, *exists, config),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_data_is_tagged() {
        let data = OutputData::Kinds(vec![KindInfo {
            kind: EntityKind::GeneSet,
            has_taxon: true,
        }]);
        let json = serde_json::to_value(&data).unwrap();
        assert_eq!(json["type"], "Kinds");
        assert_eq!(json["data"][0]["kind"], "gene_set");
    }

    #[test]
    fn test_config_yaml() {
        let data = OutputData::Config {
            path: "/tmp/sift/config.yaml".to_string(),
            exists: false,
            config: SearchConfig::default(),
        };
        let yaml = serde_yaml::to_string(&data).unwrap();
        assert!(yaml.contains("deadline_ms: 30000"));
    }
}
