use crate::cli::Cli;
use crate::commands::Result;
use crate::output::{format_output, KindInfo, OutputData};
use sift_core::EntityKind;

pub fn run(cli: &Cli) -> Result<()> {
    let kinds = EntityKind::ALL
        .into_iter()
        .map(|kind| KindInfo {
            kind,
            has_taxon: kind.has_taxon(),
        })
        .collect();
    format_output(&OutputData::Kinds(kinds), &cli.output)
}
