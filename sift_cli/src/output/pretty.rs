//! Pretty formatter for terminal output.
//!
//! One table per entity kind, highest score first, with the search summary
//! printed last.

use super::KindInfo;
use comfy_table::{presets::UTF8_FULL_CONDENSED, Cell, ContentArrangement, Table};
use owo_colors::OwoColorize;
use sift_core::{SearchConfig, SearchResponse, SearchResult};

/// Width used for section rules
const DEFAULT_WIDTH: usize = 80;

/// Longest label shown before truncation
const MAX_LABEL_LEN: usize = 48;

/// Longest highlight text shown before truncation
const MAX_HIGHLIGHT_LEN: usize = 60;

// ============================================================================
// Search Results
// ============================================================================

pub fn format_search(response: &SearchResponse) -> String {
    let mut output = String::new();

    if response.is_empty() {
        output.push_str(&format!(
            "{} No results for '{}'\n",
            "•".dimmed(),
            response.query
        ));
    }

    for (kind, results) in &response.results {
        output.push_str(&format_section_header(
            kind.as_str(),
            Some(results.len()),
            DEFAULT_WIDTH,
        ));
        output.push('\n');
        output.push_str(&format_results_table(results));
        output.push('\n');
    }

    if response.timed_out {
        output.push_str(&format!(
            "{} Deadline elapsed, results are partial\n",
            "!".yellow().bold()
        ));
    }

    let taxon = response
        .taxon
        .as_ref()
        .map(|t| format!(" · taxon {}", t.scientific_name))
        .unwrap_or_default();
    output.push_str(
        &format!(
            "{} results in {} ms{}\n",
            response.total(),
            response.duration_ms,
            taxon
        )
        .dimmed()
        .to_string(),
    );
    output
}

fn format_results_table(results: &[SearchResult]) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);

    let headers: Vec<Cell> = ["#", "id", "label", "score", "source", "matched"]
        .iter()
        .map(|col| Cell::new(col.cyan().bold().to_string()))
        .collect();
    table.set_header(headers);

    for (rank, result) in results.iter().enumerate() {
        let label = result
            .entity
            .as_ref()
            .map(|e| truncate_str(e.label(), MAX_LABEL_LEN))
            .unwrap_or_default();
        table.add_row(vec![
            Cell::new(rank + 1),
            Cell::new(result.id),
            Cell::new(label),
            Cell::new(format!("{:.3}", result.score())),
            Cell::new(result.source.as_str()),
            Cell::new(format_highlights(result)),
        ]);
    }

    let mut output = table.to_string();
    output.push('\n');
    output
}

fn format_highlights(result: &SearchResult) -> String {
    result
        .highlights
        .iter()
        .map(|(field, text)| {
            format!(
                "{}: {}",
                field.dimmed(),
                truncate_str(text, MAX_HIGHLIGHT_LEN)
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

// ============================================================================
// Kinds and Config
// ============================================================================

pub fn format_kinds(kinds: &[KindInfo]) -> String {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL_CONDENSED)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec![
        Cell::new("kind".cyan().bold().to_string()),
        Cell::new("taxon".cyan().bold().to_string()),
    ]);
    for info in kinds {
        let taxon = if info.has_taxon { "yes" } else { "no" };
        table.add_row(vec![Cell::new(info.kind.as_str()), Cell::new(taxon)]);
    }
    let mut output = table.to_string();
    output.push('\n');
    output
}

pub fn format_config(path: &str, exists: bool, config: &SearchConfig) -> String {
    let mut output = String::new();
    output.push_str(&format_section_header("configuration", None, DEFAULT_WIDTH));
    output.push('\n');
    let origin = if exists { "" } else { " (not found, using defaults)" };
    output.push_str(&format!("{} {}{}\n\n", "file".dimmed(), path, origin.yellow()));

    let rows: [(&str, String); 8] = [
        ("deadline_ms", config.deadline_ms.to_string()),
        ("accurate_deadline_ms", config.accurate_deadline_ms.to_string()),
        ("child_cache_capacity", config.child_cache_capacity.to_string()),
        ("index_hit_penalty", config.index_hit_penalty.to_string()),
        ("indirect_hit_penalty", config.indirect_hit_penalty.to_string()),
        ("child_term_penalty", config.child_term_penalty.to_string()),
        ("phenotype_gene_cap", config.phenotype_gene_cap.to_string()),
        (
            "max_terms_for_taxon_inference",
            config.max_terms_for_taxon_inference.to_string(),
        ),
    ];
    for (key, value) in rows {
        output.push_str(&format!("  {:<32}{}\n", key.bold(), value));
    }
    output
}

// ============================================================================
// Helpers
// ============================================================================

fn format_section_header(label: &str, count: Option<usize>, width: usize) -> String {
    let count_str = match count {
        Some(n) => format!(" ({} results)", n),
        None => String::new(),
    };

    let header_text = format!("{}{}", label, count_str);
    let line_len = (width.saturating_sub(header_text.len() + 4)).min(60);
    let line = "─".repeat(line_len);

    format!(
        "{} {} {}",
        "──".cyan(),
        header_text.green().bold(),
        line.cyan()
    )
}

fn truncate_str(s: &str, max_len: usize) -> String {
    let first_line = s.lines().next().unwrap_or(s);

    if first_line.chars().count() <= max_len {
        first_line.to_string()
    } else {
        let truncated: String = first_line.chars().take(max_len - 3).collect();
        format!("{}...", truncated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sift_core::{EntityKind, ResultSource, Taxon};

    fn response() -> SearchResponse {
        SearchResponse {
            query: "grin1".to_string(),
            results: [(
                EntityKind::Gene,
                vec![SearchResult::new(EntityKind::Gene, 2, 1.0, ResultSource::Database)
                    .with_highlight("officialSymbol", "Grin1")],
            )]
            .into_iter()
            .collect(),
            taxon: Some(Taxon::new(10090, "Mus musculus")),
            ..Default::default()
        }
    }

    #[test]
    fn test_format_search() {
        let output = format_search(&response());
        assert!(output.contains("gene"));
        assert!(output.contains("Grin1"));
        assert!(output.contains("Mus musculus"));
        assert!(!output.contains("partial"));
    }

    #[test]
    fn test_format_search_timed_out() {
        let mut response = response();
        response.timed_out = true;
        assert!(format_search(&response).contains("partial"));
    }

    #[test]
    fn test_format_search_empty() {
        let response = SearchResponse {
            query: "nothing".to_string(),
            ..Default::default()
        };
        assert!(format_search(&response).contains("No results for 'nothing'"));
    }

    #[test]
    fn test_truncate_str() {
        let long = "This is a very long string that should be truncated";
        let truncated = truncate_str(long, 20);
        assert!(truncated.ends_with("..."));
        assert!(truncated.chars().count() <= 20);
    }

    #[test]
    fn test_format_section_header() {
        let header = format_section_header("experiment", Some(10), 80);
        assert!(header.contains("experiment"));
        assert!(header.contains("10"));
    }
}
