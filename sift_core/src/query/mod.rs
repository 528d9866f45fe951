//! Query rewriting.
//!
//! Parses Lucene-style boolean queries and derives the simpler forms the
//! individual sources need: flat term sets, DNF clause groups for
//! characteristic search, and single-clause literal strings for the
//! relational store.

mod ast;
mod error;
mod lexer;
mod parser;

pub use ast::QueryExpr;
pub use error::QueryParseError;
pub use parser::parse;

use crate::error::SearchError;
use std::collections::BTreeSet;
use tracing::debug;

/// Characters with syntactic meaning in a query.
pub const RESERVED_CHARS: &[char] = &[
    '+', '-', '&', '|', '!', '(', ')', '{', '}', '[', ']', '^', '"', '~', '*', '?', ':', '\\',
];

/// A successfully parsed top-level query.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedQuery {
    pub expr: QueryExpr,
    /// The string that parsed (the original, or its escaped form).
    pub text: String,
    /// Whether the escaped retry was needed.
    pub escaped: bool,
}

/// Backslash-prefixes every reserved character.
pub fn escape(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for ch in query.chars() {
        if RESERVED_CHARS.contains(&ch) {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

/// Parses `query`, retrying exactly once with reserved syntax escaped.
pub fn parse_with_fallback(query: &str) -> Result<ParsedQuery, SearchError> {
    match parse(query) {
        Ok(expr) => Ok(ParsedQuery {
            expr,
            text: query.to_string(),
            escaped: false,
        }),
        Err(first) => {
            let escaped = escape(query);
            debug!(
                target: "sift::query",
                query,
                error = %first,
                "Query failed to parse, retrying escaped"
            );
            match parse(&escaped) {
                Ok(expr) => Ok(ParsedQuery {
                    expr,
                    text: escaped,
                    escaped: true,
                }),
                Err(second) => Err(SearchError::query_parse(query, &escaped, &second)),
            }
        }
    }
}

/// All non-prohibited leaf terms, ignoring boolean structure.
pub fn extract_terms(expr: &QueryExpr) -> BTreeSet<String> {
    let mut terms = BTreeSet::new();
    collect_terms(expr, &mut terms);
    terms
}

fn collect_terms(expr: &QueryExpr, terms: &mut BTreeSet<String>) {
    match expr {
        QueryExpr::Not(_) => {}
        QueryExpr::Field { expr, .. } => collect_terms(expr, terms),
        QueryExpr::And(children) | QueryExpr::Or(children) => {
            for child in children {
                collect_terms(child, terms);
            }
        }
        leaf => {
            if let Some(text) = leaf.leaf_text() {
                terms.insert(text);
            }
        }
    }
}

/// Disjunctive normal form: each member is one conjunction of terms.
///
/// Prohibited clauses are dropped.
pub fn extract_dnf(expr: &QueryExpr) -> BTreeSet<BTreeSet<String>> {
    dnf(expr)
        .unwrap_or_default()
        .into_iter()
        .filter(|clause| !clause.is_empty())
        .collect()
}

/// `None` means the expression contributes no positive terms.
fn dnf(expr: &QueryExpr) -> Option<Vec<BTreeSet<String>>> {
    match expr {
        QueryExpr::Not(_) => None,
        QueryExpr::Field { expr, .. } => dnf(expr),
        QueryExpr::Or(children) => {
            let clauses: Vec<_> = children.iter().filter_map(dnf).flatten().collect();
            (!clauses.is_empty()).then_some(clauses)
        }
        QueryExpr::And(children) => {
            let mut acc: Option<Vec<BTreeSet<String>>> = None;
            for child in children.iter().filter_map(dnf) {
                acc = Some(match acc {
                    None => child,
                    Some(left) => left
                        .iter()
                        .flat_map(|l| {
                            child.iter().map(move |r| l.union(r).cloned().collect())
                        })
                        .collect(),
                });
            }
            acc
        }
        leaf => leaf
            .leaf_text()
            .map(|text| vec![BTreeSet::from([text])]),
    }
}

/// First clause that is not prohibited, descending into groups.
pub fn first_clause(expr: &QueryExpr) -> Option<&QueryExpr> {
    match expr {
        QueryExpr::Not(_) => None,
        QueryExpr::Field { expr, .. } => first_clause(expr),
        QueryExpr::And(children) | QueryExpr::Or(children) => {
            children.iter().find_map(first_clause)
        }
        leaf => Some(leaf),
    }
}

/// Renders the first non-prohibited clause as a literal match string.
///
/// In exact mode wildcards stay as `*`/`?`. In inexact mode the clause is
/// rendered as a SQL `LIKE` pattern by [`QueryExpr::like_text`], so only
/// unescaped wildcards match more than themselves.
pub fn rewrite_for_exact_match(expr: &QueryExpr, inexact: bool) -> Option<String> {
    let clause = first_clause(expr)?;
    if inexact {
        clause.like_text()
    } else {
        clause.leaf_text()
    }
}

/// True iff the first non-prohibited clause is a prefix or wildcard query.
pub fn is_wildcard(expr: &QueryExpr) -> bool {
    matches!(
        first_clause(expr),
        Some(QueryExpr::Prefix(_)) | Some(QueryExpr::Wildcard(_))
    )
}

/// Removes single-character terms when the query has more than one term.
///
/// Returns `None` when nothing searchable remains.
pub fn strip_short_terms(expr: &QueryExpr) -> Option<QueryExpr> {
    if count_leaves(expr) <= 1 {
        return Some(expr.clone());
    }
    strip(expr)
}

fn count_leaves(expr: &QueryExpr) -> usize {
    match expr {
        QueryExpr::Not(inner) | QueryExpr::Field { expr: inner, .. } => count_leaves(inner),
        QueryExpr::And(children) | QueryExpr::Or(children) => {
            children.iter().map(count_leaves).sum()
        }
        _ => 1,
    }
}

fn strip(expr: &QueryExpr) -> Option<QueryExpr> {
    match expr {
        QueryExpr::Term(text) if text.chars().count() <= 1 => None,
        QueryExpr::Not(inner) => strip(inner).map(QueryExpr::not),
        QueryExpr::Field { name, expr } => strip(expr).map(|e| QueryExpr::field(name.clone(), e)),
        QueryExpr::And(children) => {
            let kept: Vec<_> = children.iter().filter_map(strip).collect();
            if kept.iter().all(|e| matches!(e, QueryExpr::Not(_))) {
                None
            } else {
                Some(QueryExpr::and(kept))
            }
        }
        QueryExpr::Or(children) => {
            let kept: Vec<_> = children.iter().filter_map(strip).collect();
            (!kept.is_empty()).then(|| QueryExpr::or(kept))
        }
        leaf => Some(leaf.clone()),
    }
}

// ============================================================================
// Tests
// ============================================================================
