//! Query abstract syntax tree.

use std::fmt;

/// A parsed boolean query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QueryExpr {
    /// A single literal term.
    Term(String),

    /// A quoted phrase, quotes stripped.
    Phrase(String),

    /// A term with a single trailing `*`, stored without the star.
    Prefix(String),

    /// A term containing `*` or `?` anywhere else, stored verbatim.
    Wildcard(String),

    /// Field-scoped clause (`name:expr`).
    Field { name: String, expr: Box<Self> },

    /// Prohibited clause.
    Not(Box<Self>),

    And(Vec<Self>),

    Or(Vec<Self>),
}

impl QueryExpr {
    /// Creates an And expression, flattening nested Ands.
    pub fn and(exprs: Vec<Self>) -> Self {
        let mut flattened: Vec<Self> = exprs
            .into_iter()
            .flat_map(|e| match e {
                Self::And(inner) => inner,
                other => vec![other],
            })
            .collect();

        if flattened.len() == 1 {
            flattened.remove(0)
        } else {
            Self::And(flattened)
        }
    }

    /// Creates an Or expression, flattening nested Ors.
    pub fn or(exprs: Vec<Self>) -> Self {
        let mut flattened: Vec<Self> = exprs
            .into_iter()
            .flat_map(|e| match e {
                Self::Or(inner) => inner,
                other => vec![other],
            })
            .collect();

        if flattened.len() == 1 {
            flattened.remove(0)
        } else {
            Self::Or(flattened)
        }
    }

    pub fn not(expr: Self) -> Self {
        Self::Not(Box::new(expr))
    }

    pub fn field(name: impl Into<String>, expr: Self) -> Self {
        Self::Field {
            name: name.into(),
            expr: Box::new(expr),
        }
    }

    /// Builds a term node, classifying wildcard syntax.
    ///
    /// A wildcard `word` carries `\*`, `\?` and `\\` escapes for literal
    /// characters; a prefix stem is stored with those escapes resolved.
    pub(crate) fn from_word(word: String, has_wildcard: bool) -> Self {
        if !has_wildcard {
            return Self::Term(word);
        }
        let chars = pattern_chars(&word);
        match chars.split_last() {
            Some((&('*', true), stem))
                if !stem.is_empty() && stem.iter().all(|&(_, wild)| !wild) =>
            {
                Self::Prefix(stem.iter().map(|&(ch, _)| ch).collect())
            }
            _ => Self::Wildcard(word),
        }
    }

    /// Whether this node is a leaf (term, phrase, prefix or wildcard).
    pub fn is_leaf(&self) -> bool {
        matches!(
            self,
            Self::Term(_) | Self::Phrase(_) | Self::Prefix(_) | Self::Wildcard(_)
        )
    }

    /// Literal text of a leaf as it would be typed, with wildcards.
    pub fn leaf_text(&self) -> Option<String> {
        match self {
            Self::Term(s) | Self::Phrase(s) | Self::Wildcard(s) => Some(s.clone()),
            Self::Prefix(s) => Some(format!("{s}*")),
            _ => None,
        }
    }

    /// SQL `LIKE` rendering of a leaf.
    ///
    /// Unescaped wildcards become `%`/`_`. Every other character is literal,
    /// with `%`, `_`, `\`, `*` and `?` backslash-escaped.
    pub fn like_text(&self) -> Option<String> {
        let chars: Vec<(char, bool)> = match self {
            Self::Term(s) | Self::Phrase(s) => s.chars().map(|ch| (ch, false)).collect(),
            Self::Prefix(s) => s
                .chars()
                .map(|ch| (ch, false))
                .chain(std::iter::once(('*', true)))
                .collect(),
            Self::Wildcard(s) => pattern_chars(s),
            _ => return None,
        };

        let mut like = String::with_capacity(chars.len());
        for (ch, wild) in chars {
            match (ch, wild) {
                ('*', true) => like.push('%'),
                ('?', true) => like.push('_'),
                ('%' | '_' | '\\' | '*' | '?', false) => {
                    like.push('\\');
                    like.push(ch);
                }
                (ch, _) => like.push(ch),
            }
        }
        Some(like)
    }

    /// Renders the expression back to query syntax.
    pub fn to_query_string(&self) -> String {
        match self {
            Self::Term(s) => escape_term(s),
            Self::Phrase(s) => format!("\"{}\"", s.replace('"', "\\\"")),
            Self::Prefix(s) => format!("{}*", escape_term(s)),
            Self::Wildcard(s) => s.clone(),
            Self::Field { name, expr } => format!("{}:{}", name, expr.to_group_string()),
            Self::Not(inner) => format!("-{}", inner.to_group_string()),
            Self::And(exprs) => exprs
                .iter()
                .map(|e| e.to_group_string())
                .collect::<Vec<_>>()
                .join(" AND "),
            Self::Or(exprs) => exprs
                .iter()
                .map(|e| e.to_group_string())
                .collect::<Vec<_>>()
                .join(" OR "),
        }
    }

    fn to_group_string(&self) -> String {
        match self {
            Self::And(_) | Self::Or(_) => format!("({})", self.to_query_string()),
            _ => self.to_query_string(),
        }
    }

    fn fmt_tree(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        let prefix = "  ".repeat(indent);
        match self {
            Self::Term(s) => writeln!(f, "{prefix}Term({s:?})"),
            Self::Phrase(s) => writeln!(f, "{prefix}Phrase({s:?})"),
            Self::Prefix(s) => writeln!(f, "{prefix}Prefix({s:?})"),
            Self::Wildcard(s) => writeln!(f, "{prefix}Wildcard({s:?})"),
            Self::Field { name, expr } => {
                writeln!(f, "{prefix}Field({name:?})")?;
                expr.fmt_tree(f, indent + 1)
            }
            Self::Not(inner) => {
                writeln!(f, "{prefix}Not")?;
                inner.fmt_tree(f, indent + 1)
            }
            Self::And(exprs) | Self::Or(exprs) => {
                let name = if matches!(self, Self::And(_)) { "And" } else { "Or" };
                writeln!(f, "{prefix}{name}")?;
                for expr in exprs {
                    expr.fmt_tree(f, indent + 1)?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for QueryExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_tree(f, 0)
    }
}

/// Splits wildcard text into characters, flagging the unescaped `*` and `?`.
fn pattern_chars(text: &str) -> Vec<(char, bool)> {
    let mut out = Vec::with_capacity(text.len());
    let mut chars = text.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    out.push((escaped, false));
                }
            }
            '*' | '?' => out.push((ch, true)),
            ch => out.push((ch, false)),
        }
    }
    out
}

fn escape_term(term: &str) -> String {
    super::escape(term)
}
