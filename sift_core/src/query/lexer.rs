//! Query lexer (tokenizer).

use std::{iter::Peekable, str::CharIndices};

use super::error::QueryParseError;

/// A token in the query language.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    /// A bare word; `wildcard` is set when it holds an unescaped `*` or `?`.
    ///
    /// Escapes are resolved, except that a wildcard word keeps `\*`, `\?` and
    /// `\\` so literal wildcard characters stay distinguishable.
    Word { text: String, wildcard: bool },

    /// A quoted phrase (quotes stripped).
    Phrase(String),

    /// `AND` or `&&`.
    And,

    /// `OR` or `||`.
    Or,

    /// `NOT` or `!`.
    Not,

    /// Required-clause prefix `+`.
    Required,

    /// Prohibited-clause prefix `-`.
    Prohibited,

    LParen,

    RParen,

    /// Field prefix (`title:` produces `Field("title")`).
    Field(String),

    /// Boost (`^2`) or fuzziness/slop (`~1`) modifier, accepted and ignored.
    Modifier,
}

/// A token with the byte offset it started at.
pub(crate) type Spanned = (Token, usize);

/// Characters that end a bare word.
fn is_word_break(ch: char) -> bool {
    ch.is_whitespace()
        || matches!(
            ch,
            '(' | ')' | '"' | '^' | '~' | ':' | '+' | '!' | '&' | '|' | '[' | ']' | '{' | '}'
        )
}

struct Lexer<'a> {
    input: &'a str,
    chars: Peekable<CharIndices<'a>>,
}

impl<'a> Lexer<'a> {
    fn new(input: &'a str) -> Self {
        Self {
            input,
            chars: input.char_indices().peekable(),
        }
    }

    fn error_at(&self, message: impl Into<String>, position: usize) -> QueryParseError {
        QueryParseError::new(message, position, self.input)
    }

    fn tokenize(mut self) -> Result<Vec<Spanned>, QueryParseError> {
        let mut tokens = Vec::new();
        while let Some(token) = self.next_token()? {
            tokens.push(token);
        }
        Ok(tokens)
    }

    fn next_token(&mut self) -> Result<Option<Spanned>, QueryParseError> {
        self.skip_whitespace();

        let Some(&(pos, ch)) = self.chars.peek() else {
            return Ok(None);
        };

        let token = match ch {
            '"' => self.read_phrase(pos)?,
            '(' => self.single(Token::LParen),
            ')' => self.single(Token::RParen),
            '+' => self.single(Token::Required),
            '-' => self.single(Token::Prohibited),
            '!' => self.single(Token::Not),
            '^' | '~' => self.read_modifier(),
            '&' | '|' => self.read_double_operator(pos, ch)?,
            '[' | ']' | '{' | '}' => {
                return Err(self.error_at("range queries are not supported", pos));
            }
            ':' => return Err(self.error_at("field name missing before ':'", pos)),
            _ => self.read_word(pos)?,
        };

        Ok(Some((token, pos)))
    }

    fn single(&mut self, token: Token) -> Token {
        self.chars.next();
        token
    }

    fn read_phrase(&mut self, start: usize) -> Result<Token, QueryParseError> {
        self.chars.next(); // opening quote
        let mut content = String::new();
        loop {
            match self.chars.next() {
                Some((_, '"')) => return Ok(Token::Phrase(content)),
                Some((pos, '\\')) => match self.chars.next() {
                    Some((_, escaped)) => content.push(escaped),
                    None => return Err(self.error_at("dangling escape character", pos)),
                },
                Some((_, ch)) => content.push(ch),
                None => return Err(self.error_at("unclosed quote", start)),
            }
        }
    }

    fn read_modifier(&mut self) -> Token {
        self.chars.next();
        while let Some(&(_, ch)) = self.chars.peek() {
            if ch.is_ascii_digit() || ch == '.' {
                self.chars.next();
            } else {
                break;
            }
        }
        Token::Modifier
    }

    fn read_double_operator(&mut self, pos: usize, ch: char) -> Result<Token, QueryParseError> {
        self.chars.next();
        match self.chars.peek() {
            Some(&(_, next)) if next == ch => {
                self.chars.next();
                Ok(if ch == '&' { Token::And } else { Token::Or })
            }
            _ => Err(self.error_at(format!("expected '{ch}{ch}'"), pos)),
        }
    }

    /// Reads a word, a keyword, or a field prefix.
    fn read_word(&mut self, start: usize) -> Result<Token, QueryParseError> {
        let mut word = String::new();
        let mut pattern = String::new();
        let mut wildcard = false;

        while let Some(&(pos, ch)) = self.chars.peek() {
            if ch == '\\' {
                self.chars.next();
                match self.chars.next() {
                    Some((_, escaped)) => {
                        if matches!(escaped, '*' | '?' | '\\') {
                            pattern.push('\\');
                        }
                        pattern.push(escaped);
                        word.push(escaped);
                    }
                    None => return Err(self.error_at("dangling escape character", pos)),
                }
                continue;
            }
            if is_word_break(ch) {
                break;
            }
            if ch == '*' || ch == '?' {
                wildcard = true;
            }
            word.push(ch);
            pattern.push(ch);
            self.chars.next();
        }

        if let Some(&(_, ':')) = self.chars.peek() {
            self.chars.next();
            if wildcard {
                return Err(self.error_at("wildcards are not allowed in field names", start));
            }
            return Ok(Token::Field(word));
        }

        let token = match word.as_str() {
            "AND" if !wildcard => Token::And,
            "OR" if !wildcard => Token::Or,
            "NOT" if !wildcard => Token::Not,
            _ => Token::Word {
                text: if wildcard { pattern } else { word },
                wildcard,
            },
        };
        Ok(token)
    }

    fn skip_whitespace(&mut self) {
        while let Some(&(_, ch)) = self.chars.peek() {
            if ch.is_whitespace() {
                self.chars.next();
            } else {
                break;
            }
        }
    }
}

/// Tokenizes a query string.
pub(crate) fn tokenize(input: &str) -> Result<Vec<Spanned>, QueryParseError> {
    Lexer::new(input).tokenize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<Token> {
        tokenize(input)
            .unwrap()
            .into_iter()
            .map(|(token, _)| token)
            .collect()
    }

    fn word(text: &str) -> Token {
        Token::Word {
            text: text.to_string(),
            wildcard: false,
        }
    }

    #[test]
    fn test_keywords_and_symbols() {
        assert_eq!(
            kinds("a AND b && c OR d || !e NOT f"),
            vec![
                word("a"),
                Token::And,
                word("b"),
                Token::And,
                word("c"),
                Token::Or,
                word("d"),
                Token::Or,
                Token::Not,
                word("e"),
                Token::Not,
                word("f"),
            ]
        );
    }

    #[test]
    fn test_lowercase_keywords_are_words() {
        assert_eq!(kinds("a and b"), vec![word("a"), word("and"), word("b")]);
    }

    #[test]
    fn test_hyphen_inside_word() {
        assert_eq!(kinds("IL-6 -tumor"), vec![word("IL-6"), Token::Prohibited, word("tumor")]);
    }

    #[test]
    fn test_plus_breaks_word() {
        assert_eq!(kinds("C++"), vec![word("C"), Token::Required, Token::Required]);
    }

    #[test]
    fn test_escapes() {
        assert_eq!(kinds(r"C\+\+"), vec![word("C++")]);
        assert_eq!(kinds(r"a\:b"), vec![word("a:b")]);
        assert!(tokenize("abc\\").is_err());
    }

    #[test]
    fn test_wildcards_and_fields() {
        assert_eq!(
            kinds("name:grin* ^2 ~1"),
            vec![
                Token::Field("name".to_string()),
                Token::Word {
                    text: "grin*".to_string(),
                    wildcard: true
                },
                Token::Modifier,
                Token::Modifier,
            ]
        );
    }

    #[test]
    fn test_escaped_wildcards_are_literal() {
        assert_eq!(kinds(r"GRI\*"), vec![word("GRI*")]);
        assert_eq!(
            kinds(r"gr?n\*"),
            vec![Token::Word {
                text: r"gr?n\*".to_string(),
                wildcard: true
            }]
        );
    }

    #[test]
    fn test_phrase() {
        assert_eq!(
            kinds("\"cerebral cortex\" x"),
            vec![Token::Phrase("cerebral cortex".to_string()), word("x")]
        );
        let err = tokenize("\"open").unwrap_err();
        assert_eq!(err.position, 0);
    }

    #[test]
    fn test_rejected_syntax() {
        assert!(tokenize("[a TO b]").is_err());
        assert!(tokenize("a & b").is_err());
        assert!(tokenize(":x").is_err());
    }
}
