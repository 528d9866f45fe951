//! Recursive-descent parser producing [`QueryExpr`].
//!
//! Grammar (AND binds tighter than OR, adjacency means AND):
//!
//! ```text
//! query    := or_expr EOF
//! or_expr  := and_expr (OR and_expr)*
//! and_expr := unary (AND? unary)*
//! unary    := (NOT | '-') unary | '+' unary | primary MODIFIER*
//! primary  := WORD | PHRASE | '(' or_expr ')' | FIELD primary
//! ```

use super::ast::QueryExpr;
use super::error::QueryParseError;
use super::lexer::{tokenize, Spanned, Token};

struct Parser<'a> {
    input: &'a str,
    tokens: Vec<Spanned>,
    pos: usize,
}

impl<'a> Parser<'a> {
    fn new(input: &'a str, tokens: Vec<Spanned>) -> Self {
        Self {
            input,
            tokens,
            pos: 0,
        }
    }

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|(token, _)| token)
    }

    fn advance(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.pos).map(|(token, _)| token.clone());
        if token.is_some() {
            self.pos += 1;
        }
        token
    }

    /// Byte offset of the current token, or end of input.
    fn offset(&self) -> usize {
        self.tokens
            .get(self.pos)
            .map(|(_, offset)| *offset)
            .unwrap_or(self.input.len())
    }

    fn error(&self, message: impl Into<String>) -> QueryParseError {
        QueryParseError::new(message, self.offset(), self.input)
    }

    fn parse(mut self) -> Result<QueryExpr, QueryParseError> {
        if self.tokens.is_empty() {
            return Err(self.error("empty query"));
        }
        let expr = self.or_expr()?;
        if let Some(token) = self.peek() {
            return Err(self.error(format!("unexpected {}", describe(token))));
        }
        Ok(expr)
    }

    fn or_expr(&mut self) -> Result<QueryExpr, QueryParseError> {
        let mut clauses = vec![self.and_expr()?];
        while matches!(self.peek(), Some(Token::Or)) {
            self.advance();
            clauses.push(self.and_expr()?);
        }
        Ok(QueryExpr::or(clauses))
    }

    fn and_expr(&mut self) -> Result<QueryExpr, QueryParseError> {
        let mut clauses = vec![self.unary()?];
        loop {
            match self.peek() {
                Some(Token::And) => {
                    self.advance();
                    clauses.push(self.unary()?);
                }
                Some(token) if starts_clause(token) => clauses.push(self.unary()?),
                _ => break,
            }
        }
        Ok(QueryExpr::and(clauses))
    }

    fn unary(&mut self) -> Result<QueryExpr, QueryParseError> {
        match self.peek() {
            Some(Token::Not) | Some(Token::Prohibited) => {
                self.advance();
                Ok(QueryExpr::not(self.unary()?))
            }
            Some(Token::Required) => {
                self.advance();
                self.unary()
            }
            _ => {
                let expr = self.primary()?;
                while matches!(self.peek(), Some(Token::Modifier)) {
                    self.advance();
                }
                Ok(expr)
            }
        }
    }

    fn primary(&mut self) -> Result<QueryExpr, QueryParseError> {
        let Some(token) = self.peek().cloned() else {
            return Err(self.error("expected a term at end of query"));
        };

        match token {
            Token::Word { text, wildcard } => {
                self.advance();
                Ok(QueryExpr::from_word(text, wildcard))
            }
            Token::Phrase(text) => {
                self.advance();
                Ok(QueryExpr::Phrase(text))
            }
            Token::LParen => {
                self.advance();
                let inner = self.or_expr()?;
                match self.advance() {
                    Some(Token::RParen) => Ok(inner),
                    _ => Err(self.error("expected ')'")),
                }
            }
            Token::Field(name) => {
                self.advance();
                let expr = self.primary()?;
                Ok(QueryExpr::field(name, expr))
            }
            other => Err(self.error(format!("unexpected {}", describe(&other)))),
        }
    }
}

fn starts_clause(token: &Token) -> bool {
    matches!(
        token,
        Token::Word { .. }
            | Token::Phrase(_)
            | Token::LParen
            | Token::Field(_)
            | Token::Not
            | Token::Prohibited
            | Token::Required
    )
}

fn describe(token: &Token) -> String {
    match token {
        Token::Word { text, .. } => format!("term '{text}'"),
        Token::Phrase(text) => format!("phrase \"{text}\""),
        Token::And => "AND".to_string(),
        Token::Or => "OR".to_string(),
        Token::Not => "NOT".to_string(),
        Token::Required => "'+'".to_string(),
        Token::Prohibited => "'-'".to_string(),
        Token::LParen => "'('".to_string(),
        Token::RParen => "')'".to_string(),
        Token::Field(name) => format!("field '{name}:'"),
        Token::Modifier => "modifier".to_string(),
    }
}

/// Parses a boolean query string.
pub fn parse(input: &str) -> Result<QueryExpr, QueryParseError> {
    let tokens = tokenize(input)?;
    Parser::new(input, tokens).parse()
}
