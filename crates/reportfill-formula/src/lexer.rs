//! Formula tokenizer
//!
//! Shared by the parser and by dependency scanning, so both agree on what an identifier is.

use crate::error::{FormulaError, FormulaResult};

/// Token types
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    // Literals
    Number(f64),
    String(String),

    /// Bare word (column, field, function or keyword), or a `` `back quoted` `` name
    Identifier { name: String, quoted: bool },

    // Operators
    Plus,
    Minus,
    Star,
    DoubleStar,
    Slash,
    Percent,
    Caret,
    Ampersand,
    Pipe,
    Assign,
    EqualEqual,
    NotEqual,
    LessThan,
    LessEqual,
    GreaterThan,
    GreaterEqual,
    Comma,

    // Delimiters
    LeftParen,
    RightParen,

    // End of input
    Eof,
}

impl Token {
    /// The identifier name, if this token is an identifier
    pub(crate) fn identifier(&self) -> Option<(&str, bool)> {
        match self {
            Token::Identifier { name, quoted } => Some((name, *quoted)),
            _ => None,
        }
    }
}

/// Check whether a bare word is a reserved keyword (`and`, `or`, `not`, `true`, `false`)
pub(crate) fn is_keyword(word: &str) -> bool {
    matches!(
        word.to_ascii_lowercase().as_str(),
        "and" | "or" | "not" | "true" | "false"
    )
}

/// Split formula text into tokens, ending with [`Token::Eof`]
pub(crate) fn tokenize(input: &str) -> FormulaResult<Vec<Token>> {
    let mut lexer = Lexer { input, pos: 0 };
    let mut tokens = Vec::new();
    loop {
        let token = lexer.scan_token()?;
        let done = token == Token::Eof;
        tokens.push(token);
        if done {
            return Ok(tokens);
        }
    }
}

struct Lexer<'a> {
    input: &'a str,
    pos: usize,
}

impl<'a> Lexer<'a> {
    fn scan_token(&mut self) -> FormulaResult<Token> {
        self.skip_whitespace();

        let c = match self.peek_char() {
            Some(c) => c,
            None => return Ok(Token::Eof),
        };

        // Single-character tokens
        let single = match c {
            '+' => Some(Token::Plus),
            '-' => Some(Token::Minus),
            '/' => Some(Token::Slash),
            '%' => Some(Token::Percent),
            '^' => Some(Token::Caret),
            '&' => Some(Token::Ampersand),
            '|' => Some(Token::Pipe),
            ',' => Some(Token::Comma),
            '(' => Some(Token::LeftParen),
            ')' => Some(Token::RightParen),
            _ => None,
        };
        if let Some(token) = single {
            self.advance();
            return Ok(token);
        }

        // One- or two-character operators
        match c {
            '*' => {
                self.advance();
                if self.eat('*') {
                    return Ok(Token::DoubleStar);
                }
                return Ok(Token::Star);
            }
            '=' => {
                self.advance();
                if self.eat('=') {
                    return Ok(Token::EqualEqual);
                }
                return Ok(Token::Assign);
            }
            '!' => {
                let start = self.pos;
                self.advance();
                if self.eat('=') {
                    return Ok(Token::NotEqual);
                }
                return Err(FormulaError::Parse(format!(
                    "Unexpected character '!' at position {}",
                    start
                )));
            }
            '<' => {
                self.advance();
                if self.eat('=') {
                    return Ok(Token::LessEqual);
                }
                if self.eat('>') {
                    return Ok(Token::NotEqual);
                }
                return Ok(Token::LessThan);
            }
            '>' => {
                self.advance();
                if self.eat('=') {
                    return Ok(Token::GreaterEqual);
                }
                return Ok(Token::GreaterThan);
            }
            _ => {}
        }

        // String literal
        if c == '\'' || c == '"' {
            return self.scan_string(c);
        }

        // Back-quoted column name
        if c == '`' {
            return self.scan_quoted_identifier();
        }

        // Number
        if c.is_ascii_digit()
            || (c == '.' && self.peek_char_at(1).map_or(false, |c| c.is_ascii_digit()))
        {
            return self.scan_number();
        }

        // Identifier
        if c.is_alphabetic() || c == '_' {
            return Ok(self.scan_identifier());
        }

        Err(FormulaError::Parse(format!(
            "Unexpected character '{}' at position {}",
            c, self.pos
        )))
    }

    fn scan_string(&mut self, quote: char) -> FormulaResult<Token> {
        let start = self.pos;
        self.advance(); // Skip opening quote

        let mut s = String::new();
        while let Some(c) = self.peek_char() {
            self.advance();
            if c == quote {
                return Ok(Token::String(s));
            }
            if c == '\\' {
                match self.peek_char() {
                    Some(escaped) => {
                        s.push(escaped);
                        self.advance();
                    }
                    None => break,
                }
            } else {
                s.push(c);
            }
        }

        Err(FormulaError::Parse(format!(
            "Unterminated string starting at position {}",
            start
        )))
    }

    fn scan_quoted_identifier(&mut self) -> FormulaResult<Token> {
        let start = self.pos;
        self.advance(); // Skip opening backtick

        let name_start = self.pos;
        while let Some(c) = self.peek_char() {
            if c == '`' {
                let name = self.input[name_start..self.pos].to_string();
                self.advance();
                if name.is_empty() {
                    return Err(FormulaError::Parse(format!(
                        "Empty quoted name at position {}",
                        start
                    )));
                }
                return Ok(Token::Identifier { name, quoted: true });
            }
            self.advance();
        }

        Err(FormulaError::Parse(format!(
            "Unterminated quoted name starting at position {}",
            start
        )))
    }

    fn scan_number(&mut self) -> FormulaResult<Token> {
        let start = self.pos;

        // Integer part
        while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
            self.advance();
        }

        // Decimal part
        if self.peek_char() == Some('.') {
            self.advance();
            while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
                self.advance();
            }
        }

        // Exponent part, only when digits follow
        if self.peek_char().map_or(false, |c| c == 'e' || c == 'E') {
            let sign = self.peek_char_at(1).map_or(false, |c| c == '+' || c == '-');
            let digit_at = if sign { 2 } else { 1 };
            if self
                .peek_char_at(digit_at)
                .map_or(false, |c| c.is_ascii_digit())
            {
                self.advance();
                if sign {
                    self.advance();
                }
                while self.peek_char().map_or(false, |c| c.is_ascii_digit()) {
                    self.advance();
                }
            }
        }

        let num_str = &self.input[start..self.pos];
        num_str
            .parse()
            .map(Token::Number)
            .map_err(|_| {
                FormulaError::Parse(format!("Invalid number '{}' at position {}", num_str, start))
            })
    }

    fn scan_identifier(&mut self) -> Token {
        let start = self.pos;
        while self
            .peek_char()
            .map_or(false, |c| c.is_alphanumeric() || c == '_')
        {
            self.advance();
        }
        Token::Identifier {
            name: self.input[start..self.pos].to_string(),
            quoted: false,
        }
    }

    // === Helper methods ===

    fn peek_char(&self) -> Option<char> {
        self.input[self.pos..].chars().next()
    }

    fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.input[self.pos..].chars().nth(offset)
    }

    fn advance(&mut self) {
        if let Some(c) = self.peek_char() {
            self.pos += c.len_utf8();
        }
    }

    fn eat(&mut self, expected: char) -> bool {
        if self.peek_char() == Some(expected) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) {
        while self.peek_char().map_or(false, |c| c.is_whitespace()) {
            self.advance();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ident(name: &str) -> Token {
        Token::Identifier {
            name: name.into(),
            quoted: false,
        }
    }

    #[test]
    fn test_tokenize_operators() {
        let tokens = tokenize("a ** 2 >= b != c <> d").unwrap();
        assert_eq!(
            tokens,
            vec![
                ident("a"),
                Token::DoubleStar,
                Token::Number(2.0),
                Token::GreaterEqual,
                ident("b"),
                Token::NotEqual,
                ident("c"),
                Token::NotEqual,
                ident("d"),
                Token::Eof,
            ]
        );
    }

    #[test]
    fn test_tokenize_strings() {
        let tokens = tokenize(r#"'North' "it\"s""#).unwrap();
        assert_eq!(
            tokens,
            vec![
                Token::String("North".into()),
                Token::String("it\"s".into()),
                Token::Eof
            ]
        );
        assert!(tokenize("'open").is_err());
    }

    #[test]
    fn test_tokenize_unicode_and_quoted_names() {
        let tokens = tokenize("銷售額 + `unit price`").unwrap();
        assert_eq!(tokens[0], ident("銷售額"));
        assert_eq!(
            tokens[2],
            Token::Identifier {
                name: "unit price".into(),
                quoted: true
            }
        );
    }

    #[test]
    fn test_tokenize_numbers() {
        assert_eq!(tokenize("1.5e3").unwrap()[0], Token::Number(1500.0));
        assert_eq!(tokenize(".25").unwrap()[0], Token::Number(0.25));
        // `e` without digits is not an exponent
        let tokens = tokenize("2e").unwrap();
        assert_eq!(tokens[0], Token::Number(2.0));
        assert_eq!(tokens[1], ident("e"));
    }

    #[test]
    fn test_tokenize_number_edges() {
        assert_eq!(tokenize("1.").unwrap()[0], Token::Number(1.0));
        assert_eq!(tokenize("3e+2").unwrap()[0], Token::Number(300.0));
        assert_eq!(tokenize("1.5E-1").unwrap()[0], Token::Number(0.15));
        assert_eq!(tokenize("007").unwrap()[0], Token::Number(7.0));
    }

    #[test]
    fn test_tokenize_rejects_unknown_characters() {
        assert!(matches!(tokenize("a $ b"), Err(FormulaError::Parse(_))));
        assert!(matches!(tokenize("!a"), Err(FormulaError::Parse(_))));
    }

    #[test]
    fn test_keywords() {
        assert!(is_keyword("AND"));
        assert!(is_keyword("True"));
        assert!(!is_keyword("revenue"));
    }
}
