use log::trace;
use crate::language::token::{Token, TokenType, RESERVED_KEYWORDS};
use crate::language::error::{Result, ErrorCode};
use crate::lexer_error;

/// On-demand tokenizer over a fully resident source buffer.
///
/// Each call to [`Lexer::next_token`] materializes one token. The cursor only
/// moves forward; to re-read the same text build a fresh `Lexer`.
pub struct Lexer {
    pub(crate) input: Vec<char>,
    pub(crate) position: usize,
    pub(crate) line: usize,
    pub(crate) column: usize,
    finished: bool,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Lexer {
            input: input.chars().collect(),
            position: 0,
            line: 1,
            column: 1,
            finished: false,
        }
    }

    pub fn peek(&self) -> Option<char> {
        self.input.get(self.position).copied()
    }

    pub fn peek_next(&self) -> Option<char> {
        self.input.get(self.position + 1).copied()
    }

    pub fn consume(&mut self) -> Option<char> {
        if self.position < self.input.len() {
            let ch = self.input[self.position];
            self.position += 1;

            if ch == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }

            Some(ch)
        } else {
            None
        }
    }

    pub fn skip_whitespace(&mut self) {
        while let Some(ch) = self.peek() {
            if ch.is_whitespace() {
                self.consume();
            } else {
                break;
            }
        }
    }

    /// Skips a `{ ... }` comment. Comments do not nest: the first `}` closes it.
    pub fn skip_comment(&mut self) -> Result<()> {
        let (line, column) = (self.line, self.column);
        self.consume();

        while let Some(ch) = self.consume() {
            if ch == '}' {
                return Ok(());
            }
        }

        lexer_error!(ErrorCode::UnterminatedComment, "Comment is not closed", "{", line, column)
    }

    pub fn read_identifier(&mut self) -> String {
        let mut identifier = String::new();

        while let Some(ch) = self.peek() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                identifier.push(ch);
                self.consume();
            } else {
                break;
            }
        }

        identifier
    }

    fn read_number(&mut self) -> Result<TokenType> {
        let (line, column) = (self.line, self.column);
        let mut number = String::new();

        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                number.push(ch);
                self.consume();
            } else {
                break;
            }
        }

        // A dot only belongs to the literal when a digit follows it.
        let is_real = self.peek() == Some('.') && self.peek_next().is_some_and(|c| c.is_ascii_digit());
        if !is_real {
            return match number.parse::<i64>() {
                Ok(value) => Ok(TokenType::IntegerConst(value)),
                Err(_) => lexer_error!(
                    ErrorCode::InvalidNumber,
                    format!("Integer literal out of range: {}", number),
                    number,
                    line,
                    column
                ),
            };
        }

        number.push('.');
        self.consume();
        while let Some(ch) = self.peek() {
            if ch.is_ascii_digit() {
                number.push(ch);
                self.consume();
            } else {
                break;
            }
        }

        match number.parse::<f64>() {
            Ok(value) if value.is_finite() => Ok(TokenType::RealConst(value)),
            _ => lexer_error!(
                ErrorCode::InvalidNumber,
                format!("Invalid real literal: {}", number),
                number,
                line,
                column
            ),
        }
    }

    fn single(&mut self, token_type: TokenType, line: usize, column: usize) -> Result<Token> {
        self.consume();
        Ok(Token::new(token_type, line, column))
    }

    pub fn next_token(&mut self) -> Result<Token> {
        loop {
            self.skip_whitespace();
            if self.peek() == Some('{') {
                self.skip_comment()?;
            } else {
                break;
            }
        }

        let line = self.line;
        let column = self.column;

        let token = if let Some(ch) = self.peek() {
            match ch {
                '+' => self.single(TokenType::Plus, line, column),
                '-' => self.single(TokenType::Minus, line, column),
                '*' => self.single(TokenType::Mul, line, column),
                '/' => self.single(TokenType::FloatDiv, line, column),
                '(' => self.single(TokenType::LParen, line, column),
                ')' => self.single(TokenType::RParen, line, column),
                ';' => self.single(TokenType::Semi, line, column),
                '.' => self.single(TokenType::Dot, line, column),
                ',' => self.single(TokenType::Comma, line, column),
                ':' => {
                    self.consume();
                    if self.peek() == Some('=') {
                        self.consume();
                        Ok(Token::new(TokenType::Assign, line, column))
                    } else {
                        Ok(Token::new(TokenType::Colon, line, column))
                    }
                },
                '0'..='9' => {
                    let number = self.read_number()?;
                    Ok(Token::new(number, line, column))
                },
                _ if ch.is_ascii_alphabetic() || ch == '_' => {
                    let ident = self.read_identifier();
                    let token_type = match RESERVED_KEYWORDS.get(ident.to_ascii_uppercase().as_str()) {
                        Some(keyword) => keyword.clone(),
                        None => TokenType::Id(ident),
                    };
                    Ok(Token::new(token_type, line, column))
                },
                _ => lexer_error!(
                    ErrorCode::InvalidCharacter,
                    format!("Unexpected character: '{}'", ch),
                    ch,
                    line,
                    column
                ),
            }
        } else {
            Ok(Token::new(TokenType::Eof, line, column))
        }?;

        trace!("token {} {} at {}:{}", token.token_type.kind_name(), token, token.line, token.column);
        Ok(token)
    }

    /// Drains the remaining input, ending with the `Eof` token.
    pub fn tokenize(&mut self) -> Result<Vec<Token>> {
        let mut tokens = Vec::new();

        loop {
            let token = self.next_token()?;

            if token.token_type == TokenType::Eof {
                tokens.push(token);
                break;
            }

            tokens.push(token);
        }

        Ok(tokens)
    }
}

impl Iterator for Lexer {
    type Item = Result<Token>;

    /// Yields tokens up to and including `Eof`, or stops after the first error.
    fn next(&mut self) -> Option<Self::Item> {
        if self.finished {
            return None;
        }
        let result = self.next_token();
        match &result {
            Ok(token) if token.token_type == TokenType::Eof => self.finished = true,
            Err(_) => self.finished = true,
            Ok(_) => {}
        }
        Some(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenType> {
        Lexer::new(src)
            .tokenize()
            .expect("tokenize failed")
            .into_iter()
            .map(|t| t.token_type)
            .collect()
    }

    #[test]
    fn dot_without_digit_ends_the_number() {
        assert_eq!(
            kinds("3.x"),
            vec![TokenType::IntegerConst(3), TokenType::Dot, TokenType::Id("x".into()), TokenType::Eof]
        );
        assert_eq!(kinds("END."), vec![TokenType::End, TokenType::Dot, TokenType::Eof]);
    }

    #[test]
    fn assign_is_matched_before_colon() {
        assert_eq!(
            kinds("a : b := c"),
            vec![
                TokenType::Id("a".into()),
                TokenType::Colon,
                TokenType::Id("b".into()),
                TokenType::Assign,
                TokenType::Id("c".into()),
                TokenType::Eof,
            ]
        );
    }

    #[test]
    fn comments_are_skipped_and_positions_tracked() {
        let tokens = Lexer::new("{ note }\n  begin { x } end").tokenize().unwrap();
        assert_eq!(tokens[0].token_type, TokenType::Begin);
        assert_eq!((tokens[0].line, tokens[0].column), (2, 3));
        assert_eq!(tokens[1].token_type, TokenType::End);
        assert_eq!((tokens[1].line, tokens[1].column), (2, 15));
    }

    #[test]
    fn unterminated_comment_is_an_error() {
        let err = Lexer::new("BEGIN { never closed").tokenize().unwrap_err();
        assert_eq!(err.code, ErrorCode::UnterminatedComment);
        assert_eq!((err.line, err.column), (Some(1), Some(7)));
    }

    #[test]
    fn iterator_stops_after_eof() {
        let lexer = Lexer::new("a;");
        let tokens: Vec<_> = lexer.collect();
        assert_eq!(tokens.len(), 3);
        assert!(matches!(tokens[2], Ok(Token { token_type: TokenType::Eof, .. })));
    }
}
