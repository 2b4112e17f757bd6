use crate::{
    error::{Error, ErrorMsg},
    token::{TextRange, Token, TokenKind},
};
use std::{iter::Peekable, str::Chars};

#[derive(Debug)]
pub struct Lexer<'a> {
    source: &'a str,
    stream: Peekable<Chars<'a>>,
    line: usize,
    start: usize,
    current: usize,
}

impl<'a> Lexer<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            stream: source.chars().peekable(),
            line: 0,
            start: 0,
            current: 0,
        }
    }

    pub fn lex_all(mut self) -> Result<Vec<Token>, Vec<Error>> {
        let mut tokens: Vec<Token> = Vec::default();
        let mut errors: Vec<Error> = Vec::default();
        loop {
            match self.lex() {
                Ok(t) => {
                    if t.kind == TokenKind::EOF {
                        break;
                    } else {
                        tokens.push(t);
                    }
                }
                Err(e) => errors.push(e),
            }
        }
        if errors.is_empty() {
            Ok(tokens)
        } else {
            Err(errors)
        }
    }

    /// Lex the source and drop the tokens that the parser
    /// has no use for, i.e. whitespace and comments
    pub fn lex_all_sanitised(self) -> Result<Vec<Token>, Vec<Error>> {
        self.lex_all().map(|tokens| {
            tokens
                .into_iter()
                .filter(|t| !matches!(t.kind, TokenKind::WHITESPACE | TokenKind::COMMENT))
                .collect()
        })
    }

    pub fn lex(&mut self) -> Result<Token, Error> {
        self.start = self.current;
        match self.advance() {
            Some(c) => match c {
                '!' => Ok(self.lookahead_for_token('=', TokenKind::BANG_EQUAL, TokenKind::BANG)),
                '=' => Ok(self.lookahead_for_token(
                    '=',
                    TokenKind::EQUAL_EQUAL,
                    TokenKind::EQUAL,
                )),
                '"' => self.lex_string(),
                '/' => Ok(self.lex_slash_or_comment()),
                _ => {
                    if let Some(t) = TokenKind::from_char(c) {
                        // If it is a newline, increment the current line count
                        if c == '\n' {
                            self.line += 1;
                        }
                        Ok(self.make_token(t))
                    } else if c.is_ascii_alphabetic() || c == '_' {
                        Ok(self.lex_ident())
                    } else if c.is_ascii_digit() {
                        Ok(self.lex_int())
                    } else {
                        Err(self.error(ErrorMsg::UnexpectedChar))
                    }
                }
            },
            None => {
                if self.start == self.source.len() {
                    Ok(Token::new(
                        TokenKind::EOF,
                        TextRange {
                            start: self.current,
                            end: self.current,
                        },
                        self.line,
                        "end of file".to_string(),
                    ))
                } else {
                    Err(format!("Lex error: {}", ErrorMsg::EndOfStream))
                }
            }
        }
    }

    fn lex_ident(&mut self) -> Token {
        self.advance_while(|c| c.is_ascii_alphanumeric() || c == '_');
        if let Some(t) = TokenKind::from_keyword(self.lexeme_from_range()) {
            self.make_token(t)
        } else {
            self.make_token(TokenKind::IDENT)
        }
    }

    fn lex_int(&mut self) -> Token {
        self.advance_while(|c| c.is_ascii_digit());
        self.make_token(TokenKind::INT)
    }

    fn lex_string(&mut self) -> Result<Token, Error> {
        // Consume the opening apostrophe(")
        self.start += 1;
        while let Some(c) = self.advance_if(|c| c != '"') {
            if c == '\n' {
                let err = self.error(ErrorMsg::UnterminatedString);
                self.line += 1;
                return Err(err);
            }
        }
        let token = self.make_token(TokenKind::STRING);
        // Consume the closing apostrophe("), which
        // is missing if the stream ran out first
        if self.advance().is_none() {
            return Err(self.error(ErrorMsg::UnterminatedString));
        }
        Ok(token)
    }

    fn lex_slash_or_comment(&mut self) -> Token {
        if self.advance_if(|c| c == '/').is_some() {
            self.advance_while(|c| c != '\n');
            self.make_token(TokenKind::COMMENT)
        } else {
            self.make_token(TokenKind::SLASH)
        }
    }

    fn make_token(&self, kind: TokenKind) -> Token {
        Token::new(
            kind,
            self.text_range(),
            self.line,
            self.lexeme_from_range().to_string(),
        )
    }

    fn lexeme_from_range(&self) -> &'a str {
        &self.source[self.start..self.current]
    }

    fn text_range(&self) -> TextRange {
        TextRange {
            start: self.start,
            end: self.current,
        }
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.stream.next()?;
        self.current += c.len_utf8();
        Some(c)
    }

    fn advance_if<F>(&mut self, cond: F) -> Option<char>
    where
        F: FnOnce(char) -> bool,
    {
        if self.stream.peek().filter(|&&c| cond(c)).is_some() {
            self.advance()
        } else {
            None
        }
    }

    fn advance_while<F>(&mut self, cond: F) -> Option<usize>
    where
        F: Fn(char) -> bool,
    {
        let mut count: usize = 0;
        while self.stream.peek().filter(|&&c| cond(c)).is_some() {
            count += 1;
            self.advance();
        }
        count.ne(&0).then_some(count)
    }

    fn lookahead_for_token(
        &mut self,
        match_char: char,
        if_match: TokenKind,
        no_match: TokenKind,
    ) -> Token {
        if self.advance_if(|c| c == match_char).is_some() {
            self.make_token(if_match)
        } else {
            self.make_token(no_match)
        }
    }

    fn error(&self, msg: ErrorMsg) -> Error {
        format!(
            "Lex error at line {}: {} {}",
            self.line + 1,
            msg,
            self.lexeme_from_range()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<TokenKind> {
        Lexer::new(input)
            .lex_all_sanitised()
            .unwrap()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn symbols() {
        assert_eq!(
            kinds("=+(){}[],;:!-/*<> == !="),
            vec![
                TokenKind::EQUAL,
                TokenKind::PLUS,
                TokenKind::LPAREN,
                TokenKind::RPAREN,
                TokenKind::LBRACE,
                TokenKind::RBRACE,
                TokenKind::LBRACKET,
                TokenKind::RBRACKET,
                TokenKind::COMMA,
                TokenKind::SEMICOLON,
                TokenKind::COLON,
                TokenKind::BANG,
                TokenKind::MINUS,
                TokenKind::SLASH,
                TokenKind::STAR,
                TokenKind::LESS,
                TokenKind::GREATER,
                TokenKind::EQUAL_EQUAL,
                TokenKind::BANG_EQUAL,
            ]
        );
    }

    #[test]
    fn let_with_function() {
        let tokens = Lexer::new("let add_two = fn(x) { x + 2 }; // trailing")
            .lex_all_sanitised()
            .unwrap();
        let lexemes = tokens.iter().map(|t| t.lexeme.as_str()).collect::<Vec<_>>();
        assert_eq!(
            lexemes,
            vec!["let", "add_two", "=", "fn", "(", "x", ")", "{", "x", "+", "2", "}", ";"]
        );
        assert_eq!(tokens[0].kind, TokenKind::LET);
        assert_eq!(tokens[3].kind, TokenKind::FN);
        assert_eq!(tokens[10].kind, TokenKind::INT);
    }

    #[test]
    fn string() {
        let tokens = Lexer::new("\"hello world\"").lex_all().unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].kind, TokenKind::STRING);
        assert_eq!(tokens[0].lexeme, "hello world");
        assert_eq!(tokens[0].range, TextRange { start: 1, end: 12 });
    }

    #[test]
    fn lines() {
        let tokens = Lexer::new("1\n2\n\n3").lex_all_sanitised().unwrap();
        let lines = tokens.iter().map(|t| t.line).collect::<Vec<_>>();
        assert_eq!(lines, vec![0, 1, 3]);
    }

    #[test]
    fn unexpected_char() {
        let errors = Lexer::new("let a = 1 @ 2;").lex_all().unwrap_err();
        assert_eq!(
            errors,
            vec![format!("Lex error at line 1: {} @", ErrorMsg::UnexpectedChar)]
        );
    }

    #[test]
    fn unterminated_string() {
        let errors = Lexer::new("\"abc").lex_all().unwrap_err();
        assert_eq!(
            errors,
            vec![format!(
                "Lex error at line 1: {} abc",
                ErrorMsg::UnterminatedString
            )]
        );
    }
}
