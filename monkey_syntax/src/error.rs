use std::fmt::Display;

pub type Error = String;

#[derive(Debug)]
pub enum ErrorMsg {
    // Lex errors
    UnexpectedChar,
    UnterminatedString,
    // Parse errors
    ExpectedToken,
    NoPrefixRule,
    InvalidInteger,
    // EOF
    EndOfStream,
}

impl Display for ErrorMsg {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::UnexpectedChar => "unexpected character",
            Self::UnterminatedString => "unterminated string",
            Self::ExpectedToken => "expected",
            Self::NoPrefixRule => "no prefix parse rule for",
            Self::InvalidInteger => "invalid integer literal",
            Self::EndOfStream => "end of stream",
        })
    }
}
