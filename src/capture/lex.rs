use crate::capture::ParseError;
use logos::{self, Logos};

//===========================================================================//

struct LexerState {
    line: u32,
}

impl Default for LexerState {
    fn default() -> LexerState {
        LexerState { line: 1 }
    }
}

//===========================================================================//

fn hex_digit(chr: u8) -> u32 {
    match chr {
        b'0'..=b'9' => u32::from(chr - b'0'),
        b'a'..=b'f' => u32::from(chr - b'a' + 10),
        _ => u32::from(chr - b'A' + 10),
    }
}

fn address_callback(lexer: &mut logos::Lexer<TokenKind>) -> u32 {
    let slice = lexer.slice();
    // Drop the trailing colon; at most eight digits remain, so the value
    // fits in 32 bits.
    slice[..slice.len() - 1]
        .iter()
        .fold(0, |addr, &chr| (addr << 4) | hex_digit(chr))
}

fn byte_callback(lexer: &mut logos::Lexer<TokenKind>) -> u8 {
    lexer.slice().iter().fold(0, |byte, &chr| (byte << 4) | hex_digit(chr) as u8)
}

fn newline_callback(lexer: &mut logos::Lexer<TokenKind>) -> logos::Skip {
    lexer.extras.line += 1;
    logos::Skip
}

#[derive(Debug, Eq, Logos, PartialEq)]
#[logos(extras = LexerState)]
#[logos(skip r"[ \t\r]+")] // whitespace
#[logos(skip r";[^\n]*")] // comments
#[logos(source = [u8])]
enum TokenKind {
    #[regex(r"[0-9A-Fa-f]{1,8}:", address_callback)]
    Address(u32),
    #[regex(r"[0-9A-Fa-f]{1,2}", byte_callback)]
    Byte(u8),
    #[token("\n", newline_callback)]
    Linebreak,
}

//===========================================================================//

/// A single lexical token from a capture file.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Token {
    /// An `ADDR:` marker setting the current address.
    Address(u32),
    /// A sampled data byte.
    Byte(u8),
}

//===========================================================================//

/// A lexer for tokenizing a capture file.
pub struct TokenLexer<'a> {
    lexer: logos::Lexer<'a, TokenKind>,
}

impl<'a> TokenLexer<'a> {
    /// Constructs a new lexer in its initial state.
    pub fn new(input: &[u8]) -> TokenLexer<'_> {
        TokenLexer { lexer: TokenKind::lexer(input) }
    }
}

impl<'a> Iterator for TokenLexer<'a> {
    type Item = Result<Token, ParseError>;

    fn next(&mut self) -> Option<Result<Token, ParseError>> {
        loop {
            match self.lexer.next()? {
                Ok(TokenKind::Address(addr)) => {
                    return Some(Ok(Token::Address(addr)));
                }
                Ok(TokenKind::Byte(data)) => return Some(Ok(Token::Byte(data))),
                // Linebreaks are consumed by their callback; any that
                // surface anyway carry no token.
                Ok(TokenKind::Linebreak) => continue,
                Err(()) => {
                    let message = format!(
                        "invalid character: {}",
                        self.lexer.slice().escape_ascii()
                    );
                    let line = self.lexer.extras.line;
                    return Some(Err(ParseError { line, message }));
                }
            }
        }
    }
}

//===========================================================================//
