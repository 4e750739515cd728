//! Token format — the one wire contract both sides of the engine share
//! (spec §3, §6): `<TYPE>_<HEX8>`, regex `\b[A-Z]+_[0-9A-F]{8}\b`.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;

pub static TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Z]+_[0-9A-F]{8}\b").expect("static token regex"));

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Token(String);

impl Token {
    /// Mint a token of the given prefix from 8 random uppercase hex
    /// characters drawn from a cryptographic source (spec §4.4).
    pub fn mint(prefix: &str, rng: &mut impl rand::RngCore) -> Self {
        let mut bytes = [0u8; 4];
        rng.fill_bytes(&mut bytes);
        let hex: String = bytes.iter().map(|b| format!("{:02X}", b)).collect();
        Token(format!("{prefix}_{hex}"))
    }

    /// Parse a string as a token if it matches the wire format exactly.
    pub fn parse(s: &str) -> Option<Token> {
        if TOKEN_RE.is_match(s) && TOKEN_RE.find(s).map(|m| m.as_str()) == Some(s) {
            Some(Token(s.to_string()))
        } else {
            None
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
