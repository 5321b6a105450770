use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A validated six-digit instrument code, e.g. "600000".
///
/// Intake validates symbols here so the matching core can stay free of
/// field checks; by the time an order reaches the engine its symbol is
/// structurally sound.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Symbol(String);

/// Listing board an instrument trades on, derived from its code prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Board {
    Main,
    ChiNext,
    Star,
}

impl Symbol {
    pub fn code(&self) -> &str {
        &self.0
    }

    /// 300xxx lists on ChiNext, 688xxx on STAR, everything else main board.
    pub fn board(&self) -> Board {
        match &self.0[..3] {
            "300" => Board::ChiNext,
            "688" => Board::Star,
            _ => Board::Main,
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Symbol {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() == 6 && s.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Symbol(s.to_string()))
        } else {
            Err(format!("invalid instrument symbol: `{}`", s))
        }
    }
}

impl TryFrom<String> for Symbol {
    type Error = String;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl From<Symbol> for String {
    fn from(s: Symbol) -> Self {
        s.0
    }
}
