//! Player name validation.
//!
//! Names are the only identity a player has, and they are echoed to every
//! client through `players_online` and `leaderboard`, so they are kept to
//! printable single-line text of bounded length.

use std::collections::HashSet;

/// Name validation errors with helpful messages
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NameError {
    #[error("name is too short (minimum {min} characters)")]
    TooShort { min: usize },

    #[error("name is too long (maximum {max} characters)")]
    TooLong { max: usize },

    #[error("name cannot start or end with whitespace")]
    InvalidWhitespace,

    #[error("name contains invalid characters: {chars}")]
    InvalidCharacters { chars: String },
}

/// Name validation rules
#[derive(Debug, Clone)]
pub struct NameRules {
    pub min_length: usize,
    pub max_length: usize,
    pub allow_spaces: bool,
    pub allow_unicode: bool,
}

impl NameRules {
    /// Rules for character names chosen at registration.
    pub fn player() -> Self {
        NameRules {
            min_length: 1,
            max_length: 24,
            allow_spaces: true,
            allow_unicode: true,
        }
    }
}

/// Validate a name according to the given rules. Lengths count characters,
/// not bytes.
pub fn validate_name(name: &str, rules: &NameRules) -> Result<(), NameError> {
    let len = name.chars().count();
    if len < rules.min_length || name.trim().is_empty() {
        return Err(NameError::TooShort { min: rules.min_length.max(1) });
    }
    if len > rules.max_length {
        return Err(NameError::TooLong { max: rules.max_length });
    }
    if name.trim() != name {
        return Err(NameError::InvalidWhitespace);
    }

    let mut invalid: Vec<char> = Vec::new();
    let mut seen = HashSet::new();
    for ch in name.chars() {
        let valid = if ch.is_control() {
            false
        } else if ch == ' ' {
            rules.allow_spaces
        } else if ch.is_whitespace() {
            false
        } else if ch.is_ascii() {
            ch.is_ascii_graphic()
        } else {
            rules.allow_unicode
        };
        if !valid && seen.insert(ch) {
            invalid.push(ch);
        }
    }
    if !invalid.is_empty() {
        let chars = invalid.iter().map(|c| c.escape_default().to_string()).collect();
        return Err(NameError::InvalidCharacters { chars });
    }
    Ok(())
}

/// Validate a name for a new character
pub fn validate_player_name(name: &str) -> Result<(), NameError> {
    validate_name(name, &NameRules::player())
}
