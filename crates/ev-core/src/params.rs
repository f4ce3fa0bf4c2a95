//! Tokenizer for the `key=value` parameter strings stored with each run,
//! e.g. `"sides=6,bet_on=6,payout=5,seed=42"`.
//!
//! Lookups never fail loudly: a missing key or a malformed value only makes
//! that one key absent, every other key in the same string is unaffected.

use std::str::FromStr;
use thiserror::Error;

/// Why a single key lookup produced no value.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParamError {
    /// No token carries the key.
    #[error("key `{0}` not present")]
    Missing(String),
    /// Every token carrying the key has a value of the wrong shape.
    #[error("key `{key}` has malformed value `{value}`")]
    Malformed { key: String, value: String },
}

/// One `key=value` pair, both sides trimmed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ParamToken<'a> {
    pub key: &'a str,
    pub value: &'a str,
}

/// Parameter string split into tokens, in source order.
#[derive(Clone, Debug, Default)]
pub struct ParamString<'a> {
    tokens: Vec<ParamToken<'a>>,
}

impl<'a> ParamString<'a> {
    /// Split on `,`, then on the first `=`. Tokens without `=` or with an
    /// empty key are skipped.
    pub fn parse(source: &'a str) -> Self {
        let tokens = source
            .split(',')
            .filter_map(|raw| {
                let (key, value) = raw.split_once('=')?;
                let key = key.trim();
                if key.is_empty() {
                    return None;
                }
                Some(ParamToken {
                    key,
                    value: value.trim(),
                })
            })
            .collect();
        Self { tokens }
    }

    pub fn tokens(&self) -> &[ParamToken<'a>] {
        &self.tokens
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    /// First occurrence of `key` with a well-formed value wins.
    fn lookup<T>(&self, key: &str, parse: fn(&str) -> Option<T>) -> Result<T, ParamError> {
        let mut malformed: Option<&str> = None;
        for token in self.tokens.iter().filter(|t| t.key == key) {
            match parse(token.value) {
                Some(v) => return Ok(v),
                None => {
                    malformed.get_or_insert(token.value);
                }
            }
        }
        Err(match malformed {
            Some(value) => ParamError::Malformed {
                key: key.to_string(),
                value: value.to_string(),
            },
            None => ParamError::Missing(key.to_string()),
        })
    }

    pub fn try_u64(&self, key: &str) -> Result<u64, ParamError> {
        self.lookup(key, parse_unsigned::<u64>)
    }

    pub fn try_u32(&self, key: &str) -> Result<u32, ParamError> {
        self.lookup(key, parse_unsigned::<u32>)
    }

    pub fn try_decimal(&self, key: &str) -> Result<f64, ParamError> {
        self.lookup(key, parse_decimal)
    }

    pub fn u64(&self, key: &str) -> Option<u64> {
        self.try_u64(key).ok()
    }

    pub fn u32(&self, key: &str) -> Option<u32> {
        self.try_u32(key).ok()
    }

    pub fn decimal(&self, key: &str) -> Option<f64> {
        self.try_decimal(key).ok()
    }
}

fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

/// ASCII digits only: no sign, no separators.
fn parse_unsigned<T: FromStr>(s: &str) -> Option<T> {
    if !all_digits(s) {
        return None;
    }
    s.parse().ok()
}

/// `digits` or `digits.digits`; no sign, exponent or special values.
fn parse_decimal(s: &str) -> Option<f64> {
    let well_formed = match s.split_once('.') {
        Some((int, frac)) => all_digits(int) && all_digits(frac),
        None => all_digits(s),
    };
    if !well_formed {
        return None;
    }
    s.parse().ok()
}
