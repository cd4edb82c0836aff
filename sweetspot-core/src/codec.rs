//! Canonical keys for configuration tuples.
//!
//! Each element is serialized to a typed token (`n:`, `s:`, `b:` prefixes, or
//! the bare None sentinel `~`) and the token list is wrapped in a JSON array.
//! The typed prefix keeps `1` and `"1"` apart, and the JSON string framing
//! keeps element boundaries intact no matter what characters a value holds,
//! so `[a, None, b]` can never collide with `["a,", b]` or `["a,,b"]`.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::domain::ParameterDomain;
use crate::error::{Error, Result};
use crate::types::ParamValue;

/// Token substituted for missing values before encoding.
pub const NONE_TOKEN: &str = "~";

/// Injective string encoding of a configuration tuple.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CanonicalKey(String);

impl CanonicalKey {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Encodes configuration tuples into [`CanonicalKey`]s.
pub struct KeyCodec;

impl KeyCodec {
    /// Encode a tuple declared against `domains`.
    ///
    /// Categorical values are keyed by their raw value, never by ordinal, so a
    /// key stays valid without the descriptor at hand.
    pub fn encode(tuple: &[ParamValue], domains: &[ParameterDomain]) -> Result<CanonicalKey> {
        if tuple.len() != domains.len() {
            return Err(Error::SchemaMismatch {
                expected: domains.len(),
                actual: tuple.len(),
            });
        }
        Ok(Self::encode_values(tuple))
    }

    /// Encode a tuple without checking it against a schema.
    #[must_use]
    pub fn encode_values(tuple: &[ParamValue]) -> CanonicalKey {
        let tokens: Vec<String> = tuple.iter().map(token).collect();
        CanonicalKey(Value::from(tokens).to_string())
    }

    /// Recover the tuple a key was encoded from.
    pub fn decode(key: &CanonicalKey) -> Result<Vec<ParamValue>> {
        let tokens: Vec<String> = serde_json::from_str(key.as_str())?;
        tokens.iter().map(|t| parse_token(t)).collect()
    }
}

fn token(value: &ParamValue) -> String {
    match value {
        ParamValue::Missing => NONE_TOKEN.to_string(),
        ParamValue::Bool(b) => format!("b:{b}"),
        // -0.0 and 0.0 compare equal and must share a key
        ParamValue::Number(n) if *n == 0.0 => "n:0".to_string(),
        ParamValue::Number(n) => format!("n:{n}"),
        ParamValue::Text(s) => format!("s:{s}"),
    }
}

fn parse_token(token: &str) -> Result<ParamValue> {
    if token == NONE_TOKEN {
        return Ok(ParamValue::Missing);
    }
    let malformed = || Error::MalformedPayload(format!("unrecognized key token `{token}`"));
    match token.split_once(':') {
        Some(("b", "true")) => Ok(ParamValue::Bool(true)),
        Some(("b", "false")) => Ok(ParamValue::Bool(false)),
        Some(("n", n)) => n.parse().map(ParamValue::Number).map_err(|_| malformed()),
        Some(("s", s)) => Ok(ParamValue::Text(s.to_string())),
        _ => Err(malformed()),
    }
}
