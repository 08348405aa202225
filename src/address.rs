use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize};

use crate::workflow::WorkflowError;

/// Voter identity as a 0x-prefixed, 40-hex-digit address string.
///
/// The workflow never interprets the address beyond its shape; signature
/// checks belong to the wallet/ledger layer.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct VoterAddress(String);

// Deserialization goes through `parse` so malformed addresses cannot enter
// through scenario files or snapshots.
impl<'de> Deserialize<'de> for VoterAddress {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        VoterAddress::parse(&raw).map_err(serde::de::Error::custom)
    }
}

fn address_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^0x[0-9a-fA-F]{40}$").expect("address pattern compiles"))
}

impl VoterAddress {
    /// Validate and wrap an address string.
    pub fn parse(input: &str) -> Result<Self, WorkflowError> {
        let trimmed = input.trim();
        if address_pattern().is_match(trimmed) {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(WorkflowError::MalformedAddress {
                input: input.to_string(),
            })
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VoterAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for VoterAddress {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}
