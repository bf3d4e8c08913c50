//! API key minting.
//!
//! Keys are 256 bits from the operating system CSPRNG, hex encoded.
//! They are bearer credentials, so they are zeroized on drop and never
//! printed in full by `Debug`.

use rand::rngs::OsRng;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use zeroize::{Zeroize, ZeroizeOnDrop};

/// Number of random bytes behind every key.
pub const API_KEY_BYTES: usize = 32;

/// Hex characters shown when a key is logged.
const REDACTED_PREFIX: usize = 8;

/// A high-entropy bearer credential.
#[derive(Clone, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
#[serde(transparent)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Short prefix that is safe to put in logs.
    pub fn redacted(&self) -> String {
        let prefix: String = self.0.chars().take(REDACTED_PREFIX).collect();
        format!("{}…", prefix)
    }

    /// Constant-time comparison against a presented key.
    pub fn matches(&self, candidate: &str) -> bool {
        constant_time_eq(self.0.as_bytes(), candidate.as_bytes())
    }
}

impl From<String> for ApiKey {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl PartialEq for ApiKey {
    fn eq(&self, other: &Self) -> bool {
        self.matches(other.as_str())
    }
}

impl Eq for ApiKey {}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ApiKey").field(&self.redacted()).finish()
    }
}

/// Mint a fresh key: 32 bytes from `OsRng`, lowercase hex.
pub fn new_api_key() -> ApiKey {
    let mut bytes = [0u8; API_KEY_BYTES];
    OsRng.fill_bytes(&mut bytes);
    let key = ApiKey(hex::encode(bytes));
    bytes.zeroize();
    key
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}
