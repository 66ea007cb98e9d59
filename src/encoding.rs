//! The PHC-style text encoding of a password hash.
//!
//! ```text
//! $<algorithm>$v=<version>$m=<memory>,t=<time>,p=<parallelism>$<salt>$<digest>
//! ```
//!
//! Salt and digest are standard base64 without padding. The string contains no
//! whitespace and carries everything needed to verify it.

use std::fmt;
use std::str::FromStr;

use base64::Engine;
use base64::engine::general_purpose::STANDARD_NO_PAD as B64;

use crate::error::ParseError;
use crate::params::{Algorithm, Parameters, Version};

/// A self-describing password hash.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedHash {
    algorithm: Algorithm,
    version: Version,
    memory: u32,
    time_cost: u32,
    parallelism_cost: u32,
    salt: Vec<u8>,
    digest: Vec<u8>,
}

impl EncodedHash {
    /// Returns `None` if `2^memory_cost` does not fit the `m=` field.
    pub(crate) fn new(params: &Parameters, salt: Vec<u8>, digest: Vec<u8>) -> Option<Self> {
        Some(Self {
            algorithm: params.algorithm,
            version: params.version,
            memory: params.memory_size()?,
            time_cost: params.time_cost,
            parallelism_cost: params.parallelism_cost,
            salt,
            digest,
        })
    }

    pub fn algorithm(&self) -> Algorithm {
        self.algorithm
    }

    pub fn version(&self) -> Version {
        self.version
    }

    /// The literal `m=` value.
    pub fn memory(&self) -> u32 {
        self.memory
    }

    pub fn time_cost(&self) -> u32 {
        self.time_cost
    }

    pub fn parallelism_cost(&self) -> u32 {
        self.parallelism_cost
    }

    pub fn salt(&self) -> &[u8] {
        &self.salt
    }

    pub fn digest(&self) -> &[u8] {
        &self.digest
    }

    /// Recovers the parameters this hash was produced with.
    ///
    /// `None` when `m=` is not a power of two, which can only happen for
    /// hashes produced elsewhere.
    pub fn parameters(&self) -> Option<Parameters> {
        if !self.memory.is_power_of_two() {
            return None;
        }

        Some(Parameters {
            algorithm: self.algorithm,
            memory_cost: self.memory.trailing_zeros(),
            time_cost: self.time_cost,
            parallelism_cost: self.parallelism_cost,
            version: self.version,
            output_length: self.digest.len(),
        })
    }
}

impl fmt::Display for EncodedHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "${}$v={}$m={},t={},p={}${}${}",
            self.algorithm,
            self.version as u32,
            self.memory,
            self.time_cost,
            self.parallelism_cost,
            B64.encode(&self.salt),
            B64.encode(&self.digest),
        )
    }
}

impl FromStr for EncodedHash {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut segments = s.split('$');

        if segments.next() != Some("") {
            return Err(ParseError::MissingSegment("leading '$'"));
        }

        let algorithm = segments
            .next()
            .ok_or(ParseError::MissingSegment("algorithm"))?
            .parse::<Algorithm>()?;

        let version = segments.next().ok_or(ParseError::MissingSegment("version"))?;
        let version = version
            .strip_prefix("v=")
            .and_then(decimal)
            .ok_or_else(|| ParseError::UnsupportedVersion(version.to_string()))
            .and_then(Version::try_from)?;

        let params = segments
            .next()
            .ok_or(ParseError::MissingSegment("parameters"))?;
        let mut fields = params.split(',');
        let memory = field(fields.next(), "m")?;
        let time_cost = field(fields.next(), "t")?;
        let parallelism_cost = field(fields.next(), "p")?;
        if let Some(extra) = fields.next() {
            return Err(ParseError::InvalidParameter(extra.to_string()));
        }

        let salt = segments.next().ok_or(ParseError::MissingSegment("salt"))?;
        let salt = B64
            .decode(salt)
            .map_err(|_| ParseError::InvalidBase64("salt"))?;

        let digest = segments.next().ok_or(ParseError::MissingSegment("digest"))?;
        let digest = B64
            .decode(digest)
            .map_err(|_| ParseError::InvalidBase64("digest"))?;

        if segments.next().is_some() {
            return Err(ParseError::TrailingSegment);
        }

        Ok(Self {
            algorithm,
            version,
            memory,
            time_cost,
            parallelism_cost,
            salt,
            digest,
        })
    }
}

/// Plain decimal digits only; no sign, no whitespace.
fn decimal(s: &str) -> Option<u32> {
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse().ok()
}

fn field(segment: Option<&str>, key: &'static str) -> Result<u32, ParseError> {
    let segment = segment.ok_or(ParseError::MissingSegment(key))?;
    segment
        .strip_prefix(key)
        .and_then(|rest| rest.strip_prefix('='))
        .and_then(decimal)
        .ok_or_else(|| ParseError::InvalidParameter(segment.to_string()))
}
