//! Hash parameters and their defaults.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;

/// Argon2 variant.
///
/// The discriminant is the integer the engine expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Algorithm {
    /// Resistant to GPU cracking, exposed to side-channel attacks.
    Argon2d = 0,
    /// Resistant to side-channel attacks.
    Argon2i = 1,
    /// Hybrid of Argon2i and Argon2d passes.
    Argon2id = 2,
}

impl Algorithm {
    pub const ALL: [Algorithm; 3] = [Algorithm::Argon2d, Algorithm::Argon2i, Algorithm::Argon2id];

    pub fn name(self) -> &'static str {
        match self {
            Algorithm::Argon2d => "argon2d",
            Algorithm::Argon2i => "argon2i",
            Algorithm::Argon2id => "argon2id",
        }
    }
}

impl fmt::Display for Algorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Algorithm {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Algorithm::ALL
            .into_iter()
            .find(|a| a.name() == s)
            .ok_or_else(|| ParseError::UnknownAlgorithm(s.to_string()))
    }
}

/// Argon2 revision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum Version {
    /// Version 16, overwrites memory blocks.
    V0x10 = 0x10,
    /// Version 19, XORs into memory blocks.
    V0x13 = 0x13,
}

impl Version {
    pub const ALL: [Version; 2] = [Version::V0x10, Version::V0x13];
}

impl From<Version> for u32 {
    fn from(v: Version) -> u32 {
        v as u32
    }
}

impl TryFrom<u32> for Version {
    type Error = ParseError;

    fn try_from(v: u32) -> Result<Self, Self::Error> {
        match v {
            0x10 => Ok(Version::V0x10),
            0x13 => Ok(Version::V0x13),
            other => Err(ParseError::UnsupportedVersion(other.to_string())),
        }
    }
}

impl FromStr for Version {
    type Err = ParseError;

    /// Accepts decimal (`19`) or hex (`0x13`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parsed = match s.strip_prefix("0x") {
            Some(hex) => u32::from_str_radix(hex, 16),
            None => s.parse(),
        };
        parsed
            .map_err(|_| ParseError::UnsupportedVersion(s.to_string()))
            .and_then(Version::try_from)
    }
}

/// A fully resolved parameter set for one hash computation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Parameters {
    pub algorithm: Algorithm,
    /// Memory exponent: the engine uses `2^memory_cost`.
    pub memory_cost: u32,
    pub time_cost: u32,
    pub parallelism_cost: u32,
    pub version: Version,
    /// Digest length in bytes.
    pub output_length: usize,
}

impl Default for Parameters {
    fn default() -> Self {
        Self {
            algorithm: Algorithm::Argon2id,
            memory_cost: 12, // 2^12 = 4096
            time_cost: 3,
            parallelism_cost: 1,
            version: Version::V0x13,
            output_length: 32,
        }
    }
}

impl Parameters {
    /// The literal `m=` value, or `None` if `2^memory_cost` overflows a u32.
    pub fn memory_size(&self) -> Option<u32> {
        1u32.checked_shl(self.memory_cost)
    }
}

/// A caller-supplied subset of [`Parameters`].
///
/// Unset fields fall back to the defaults when resolved.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields, default)]
pub struct PartialParameters {
    pub algorithm: Option<Algorithm>,
    pub memory_cost: Option<u32>,
    pub time_cost: Option<u32>,
    pub parallelism_cost: Option<u32>,
    pub version: Option<Version>,
    pub output_length: Option<usize>,
}

impl PartialParameters {
    pub fn resolve(&self) -> Parameters {
        let default = Parameters::default();

        Parameters {
            algorithm: self.algorithm.unwrap_or(default.algorithm),
            memory_cost: self.memory_cost.unwrap_or(default.memory_cost),
            time_cost: self.time_cost.unwrap_or(default.time_cost),
            parallelism_cost: self.parallelism_cost.unwrap_or(default.parallelism_cost),
            version: self.version.unwrap_or(default.version),
            output_length: self.output_length.unwrap_or(default.output_length),
        }
    }

    /// Overlays `other` on top of `self`; fields set in `other` win.
    pub fn merge(self, other: PartialParameters) -> PartialParameters {
        PartialParameters {
            algorithm: other.algorithm.or(self.algorithm),
            memory_cost: other.memory_cost.or(self.memory_cost),
            time_cost: other.time_cost.or(self.time_cost),
            parallelism_cost: other.parallelism_cost.or(self.parallelism_cost),
            version: other.version.or(self.version),
            output_length: other.output_length.or(self.output_length),
        }
    }
}

impl From<Parameters> for PartialParameters {
    fn from(p: Parameters) -> Self {
        Self {
            algorithm: Some(p.algorithm),
            memory_cost: Some(p.memory_cost),
            time_cost: Some(p.time_cost),
            parallelism_cost: Some(p.parallelism_cost),
            version: Some(p.version),
            output_length: Some(p.output_length),
        }
    }
}
