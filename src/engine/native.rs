//! In-process engine backed by the `argon2` crate.

use argon2::password_hash::{Output, PasswordHash, Salt};
use argon2::{Algorithm, Argon2, Block, Params, Version};
use zeroize::Zeroizing;

use super::memory::{LinearMemory, MAX_PAGES};
use super::{Engine, Pointer, RawParams, Trap};

/// Largest memory exponent the engine will compute with (2^22 KiB = 4 GiB).
pub const MAX_MEMORY_COST: u32 = 22;

/// An Argon2 engine that keeps its buffers in a private [`LinearMemory`].
///
/// Argon2 working memory lives on the host heap. It is reserved fallibly, so a
/// cost the host cannot satisfy traps instead of aborting the process.
#[derive(Debug)]
pub struct NativeEngine {
    memory: LinearMemory,
    max_memory_cost: u32,
}

impl Default for NativeEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl NativeEngine {
    /// Default buffer space limit, in pages (16 MiB).
    pub const DEFAULT_MAX_PAGES: usize = 256;

    pub fn new() -> Self {
        Self::with_max_pages(Self::DEFAULT_MAX_PAGES)
    }

    pub fn with_max_pages(max_pages: usize) -> Self {
        Self {
            memory: LinearMemory::new(1, max_pages.min(MAX_PAGES)),
            max_memory_cost: MAX_MEMORY_COST,
        }
    }

    /// Lowers the largest memory exponent accepted by `hash` and `verify`.
    pub fn with_max_memory_cost(mut self, max_memory_cost: u32) -> Self {
        self.max_memory_cost = max_memory_cost.min(MAX_MEMORY_COST);
        self
    }

    /// Largest `m` (in KiB) this engine will compute with.
    fn memory_limit(&self) -> u32 {
        1 << self.max_memory_cost
    }

    /// Bytes of engine memory currently allocated.
    pub fn in_use(&self) -> usize {
        self.memory.in_use()
    }

    pub fn high_water(&self) -> usize {
        self.memory.high_water()
    }

    /// Writes `message` into engine memory and reports it.
    fn trap(&mut self, message: String) -> Trap {
        log::debug!("engine trap: {message}");

        let Some(ptr) = self.memory.allocate(message.len()) else {
            return Trap {
                message: Pointer::NULL,
                len: 0,
            };
        };
        if let Some(dest) = self.memory.get_mut(ptr, message.len()) {
            dest.copy_from_slice(message.as_bytes());
        }
        Trap {
            message: ptr,
            len: message.len(),
        }
    }

    fn copy_in(&self, ptr: Pointer, len: usize) -> Result<Zeroizing<Vec<u8>>, String> {
        self.memory
            .get(ptr, len)
            .map(|bytes| Zeroizing::new(bytes.to_vec()))
            .ok_or_else(|| format!("region {ptr}+{len} is outside engine memory"))
    }

    fn compute(
        &mut self,
        password: Pointer,
        password_len: usize,
        salt: Pointer,
        salt_len: usize,
        raw: RawParams,
    ) -> Result<Pointer, String> {
        let password = self.copy_in(password, password_len)?;
        let salt = self.copy_in(salt, salt_len)?;

        let algorithm = match raw.algorithm {
            0 => Algorithm::Argon2d,
            1 => Algorithm::Argon2i,
            2 => Algorithm::Argon2id,
            other => return Err(format!("unknown algorithm {other}")),
        };
        let version = match raw.version {
            0x10 => Version::V0x10,
            0x13 => Version::V0x13,
            other => return Err(format!("unknown version {other:#x}")),
        };
        if raw.memory_cost > self.max_memory_cost {
            return Err(format!(
                "memory cost 2^{} exceeds engine limit 2^{}",
                raw.memory_cost, self.max_memory_cost
            ));
        }

        let params = Params::new(
            1 << raw.memory_cost,
            raw.time_cost,
            raw.parallelism_cost,
            Some(raw.output_length),
        )
        .map_err(|e| format!("invalid argon2 parameters: {e}"))?;

        let argon = Argon2::new(algorithm, version, params);
        let mut blocks = working_memory(argon.params().block_count())?;
        let mut digest = Zeroizing::new(vec![0u8; raw.output_length]);
        argon
            .hash_password_into_with_memory(&password, &salt, &mut digest, &mut blocks)
            .map_err(|e| format!("argon2 hashing failed: {e}"))?;

        let Some(out) = self.memory.allocate(raw.output_length) else {
            return Ok(Pointer::NULL);
        };
        self.memory
            .get_mut(out, raw.output_length)
            .ok_or_else(|| format!("digest region {out} is outside engine memory"))?
            .copy_from_slice(&digest);

        Ok(out)
    }

    fn check(
        &self,
        password: Pointer,
        password_len: usize,
        hash: Pointer,
        hash_len: usize,
    ) -> Result<bool, String> {
        let password = self.copy_in(password, password_len)?;
        let encoded = self.copy_in(hash, hash_len)?;

        let encoded =
            std::str::from_utf8(&encoded).map_err(|_| "encoded hash is not UTF-8".to_string())?;
        let parsed =
            PasswordHash::new(encoded).map_err(|e| format!("malformed encoded hash: {e}"))?;

        if let Some(m) = parsed.params.get_decimal("m") {
            if m > self.memory_limit() {
                return Err(format!("memory cost m={m} exceeds engine limit"));
            }
        }

        // Anything past this point that argon2 rejects is a mismatch.
        let (Some(salt), Some(expected)) = (parsed.salt, parsed.hash) else {
            return Ok(false);
        };
        let Ok(algorithm) = parsed.algorithm.as_str().parse::<Algorithm>() else {
            return Ok(false);
        };
        let version = match parsed.version.map(Version::try_from).transpose() {
            Ok(version) => version.unwrap_or_default(),
            Err(_) => return Ok(false),
        };
        let Ok(params) = Params::try_from(&parsed) else {
            return Ok(false);
        };
        let mut salt_buf = [0u8; Salt::MAX_LENGTH];
        let Ok(salt) = salt.decode_b64(&mut salt_buf) else {
            return Ok(false);
        };

        let argon = Argon2::new(algorithm, version, params);
        let mut blocks = working_memory(argon.params().block_count())?;
        let mut digest = Zeroizing::new(vec![0u8; expected.len()]);
        if argon
            .hash_password_into_with_memory(&password, salt, &mut digest, &mut blocks)
            .is_err()
        {
            return Ok(false);
        }

        // `Output` compares in constant time.
        Ok(Output::new(&digest).is_ok_and(|computed| computed == expected))
    }
}

/// Reserves `blocks` KiB of Argon2 working memory without aborting on failure.
fn working_memory(blocks: usize) -> Result<Vec<Block>, String> {
    let mut memory = Vec::new();
    memory
        .try_reserve_exact(blocks)
        .map_err(|e| format!("cannot reserve {blocks} KiB of argon2 working memory: {e}"))?;
    memory.resize(blocks, Block::default());
    Ok(memory)
}

impl Engine for NativeEngine {
    fn allocate(&mut self, size: usize) -> Pointer {
        self.memory.allocate(size).unwrap_or(Pointer::NULL)
    }

    fn deallocate(&mut self, ptr: Pointer, size: usize) -> Result<(), Trap> {
        match self.memory.deallocate(ptr, size) {
            Ok(()) => Ok(()),
            Err(msg) => Err(self.trap(msg)),
        }
    }

    fn hash(
        &mut self,
        password: Pointer,
        password_len: usize,
        salt: Pointer,
        salt_len: usize,
        params: RawParams,
    ) -> Result<Pointer, Trap> {
        match self.compute(password, password_len, salt, salt_len, params) {
            Ok(out) => Ok(out),
            Err(msg) => Err(self.trap(msg)),
        }
    }

    fn verify(
        &mut self,
        password: Pointer,
        password_len: usize,
        hash: Pointer,
        hash_len: usize,
    ) -> Result<bool, Trap> {
        match self.check(password, password_len, hash, hash_len) {
            Ok(matched) => Ok(matched),
            Err(msg) => Err(self.trap(msg)),
        }
    }

    fn memory(&self) -> &[u8] {
        self.memory.as_slice()
    }

    fn memory_mut(&mut self) -> &mut [u8] {
        self.memory.as_mut_slice()
    }
}
