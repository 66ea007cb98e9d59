//! The raw Argon2 engine boundary.
//!
//! An engine owns a private flat memory space. The host moves bytes in and out
//! of it through pointers it obtains from [`Engine::allocate`], and must hand
//! every allocation back through [`Engine::deallocate`]. Faults come back as a
//! [`Trap`]: a pointer/length pair naming a UTF-8 message inside engine memory.

pub mod memory;
pub mod native;

use std::fmt;

pub use memory::LinearMemory;
pub use native::NativeEngine;

/// An offset into engine memory. Zero is null.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Pointer(u32);

impl Pointer {
    pub const NULL: Pointer = Pointer(0);

    pub fn new(offset: u32) -> Self {
        Self(offset)
    }

    pub fn is_null(self) -> bool {
        self.0 == 0
    }

    pub fn offset(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// Reverse fault report from the engine.
///
/// `message` is an engine allocation of `len` bytes that the host decodes and
/// then releases. A null `message` means the engine could not even allocate
/// its report.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Trap {
    pub message: Pointer,
    pub len: usize,
}

/// Scalar arguments of a raw hash call, as engine integers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RawParams {
    /// 0 = argon2d, 1 = argon2i, 2 = argon2id
    pub algorithm: u32,
    pub memory_cost: u32,
    pub time_cost: u32,
    pub parallelism_cost: u32,
    pub output_length: usize,
    /// 0x10 or 0x13
    pub version: u32,
}

impl From<&crate::Parameters> for RawParams {
    fn from(p: &crate::Parameters) -> Self {
        Self {
            algorithm: p.algorithm as u32,
            memory_cost: p.memory_cost,
            time_cost: p.time_cost,
            parallelism_cost: p.parallelism_cost,
            output_length: p.output_length,
            version: p.version as u32,
        }
    }
}

/// The capability interface of a raw Argon2 engine.
pub trait Engine {
    /// Returns [`Pointer::NULL`] when the request cannot be satisfied.
    fn allocate(&mut self, size: usize) -> Pointer;

    fn deallocate(&mut self, ptr: Pointer, size: usize) -> Result<(), Trap>;

    /// Returns a pointer to `output_length` digest bytes owned by the caller,
    /// or null if the engine could not allocate them.
    fn hash(
        &mut self,
        password: Pointer,
        password_len: usize,
        salt: Pointer,
        salt_len: usize,
        params: RawParams,
    ) -> Result<Pointer, Trap>;

    /// Parses the PHC string at `hash` and compares it against `password`.
    fn verify(
        &mut self,
        password: Pointer,
        password_len: usize,
        hash: Pointer,
        hash_len: usize,
    ) -> Result<bool, Trap>;

    fn memory(&self) -> &[u8];

    fn memory_mut(&mut self) -> &mut [u8];
}
