//! Moving byte buffers across the engine boundary.
//!
//! Every region obtained during a [`Transaction`] is recorded. Releasing a
//! region consumes its handle; whatever is still live when the transaction is
//! dropped, on an error path or during unwinding, is released then.

use crate::engine::{Engine, Pointer, RawParams, Trap};
use crate::error::Error;

/// A live allocation in engine memory, owned by a [`Transaction`].
#[derive(Debug, PartialEq, Eq)]
pub struct Region {
    ptr: Pointer,
    len: usize,
}

impl Region {
    pub fn pointer(&self) -> Pointer {
        self.ptr
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// One allocate → compute → release sequence against an engine.
pub struct Transaction<'e, E: Engine + ?Sized> {
    engine: &'e mut E,
    live: Vec<(Pointer, usize)>,
}

impl<'e, E: Engine + ?Sized> Transaction<'e, E> {
    pub fn begin(engine: &'e mut E) -> Self {
        Self {
            engine,
            live: Vec::new(),
        }
    }

    /// Number of regions not yet released.
    pub fn live(&self) -> usize {
        self.live.len()
    }

    /// Allocates `bytes.len()` in the engine and copies `bytes` in.
    pub fn write(&mut self, bytes: &[u8]) -> Result<Region, Error> {
        let ptr = self.engine.allocate(bytes.len());
        if ptr.is_null() {
            return Err(Error::AllocationFailure { size: bytes.len() });
        }

        let region = self.claim(ptr, bytes.len());
        let start = ptr.offset();
        let end = start
            .checked_add(bytes.len())
            .ok_or_else(|| out_of_bounds(&region))?;
        self.engine
            .memory_mut()
            .get_mut(start..end)
            .ok_or_else(|| out_of_bounds(&region))?
            .copy_from_slice(bytes);

        log::trace!("wrote {} bytes at {ptr}", bytes.len());
        Ok(region)
    }

    /// Copies a region out of engine memory.
    pub fn read(&self, region: &Region) -> Result<Vec<u8>, Error> {
        let start = region.ptr.offset();
        start
            .checked_add(region.len)
            .and_then(|end| self.engine.memory().get(start..end))
            .map(<[u8]>::to_vec)
            .ok_or_else(|| out_of_bounds(region))
    }

    pub fn release(&mut self, region: Region) -> Result<(), Error> {
        let Some(index) = self.position(region.ptr) else {
            return Err(Error::EngineFault(format!(
                "region {} is not owned by this transaction",
                region.ptr
            )));
        };
        self.live.swap_remove(index);

        self.engine
            .deallocate(region.ptr, region.len)
            .map_err(|trap| self.fault(trap))
    }

    /// Runs a raw hash and claims the returned digest region.
    pub fn hash(
        &mut self,
        password: &Region,
        salt: &Region,
        params: RawParams,
    ) -> Result<Region, Error> {
        match self
            .engine
            .hash(password.ptr, password.len, salt.ptr, salt.len, params)
        {
            Ok(ptr) if ptr.is_null() => Err(Error::AllocationFailure {
                size: params.output_length,
            }),
            Ok(ptr) => Ok(self.claim(ptr, params.output_length)),
            Err(trap) => Err(self.fault(trap)),
        }
    }

    pub fn verify(&mut self, password: &Region, encoded: &Region) -> Result<bool, Error> {
        self.engine
            .verify(password.ptr, password.len, encoded.ptr, encoded.len)
            .map_err(|trap| self.fault(trap))
    }

    /// Takes ownership of an engine-returned allocation.
    fn claim(&mut self, ptr: Pointer, len: usize) -> Region {
        self.live.push((ptr, len));
        Region { ptr, len }
    }

    fn position(&self, ptr: Pointer) -> Option<usize> {
        self.live.iter().position(|&(p, _)| p == ptr)
    }

    /// Decodes a trap message and hands its region back to the engine.
    fn fault(&mut self, trap: Trap) -> Error {
        if trap.message.is_null() {
            return Error::EngineFault("engine fault (no message)".to_string());
        }

        let region = self.claim(trap.message, trap.len);
        let message = match self.read(&region) {
            Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
            Err(e) => e.to_string(),
        };
        self.discard(region.ptr);

        Error::EngineFault(message)
    }

    /// Releases a live region without decoding any further trap.
    ///
    /// A trap raised here still has its message region handed back; a second
    /// refusal is only logged.
    fn discard(&mut self, ptr: Pointer) {
        let Some(index) = self.position(ptr) else {
            return;
        };
        let (ptr, len) = self.live.swap_remove(index);
        let Err(trap) = self.engine.deallocate(ptr, len) else {
            return;
        };

        log::warn!("engine refused to release {len} bytes at {ptr}");
        if !trap.message.is_null() && self.engine.deallocate(trap.message, trap.len).is_err() {
            log::warn!("engine refused to release its trap message at {}", trap.message);
        }
    }
}

impl<E: Engine + ?Sized> Drop for Transaction<'_, E> {
    fn drop(&mut self) {
        while let Some(&(ptr, _)) = self.live.last() {
            log::debug!("releasing region at {ptr} left over by transaction");
            self.discard(ptr);
        }
    }
}

fn out_of_bounds(region: &Region) -> Error {
    Error::EngineFault(format!(
        "region {}+{} is outside engine memory",
        region.ptr, region.len
    ))
}
