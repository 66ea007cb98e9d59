//! Argon2 password hashing over a raw allocate/hash/verify engine.
//!
//! [`hash`] produces a self-describing [`EncodedHash`]; [`verify`] checks a
//! password against one. Both drive an [`Engine`] through a
//! [`Transaction`](marshal::Transaction), which guarantees every engine
//! allocation is released.

pub mod encoding;
pub mod engine;
mod error;
pub mod marshal;
mod params;
mod salt;

use std::sync::{Mutex, MutexGuard, OnceLock};

pub use crate::encoding::EncodedHash;
pub use crate::engine::{Engine, NativeEngine};
pub use crate::error::{Error, ParseError};
pub use crate::params::{Algorithm, Parameters, PartialParameters, Version};
pub use crate::salt::SALT_LEN;

use crate::engine::RawParams;
use crate::marshal::Transaction;

/// Serialises calls against one engine instance.
pub struct Hasher<E> {
    engine: Mutex<E>,
}

impl<E: Engine> Hasher<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine: Mutex::new(engine),
        }
    }

    /// Hashes `password` with the default parameters.
    pub fn hash(&self, password: &str) -> Result<EncodedHash, Error> {
        self.hash_with(password, PartialParameters::default())
    }

    /// Hashes `password`, overriding the defaults with whatever `params` sets.
    pub fn hash_with(
        &self,
        password: &str,
        params: impl Into<PartialParameters>,
    ) -> Result<EncodedHash, Error> {
        let params = params.into().resolve();
        let salt = salt::generate_salt()?;

        let digest = {
            let mut engine = self.lock()?;
            let mut txn = Transaction::begin(&mut *engine);

            let password = txn.write(password.as_bytes())?;
            let salt_buf = txn.write(&salt)?;
            let output = txn.hash(&password, &salt_buf, RawParams::from(&params))?;
            let digest = txn.read(&output)?;

            txn.release(password)?;
            txn.release(salt_buf)?;
            txn.release(output)?;
            digest
        };

        log::debug!(
            "hashed password with {} v={:#x} m=2^{} t={} p={}",
            params.algorithm,
            params.version as u32,
            params.memory_cost,
            params.time_cost,
            params.parallelism_cost
        );

        EncodedHash::new(&params, salt.to_vec(), digest).ok_or_else(|| {
            Error::EngineFault(format!(
                "engine accepted memory cost 2^{}, which cannot be encoded",
                params.memory_cost
            ))
        })
    }

    /// Checks `password` against an encoded hash.
    ///
    /// The engine parses `encoded`; anything it cannot parse is an
    /// [`Error::EngineFault`]. A well-formed mismatch is `Ok(false)`.
    pub fn verify(&self, password: &str, encoded: &str) -> Result<bool, Error> {
        let mut engine = self.lock()?;
        let mut txn = Transaction::begin(&mut *engine);

        let password = txn.write(password.as_bytes())?;
        let encoded = txn.write(encoded.as_bytes())?;
        let matched = txn.verify(&password, &encoded)?;

        txn.release(password)?;
        txn.release(encoded)?;
        Ok(matched)
    }

    /// Runs `f` with exclusive access to the engine.
    pub fn with_engine<R>(&self, f: impl FnOnce(&mut E) -> R) -> Result<R, Error> {
        let mut engine = self.lock()?;
        Ok(f(&mut engine))
    }

    fn lock(&self) -> Result<MutexGuard<'_, E>, Error> {
        self.engine
            .lock()
            .map_err(|_| Error::EngineFault("engine state poisoned by an earlier panic".to_string()))
    }
}

static GLOBAL: OnceLock<Hasher<NativeEngine>> = OnceLock::new();

/// The process-wide hasher, created on first use.
pub fn global() -> &'static Hasher<NativeEngine> {
    GLOBAL.get_or_init(|| {
        log::debug!("initialising process-wide argon2 engine");
        Hasher::new(NativeEngine::new())
    })
}

/// Hashes `password` with the default parameters on the process-wide engine.
pub fn hash(password: &str) -> Result<EncodedHash, Error> {
    global().hash(password)
}

/// Hashes `password` with `params` on the process-wide engine.
pub fn hash_with(password: &str, params: impl Into<PartialParameters>) -> Result<EncodedHash, Error> {
    global().hash_with(password, params)
}

/// Verifies `password` against `encoded` on the process-wide engine.
pub fn verify(password: &str, encoded: &str) -> Result<bool, Error> {
    global().verify(password, encoded)
}
