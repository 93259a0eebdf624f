//! Fixed public generators and the shared cryptographic context.

use std::{
    num::NonZeroUsize,
    sync::{Mutex, MutexGuard, PoisonError},
};

use curve25519_dalek::{constants::RISTRETTO_BASEPOINT_POINT, RistrettoPoint, Scalar};
use lru::LruCache;

use crate::hash::{hash_to_point, HashToCurveError};

/// The independent generators used by commitments, the MAC and every proof statement.
///
/// All of them except `g` are derived by [hash_to_point] from their name, so no party knows a
/// discrete log relation between any two of them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Generators {
    /// Generator for committed amounts.
    pub gg: RistrettoPoint,
    /// Generator for commitment blinding factors.
    pub gh: RistrettoPoint,
    /// Generator for the randomization of amount commitments, and for the attribute key `ya`.
    pub ga: RistrettoPoint,
    /// Generator for serial numbers.
    pub gs: RistrettoPoint,
    pub gw: RistrettoPoint,
    pub gwp: RistrettoPoint,
    pub gx0: RistrettoPoint,
    pub gx1: RistrettoPoint,
    /// Generator randomizing the MAC value `V`.
    pub gv: RistrettoPoint,
    /// The ristretto255 basepoint.
    pub g: RistrettoPoint,
}

impl Generators {
    pub fn derive() -> Result<Self, HashToCurveError> {
        Ok(Self {
            gg: hash_to_point(b"Gg")?,
            gh: hash_to_point(b"Gh")?,
            ga: hash_to_point(b"Ga")?,
            gs: hash_to_point(b"Gs")?,
            gw: hash_to_point(b"Gw")?,
            gwp: hash_to_point(b"Gwp")?,
            gx0: hash_to_point(b"Gx0")?,
            gx1: hash_to_point(b"Gx1")?,
            gv: hash_to_point(b"GV")?,
            g: RISTRETTO_BASEPOINT_POINT,
        })
    }
}

/// Default number of points kept by a [NumsCache].
pub const DEFAULT_NUMS_CACHE_CAPACITY: NonZeroUsize = match NonZeroUsize::new(4096) {
    Some(capacity) => capacity,
    None => unreachable!(),
};

/// Memoized hash-to-curve keyed by a scalar, holding at most a fixed number of points.
///
/// Used to derive the MAC point `U` from the MAC tag `t`. The least recently used point is
/// evicted once the cache is full. Hashing happens outside the lock.
#[derive(Debug)]
pub struct NumsCache {
    points: Mutex<LruCache<[u8; 32], RistrettoPoint>>,
}

impl Default for NumsCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_NUMS_CACHE_CAPACITY)
    }
}

impl NumsCache {
    const LABEL: &'static [u8] = b"coinjoin_credentials::generators::nums::";

    pub fn with_capacity(capacity: NonZeroUsize) -> Self {
        Self {
            points: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Hash `key` to a point without consulting or filling the cache.
    pub fn derive(key: &Scalar) -> Result<RistrettoPoint, HashToCurveError> {
        let bytes = key.to_bytes();
        let mut label = Vec::with_capacity(Self::LABEL.len() + bytes.len());
        label.extend_from_slice(Self::LABEL);
        label.extend_from_slice(&bytes);
        hash_to_point(&label)
    }

    pub fn get(&self, key: &Scalar) -> Result<RistrettoPoint, HashToCurveError> {
        let bytes = key.to_bytes();
        if let Some(point) = self.lock().get(&bytes) {
            return Ok(*point);
        }

        let point = Self::derive(key)?;
        self.lock().put(bytes, point);
        Ok(point)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> NonZeroUsize {
        self.lock().cap()
    }

    fn lock(&self) -> MutexGuard<'_, LruCache<[u8; 32], RistrettoPoint>> {
        self.points.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Process-wide public state: the generators and the nums cache.
///
/// Built once at startup and shared (usually behind an `Arc`) with every operation that needs
/// it. It holds no secrets.
#[derive(Debug)]
pub struct CryptoContext {
    generators: Generators,
    nums: NumsCache,
}

impl CryptoContext {
    /// Derive the generators.
    ///
    /// Failure here indicates a broken hash function and should abort startup.
    pub fn new() -> Result<Self, HashToCurveError> {
        Self::with_nums_capacity(DEFAULT_NUMS_CACHE_CAPACITY)
    }

    pub fn with_nums_capacity(capacity: NonZeroUsize) -> Result<Self, HashToCurveError> {
        let generators = Generators::derive()?;
        tracing::debug!(nums_capacity = capacity.get(), "derived credential generators");
        Ok(Self {
            generators,
            nums: NumsCache::with_capacity(capacity),
        })
    }

    pub fn generators(&self) -> &Generators {
        &self.generators
    }

    /// Nothing-up-my-sleeve point for the given scalar, memoized.
    ///
    /// Meant for verifiers, which may see the same tag more than once. Issuers draw a fresh tag
    /// for every MAC and use [NumsCache::derive] instead.
    pub fn nums(&self, key: &Scalar) -> Result<RistrettoPoint, HashToCurveError> {
        self.nums.get(key)
    }

    pub fn nums_cache(&self) -> &NumsCache {
        &self.nums
    }
}
