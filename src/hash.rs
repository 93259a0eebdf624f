//! Hashing into the group and into the scalar field.

use curve25519_dalek::{
    ristretto::{CompressedRistretto, RistrettoPoint},
    traits::IsIdentity,
    Scalar,
};
use sha2::{Digest, Sha256};

/// Upper bound on the number of candidates tried by [hash_to_point].
///
/// Roughly one candidate in eight decodes to a valid ristretto255 point, so running out of
/// attempts means the hash function itself is broken.
pub const MAX_HASH_TO_CURVE_ATTEMPTS: u32 = 256;

const HASH_TO_CURVE_DOMAIN: &[u8] = b"coinjoin_credentials::hash::hash_to_point";

#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum HashToCurveError {
    #[error("hash-to-curve found no valid point after {0} attempts")]
    Exhausted(u32),
}

/// Hash an arbitrary label to a point with no known discrete log relative to any other point.
///
/// Uses try-and-increment: `SHA-256(domain || label || nonce)` is interpreted as a compressed
/// ristretto255 encoding, and the nonce is incremented until the encoding decompresses to a
/// point other than the identity. The result is a pure function of `label`, so every party
/// derives the same point without a trusted setup.
pub fn hash_to_point(label: &[u8]) -> Result<RistrettoPoint, HashToCurveError> {
    for nonce in 0..MAX_HASH_TO_CURVE_ATTEMPTS {
        let digest = Sha256::new()
            .chain_update(HASH_TO_CURVE_DOMAIN)
            .chain_update(label)
            .chain_update(u64::from(nonce).to_le_bytes())
            .finalize();
        let candidate = CompressedRistretto(digest.into());
        match candidate.decompress() {
            Some(point) if !point.is_identity() => return Ok(point),
            _ => continue,
        }
    }
    Err(HashToCurveError::Exhausted(MAX_HASH_TO_CURVE_ATTEMPTS))
}

/// Fiat-Shamir challenge over a statement label and a sequence of group elements.
///
/// The challenge is SHA-256 over the length-prefixed label followed by the concatenated canonical
/// encodings, reduced modulo the group order. Order of the elements is significant.
pub fn challenge<'a>(
    label: &[u8],
    elems: impl IntoIterator<Item = &'a RistrettoPoint>,
) -> Scalar {
    let mut hasher = Sha256::new()
        .chain_update((label.len() as u64).to_le_bytes())
        .chain_update(label);
    for elem in elems {
        hasher.update(elem.compress().as_bytes());
    }
    Scalar::from_bytes_mod_order(hasher.finalize().into())
}

#[cfg(test)]
mod test {
    use curve25519_dalek::{constants::RISTRETTO_BASEPOINT_POINT, RistrettoPoint};

    use super::{challenge, hash_to_point};

    #[test]
    fn hash_to_point_is_deterministic() {
        assert_eq!(hash_to_point(b"Gg").unwrap(), hash_to_point(b"Gg").unwrap());
        assert_ne!(hash_to_point(b"Gg").unwrap(), hash_to_point(b"Gh").unwrap());
    }

    #[test]
    fn challenge_depends_on_order() {
        let a = hash_to_point(b"a").unwrap();
        let b = RISTRETTO_BASEPOINT_POINT;
        assert_eq!(challenge(b"test", [&a, &b]), challenge(b"test", [&a, &b]));
        assert_ne!(challenge(b"test", [&a, &b]), challenge(b"test", [&b, &a]));
    }

    #[test]
    fn challenge_depends_on_label() {
        let a = hash_to_point(b"a").unwrap();
        assert_ne!(challenge(b"one", [&a]), challenge(b"two", [&a]));
        // The label length is hashed, so moving bytes between label and points changes it.
        let no_points: [&RistrettoPoint; 0] = [];
        assert_ne!(challenge(b"", [&a]), challenge(a.compress().as_bytes(), no_points));
    }
}
