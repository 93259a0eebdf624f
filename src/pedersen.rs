//! Pedersen commitments to amounts, and the attributes built from them.
//!
//! A commitment is `value * Gg + blinding * Gh`. The party that created a commitment holds an
//! [OpenCommitment], which remembers its opening. Every other party only ever sees the
//! [PublicCommitment]. Both are additively homomorphic: adding two open commitments keeps the
//! opening, adding anything to a public commitment only adds the points.

use curve25519_dalek::{traits::Identity, RistrettoPoint, Scalar};
use rand::{CryptoRng, RngCore};
use subtle::ConstantTimeEq;

use crate::{generators::Generators, util::random_scalar};

/// A commitment as seen by anyone who does not know its opening.
///
/// Equality is defined on the group element only, in constant time.
#[derive(Clone, Copy, Debug)]
pub struct PublicCommitment {
    pub elem: RistrettoPoint,
}

/// A commitment together with its opening. Only the committing party holds one of these.
#[derive(Clone, Debug)]
pub struct OpenCommitment {
    value: Scalar,
    blinding: Scalar,
    elem: RistrettoPoint,
}

/// Compute `value * Gg + blinding * Gh`.
pub fn commit(gens: &Generators, value: Scalar, blinding: Scalar) -> RistrettoPoint {
    value * gens.gg + blinding * gens.gh
}

impl PublicCommitment {
    pub fn identity() -> Self {
        Self {
            elem: RistrettoPoint::identity(),
        }
    }

    /// Check that this commitment opens to `value` with blinding factor `blinding`.
    pub fn open(&self, gens: &Generators, value: Scalar, blinding: Scalar) -> bool {
        self.elem.ct_eq(&commit(gens, value, blinding)).into()
    }

    pub fn add(&self, other: &PublicCommitment) -> PublicCommitment {
        PublicCommitment {
            elem: self.elem + other.elem,
        }
    }

    pub fn negate(&self) -> PublicCommitment {
        PublicCommitment { elem: -self.elem }
    }

    pub fn sub(&self, other: &PublicCommitment) -> PublicCommitment {
        self.add(&other.negate())
    }
}

impl PartialEq for PublicCommitment {
    fn eq(&self, other: &Self) -> bool {
        self.elem.ct_eq(&other.elem).into()
    }
}

impl Eq for PublicCommitment {}

impl From<RistrettoPoint> for PublicCommitment {
    fn from(elem: RistrettoPoint) -> Self {
        Self { elem }
    }
}

impl OpenCommitment {
    pub fn new(gens: &Generators, value: Scalar, blinding: Scalar) -> Self {
        Self {
            value,
            blinding,
            elem: commit(gens, value, blinding),
        }
    }

    /// Commit to `value` with a fresh random blinding factor.
    pub fn random<R>(gens: &Generators, value: Scalar, rng: &mut R) -> Self
    where
        R: RngCore + CryptoRng + ?Sized,
    {
        Self::new(gens, value, random_scalar(rng))
    }

    pub fn value(&self) -> Scalar {
        self.value
    }

    pub fn blinding(&self) -> Scalar {
        self.blinding
    }

    /// The commitment as seen by other parties.
    pub fn public(&self) -> PublicCommitment {
        PublicCommitment { elem: self.elem }
    }

    /// Drop the opening, keeping only the group element.
    pub fn forget(self) -> PublicCommitment {
        self.public()
    }

    pub fn add(&self, other: &OpenCommitment) -> OpenCommitment {
        OpenCommitment {
            value: self.value + other.value,
            blinding: self.blinding + other.blinding,
            elem: self.elem + other.elem,
        }
    }

    pub fn negate(&self) -> OpenCommitment {
        OpenCommitment {
            value: -self.value,
            blinding: -self.blinding,
            elem: -self.elem,
        }
    }

    pub fn sub(&self, other: &OpenCommitment) -> OpenCommitment {
        self.add(&other.negate())
    }
}

impl PartialEq for OpenCommitment {
    fn eq(&self, other: &Self) -> bool {
        self.public() == other.public()
    }
}

impl Eq for OpenCommitment {}

/// Serial number of an attribute, `S = r * Gs` where `r` is the attribute's blinding factor.
///
/// It is revealed when the credential over the attribute is presented, and recorded by the
/// coordinator to reject a second presentation of the same credential.
#[derive(Clone, Copy, Debug)]
pub struct SerialNumber(pub RistrettoPoint);

impl SerialNumber {
    /// Canonical encoding, used as the key in nullifier sets.
    pub fn to_bytes(&self) -> [u8; 32] {
        self.0.compress().to_bytes()
    }
}

impl PartialEq for SerialNumber {
    fn eq(&self, other: &Self) -> bool {
        self.0.ct_eq(&other.0).into()
    }
}

impl Eq for SerialNumber {}

/// An amount committed to by a client, together with everything needed to later present a
/// credential over it.
#[derive(Clone, Debug)]
pub struct Attribute {
    commitment: OpenCommitment,
}

impl Attribute {
    pub fn new<R>(gens: &Generators, amount: u64, rng: &mut R) -> Self
    where
        R: RngCore + CryptoRng + ?Sized,
    {
        Self {
            commitment: OpenCommitment::random(gens, Scalar::from(amount), rng),
        }
    }

    pub fn from_opening(gens: &Generators, amount: Scalar, blinding: Scalar) -> Self {
        Self {
            commitment: OpenCommitment::new(gens, amount, blinding),
        }
    }

    /// `Ma`, the commitment sent to the coordinator.
    pub fn commitment(&self) -> PublicCommitment {
        self.commitment.public()
    }

    pub fn amount(&self) -> Scalar {
        self.commitment.value()
    }

    pub fn blinding(&self) -> Scalar {
        self.commitment.blinding()
    }

    pub fn serial_number(&self, gens: &Generators) -> SerialNumber {
        SerialNumber(self.blinding() * gens.gs)
    }
}
