//! Keyed-verification algebraic MAC over committed amounts.
//!
//! The coordinator holds a [ServerSecretKey] `(w, w', x0, x1, ya)` and publishes
//! `Cw = w * Gw + w' * Gwp` and `I = GV - x0 * Gx0 - x1 * Gx1 - ya * Ga`. A MAC over an amount
//! commitment `Ma` is `(t, U, V)` with `U = nums(t)` and
//! `V = w * Gw + (x0 + x1 * t) * U + ya * Ma`.
//!
//! A client presents a MAC by randomizing it with a fresh scalar `z` into
//! [RandomizedCommitments]. From those the coordinator computes a check value `Z` which equals
//! `z * I` exactly when the randomized values came from a MAC it issued.

use core::fmt;

use curve25519_dalek::{RistrettoPoint, Scalar};
use rand::{CryptoRng, RngCore};
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, ZeroizeOnDrop};

use crate::{
    generators::{CryptoContext, Generators, NumsCache},
    hash::HashToCurveError,
    pedersen::PublicCommitment,
    util::random_scalar,
};

/// The coordinator's long-term secret key. Never leaves the coordinator.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct ServerSecretKey {
    pub(crate) w: Scalar,
    pub(crate) w_prime: Scalar,
    pub(crate) x0: Scalar,
    pub(crate) x1: Scalar,
    pub(crate) ya: Scalar,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ServerPublicKey {
    pub cw: RistrettoPoint,
    pub i: RistrettoPoint,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Mac {
    pub t: Scalar,
    pub u: RistrettoPoint,
    pub v: RistrettoPoint,
}

/// A MAC and the commitment it authenticates, re-blinded with a single scalar `z`.
///
/// Must be computed fresh for every presentation; sending the same randomization twice links
/// the two presentations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RandomizedCommitments {
    /// `z * Ga + Ma`
    pub ca: RistrettoPoint,
    /// `z * Gx0 + U`
    pub cx0: RistrettoPoint,
    /// `z * Gx1 + t * U`
    pub cx1: RistrettoPoint,
    /// `z * GV + V`
    pub cv: RistrettoPoint,
}

impl fmt::Debug for ServerSecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ServerSecretKey").finish_non_exhaustive()
    }
}

impl ServerSecretKey {
    pub fn generate<R>(rng: &mut R) -> Self
    where
        R: RngCore + CryptoRng + ?Sized,
    {
        Self {
            w: random_scalar(rng),
            w_prime: random_scalar(rng),
            x0: random_scalar(rng),
            x1: random_scalar(rng),
            ya: random_scalar(rng),
        }
    }

    pub fn public_key(&self, gens: &Generators) -> ServerPublicKey {
        ServerPublicKey {
            cw: self.w * gens.gw + self.w_prime * gens.gwp,
            i: gens.gv - self.x0 * gens.gx0 - self.x1 * gens.gx1 - self.ya * gens.ga,
        }
    }

    fn mac_value(
        &self,
        gens: &Generators,
        ma: &PublicCommitment,
        t: Scalar,
        u: RistrettoPoint,
    ) -> RistrettoPoint {
        self.w * gens.gw + (self.x0 + self.x1 * t) * u + self.ya * ma.elem
    }

    /// Issue a MAC over the amount commitment `ma`.
    ///
    /// `U` is derived from the random tag `t`, so the coordinator cannot choose it to tag the
    /// credential.
    pub fn compute_mac<R>(
        &self,
        ctx: &CryptoContext,
        ma: &PublicCommitment,
        rng: &mut R,
    ) -> Result<Mac, HashToCurveError>
    where
        R: RngCore + CryptoRng + ?Sized,
    {
        let t = random_scalar(rng);
        let u = NumsCache::derive(&t)?;
        Ok(Mac {
            t,
            u,
            v: self.mac_value(ctx.generators(), ma, t, u),
        })
    }

    /// Recompute `V` from the tag and `U` carried by the MAC, and compare.
    pub fn verify_mac(&self, gens: &Generators, ma: &PublicCommitment, mac: &Mac) -> bool {
        mac.v
            .ct_eq(&self.mac_value(gens, ma, mac.t, mac.u))
            .into()
    }

    /// Check value `Z = CV - (w * Gw + x0 * Cx0 + x1 * Cx1 + ya * Ca)` of a presentation.
    ///
    /// For an honestly randomized MAC issued under this key, `Z = z * I`. The value on its own
    /// proves nothing; it is the public input to the proof of MAC knowledge.
    pub fn check_value(
        &self,
        gens: &Generators,
        commitments: &RandomizedCommitments,
    ) -> RistrettoPoint {
        commitments.cv
            - (self.w * gens.gw
                + self.x0 * commitments.cx0
                + self.x1 * commitments.cx1
                + self.ya * commitments.ca)
    }
}

impl RandomizedCommitments {
    pub fn new(gens: &Generators, z: Scalar, ma: &PublicCommitment, mac: &Mac) -> Self {
        Self {
            ca: z * gens.ga + ma.elem,
            cx0: z * gens.gx0 + mac.u,
            cx1: z * gens.gx1 + mac.t * mac.u,
            cv: z * gens.gv + mac.v,
        }
    }
}
