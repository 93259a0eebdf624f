//! Generalized Schnorr proofs of knowledge over linear relations, made non-interactive with the
//! Fiat-Shamir heuristic.
//!
//! A statement is a set of constraints `P_j = \Sigma_i x_i * G_ji` over secret scalars `x_i` and
//! public points. Statements are written once, as functions generic over [ConstraintSystem], and
//! run against a [Prover] to create a [Proof] or against a [Verifier] to check one. Both sides must
//! be constructed with the same label and allocate points in the same order, since the
//! Fiat-Shamir challenge is a hash of the label, the nonce commitments and every allocated point.

use blake2::{Blake2b512, Digest};
use curve25519_dalek::{
    traits::{IsIdentity, VartimeMultiscalarMul},
    RistrettoPoint, Scalar,
};
use rand::{CryptoRng, RngCore};

use crate::{hash::challenge, util::random_scalar};

/// Handle for a secret scalar allocated in a constraint system.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScalarVar(usize);

/// Handle for a public point allocated in a constraint system.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PointVar(usize);

/// Non-interactive proof: one nonce commitment per constraint and one response per secret.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Proof {
    pub commitments: Vec<RistrettoPoint>,
    pub responses: Vec<Scalar>,
}

#[non_exhaustive]
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum ProofError {
    #[error("proof verification failed")]
    VerificationFailure,
    #[error("proof does not match the shape of the statement")]
    LengthMismatch,
}

type LinearCombination = Vec<(ScalarVar, PointVar)>;

/// Constraint system interface shared by [Prover] and [Verifier].
pub trait SchnorrCS {
    /// Add a constraint of the form `lhs = linear_combination`.
    fn constrain(&mut self, lhs: PointVar, linear_combination: LinearCombination);
}

pub trait AllocScalarVar<T>: SchnorrCS {
    fn alloc_scalar(&mut self, value: T) -> ScalarVar;
}

pub trait AllocPointVar<T>: SchnorrCS {
    fn alloc_point(&mut self, value: T) -> PointVar;
}

/// A constraint system accepting allocated variables and labeled public points. Statements are
/// written against this trait so that the same code drives both [Prover] and [Verifier].
pub trait ConstraintSystem:
    AllocScalarVar<ScalarVar>
    + AllocPointVar<PointVar>
    + AllocPointVar<(&'static str, RistrettoPoint)>
{
    /// Allocate a public point.
    fn point(&mut self, label: &'static str, point: RistrettoPoint) -> PointVar {
        AllocPointVar::<(&'static str, RistrettoPoint)>::alloc_point(self, (label, point))
    }
}

impl<CS> ConstraintSystem for CS where
    CS: AllocScalarVar<ScalarVar>
        + AllocPointVar<PointVar>
        + AllocPointVar<(&'static str, RistrettoPoint)>
{
}

/// Creates a [Proof] for the constraints added to it.
pub struct Prover {
    label: &'static [u8],
    scalars: Vec<Scalar>,
    scalar_labels: Vec<&'static str>,
    points: Vec<RistrettoPoint>,
    constraints: Vec<(PointVar, LinearCombination)>,
}

impl Prover {
    /// The label separates both the nonces and the challenge between statements. The verifier
    /// must use the same label.
    pub fn new(label: &'static [u8]) -> Self {
        Self {
            label,
            scalars: Vec::new(),
            scalar_labels: Vec::new(),
            points: Vec::new(),
            constraints: Vec::new(),
        }
    }

    /// Nonces are derived from the statement label, every witness and fresh randomness, so that a
    /// weak RNG alone cannot cause the same nonce to be used with two different witnesses.
    fn nonces<R>(&self, rng: &mut R) -> Vec<Scalar>
    where
        R: RngCore + CryptoRng + ?Sized,
    {
        let mut entropy = [0u8; 32];
        rng.fill_bytes(&mut entropy);

        let mut hasher = Blake2b512::new();
        hasher.update(self.label);
        for (label, x) in self.scalar_labels.iter().zip(&self.scalars) {
            hasher.update(label.as_bytes());
            hasher.update(x.as_bytes());
        }
        hasher.update(entropy);

        (0..self.scalars.len() as u64)
            .map(|i| Scalar::from_hash(hasher.clone().chain_update(i.to_le_bytes())))
            .collect()
    }

    pub fn prove<R>(self, rng: &mut R) -> Proof
    where
        R: RngCore + CryptoRng + ?Sized,
    {
        let nonces = self.nonces(rng);

        let commitments: Vec<RistrettoPoint> = self
            .constraints
            .iter()
            .map(|(_, lc)| {
                lc.iter()
                    .map(|(x, g)| nonces[x.0] * self.points[g.0])
                    .sum::<RistrettoPoint>()
            })
            .collect();

        let e = challenge(self.label, commitments.iter().chain(&self.points));
        let responses = nonces
            .iter()
            .zip(&self.scalars)
            .map(|(n, x)| n + e * x)
            .collect();

        Proof {
            commitments,
            responses,
        }
    }
}

impl SchnorrCS for Prover {
    fn constrain(&mut self, lhs: PointVar, linear_combination: LinearCombination) {
        self.constraints.push((lhs, linear_combination));
    }
}

impl AllocScalarVar<(&'static str, Scalar)> for Prover {
    fn alloc_scalar(&mut self, (label, value): (&'static str, Scalar)) -> ScalarVar {
        self.scalars.push(value);
        self.scalar_labels.push(label);
        ScalarVar(self.scalars.len() - 1)
    }
}

impl AllocScalarVar<ScalarVar> for Prover {
    fn alloc_scalar(&mut self, value: ScalarVar) -> ScalarVar {
        value
    }
}

impl AllocPointVar<(&'static str, RistrettoPoint)> for Prover {
    fn alloc_point(&mut self, (_, point): (&'static str, RistrettoPoint)) -> PointVar {
        self.points.push(point);
        PointVar(self.points.len() - 1)
    }
}

impl AllocPointVar<PointVar> for Prover {
    fn alloc_point(&mut self, value: PointVar) -> PointVar {
        value
    }
}

/// Checks a [Proof] against the constraints added to it.
pub struct Verifier {
    label: &'static [u8],
    num_scalars: usize,
    points: Vec<RistrettoPoint>,
    constraints: Vec<(PointVar, LinearCombination)>,
}

impl Verifier {
    pub fn new(label: &'static [u8]) -> Self {
        Self {
            label,
            num_scalars: 0,
            points: Vec::new(),
            constraints: Vec::new(),
        }
    }

    /// Verify with batching weights drawn from the thread-local RNG.
    pub fn verify(self, proof: &Proof) -> Result<(), ProofError> {
        self.verify_with_rng(proof, &mut rand::thread_rng())
    }

    /// Recompute the challenge and check all constraints at once.
    ///
    /// Each constraint `P_j = \Sigma_i x_i * G_ji` is checked as
    /// `\Sigma_i s_i * G_ji - R_j - e * P_j = 0`, and the constraints are combined with weights
    /// drawn from `rng` into a single multiscalar multiplication.
    pub fn verify_with_rng<R>(self, proof: &Proof, rng: &mut R) -> Result<(), ProofError>
    where
        R: RngCore + CryptoRng + ?Sized,
    {
        if proof.responses.len() != self.num_scalars
            || proof.commitments.len() != self.constraints.len()
        {
            return Err(ProofError::LengthMismatch);
        }

        let e = challenge(self.label, proof.commitments.iter().chain(&self.points));

        let mut scalars = Vec::new();
        let mut points = Vec::new();
        for ((lhs, lc), commitment) in self.constraints.iter().zip(&proof.commitments) {
            let weight = random_scalar(rng);
            for (x, g) in lc {
                scalars.push(weight * proof.responses[x.0]);
                points.push(self.points[g.0]);
            }
            scalars.push(-weight);
            points.push(*commitment);
            scalars.push(-(weight * e));
            points.push(self.points[lhs.0]);
        }

        match RistrettoPoint::vartime_multiscalar_mul(scalars, points).is_identity() {
            true => Ok(()),
            false => Err(ProofError::VerificationFailure),
        }
    }
}

impl SchnorrCS for Verifier {
    fn constrain(&mut self, lhs: PointVar, linear_combination: LinearCombination) {
        self.constraints.push((lhs, linear_combination));
    }
}

impl AllocScalarVar<&'static str> for Verifier {
    fn alloc_scalar(&mut self, _label: &'static str) -> ScalarVar {
        self.num_scalars += 1;
        ScalarVar(self.num_scalars - 1)
    }
}

impl AllocScalarVar<ScalarVar> for Verifier {
    fn alloc_scalar(&mut self, value: ScalarVar) -> ScalarVar {
        value
    }
}

impl AllocPointVar<(&'static str, RistrettoPoint)> for Verifier {
    fn alloc_point(&mut self, (_, point): (&'static str, RistrettoPoint)) -> PointVar {
        self.points.push(point);
        PointVar(self.points.len() - 1)
    }
}

impl AllocPointVar<PointVar> for Verifier {
    fn alloc_point(&mut self, value: PointVar) -> PointVar {
        value
    }
}

/// Builder for a single linear constraint.
pub struct Constraint {
    pub linear_combination: LinearCombination,
}

impl Default for Constraint {
    fn default() -> Self {
        Self::new()
    }
}

impl Constraint {
    pub fn new() -> Self {
        Self {
            linear_combination: Vec::new(),
        }
    }

    /// Add the term `x * g`.
    pub fn add<CS, X, G>(&mut self, cs: &mut CS, x: X, g: G)
    where
        CS: AllocScalarVar<X> + AllocPointVar<G>,
    {
        let x_var = cs.alloc_scalar(x);
        let g_var = cs.alloc_point(g);
        self.linear_combination.push((x_var, g_var));
    }

    /// Finish the constraint, requiring the sum of the terms to equal `g`.
    pub fn eq<CS, G>(self, cs: &mut CS, g: G)
    where
        CS: AllocPointVar<G>,
    {
        let g_var = cs.alloc_point(g);
        cs.constrain(g_var, self.linear_combination);
    }
}
