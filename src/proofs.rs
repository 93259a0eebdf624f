//! The proof statements used by the registration protocol.
//!
//! Each statement is a fixed choice of secrets, generators and public points for the generic
//! engine in [crate::zkp]. Prover and verifier share one statement function, so they allocate
//! points (and therefore hash them into the challenge) in the same order.

use curve25519_dalek::{RistrettoPoint, Scalar};
use rand::{CryptoRng, RngCore};

use crate::{
    cmz::{Mac, RandomizedCommitments, ServerPublicKey, ServerSecretKey},
    generators::Generators,
    pedersen::{Attribute, PublicCommitment, SerialNumber},
    zkp::{
        AllocScalarVar, Constraint, ConstraintSystem, Proof, ProofError, Prover, ScalarVar,
        Verifier,
    },
};

// A small macro to construct the labels for variables used in the statements.
macro_rules! label {
    ($s:literal) => {
        concat!("coinjoin_credentials::proofs::", $s)
    };
}

// ProofOfExponent: P = x * G

fn exponent_statement<CS: ConstraintSystem>(
    cs: &mut CS,
    x: ScalarVar,
    base: RistrettoPoint,
    public: RistrettoPoint,
) {
    let mut constraint = Constraint::new();
    constraint.add(cs, x, (label!("exponent::base"), base));
    constraint.eq(cs, (label!("exponent::public"), public));
}

/// Prove knowledge of `x` such that `x * base` is the public point.
///
/// With `base = Gh` this proves that a commitment is to the amount zero: such a commitment is a
/// pure multiple of the blinding generator.
pub fn prove_exponent<R>(x: Scalar, base: RistrettoPoint, rng: &mut R) -> Proof
where
    R: RngCore + CryptoRng + ?Sized,
{
    let mut prover = Prover::new(label!("exponent").as_bytes());
    let x_var = prover.alloc_scalar((label!("exponent::x"), x));
    exponent_statement(&mut prover, x_var, base, x * base);
    prover.prove(rng)
}

pub fn verify_exponent(
    public: RistrettoPoint,
    base: RistrettoPoint,
    proof: &Proof,
) -> Result<(), ProofError> {
    let mut verifier = Verifier::new(label!("exponent").as_bytes());
    let x_var = verifier.alloc_scalar(label!("exponent::x"));
    exponent_statement(&mut verifier, x_var, base, public);
    verifier.verify(proof)
}

// ProofOfParams:
//   Cw     = w * Gw + w' * Gwp
//   GV - I = x0 * Gx0 + x1 * Gx1 + ya * Ga
//   V      = w * Gw + x0 * U + x1 * (t * U) + ya * Ma

fn params_statement<CS: ConstraintSystem>(
    cs: &mut CS,
    [w, w_prime, x0, x1, ya]: [ScalarVar; 5],
    gens: &Generators,
    pk: &ServerPublicKey,
    ma: &PublicCommitment,
    mac: &Mac,
) {
    let gw = cs.point(label!("params::gw"), gens.gw);
    let gx0 = cs.point(label!("params::gx0"), gens.gx0);
    let gx1 = cs.point(label!("params::gx1"), gens.gx1);
    let ga = cs.point(label!("params::ga"), gens.ga);

    let mut constraint_cw = Constraint::new();
    constraint_cw.add(cs, w, gw);
    constraint_cw.add(cs, w_prime, (label!("params::gwp"), gens.gwp));
    constraint_cw.eq(cs, (label!("params::cw"), pk.cw));

    let mut constraint_i = Constraint::new();
    constraint_i.add(cs, x0, gx0);
    constraint_i.add(cs, x1, gx1);
    constraint_i.add(cs, ya, ga);
    constraint_i.eq(cs, (label!("params::gv_minus_i"), gens.gv - pk.i));

    let mut constraint_v = Constraint::new();
    constraint_v.add(cs, w, gw);
    constraint_v.add(cs, x0, (label!("params::u"), mac.u));
    constraint_v.add(cs, x1, (label!("params::tu"), mac.t * mac.u));
    constraint_v.add(cs, ya, (label!("params::ma"), ma.elem));
    constraint_v.eq(cs, (label!("params::v"), mac.v));
}

/// Coordinator's proof that `mac` was computed over `ma` with the key behind `pk`.
pub fn prove_params<R>(
    gens: &Generators,
    sk: &ServerSecretKey,
    ma: &PublicCommitment,
    mac: &Mac,
    rng: &mut R,
) -> Proof
where
    R: RngCore + CryptoRng + ?Sized,
{
    let mut prover = Prover::new(label!("params").as_bytes());
    let vars = [
        prover.alloc_scalar((label!("params::w"), sk.w)),
        prover.alloc_scalar((label!("params::w_prime"), sk.w_prime)),
        prover.alloc_scalar((label!("params::x0"), sk.x0)),
        prover.alloc_scalar((label!("params::x1"), sk.x1)),
        prover.alloc_scalar((label!("params::ya"), sk.ya)),
    ];
    params_statement(&mut prover, vars, gens, &sk.public_key(gens), ma, mac);
    prover.prove(rng)
}

pub fn verify_params(
    gens: &Generators,
    pk: &ServerPublicKey,
    ma: &PublicCommitment,
    mac: &Mac,
    proof: &Proof,
) -> Result<(), ProofError> {
    let mut verifier = Verifier::new(label!("params").as_bytes());
    let vars = [
        verifier.alloc_scalar(label!("params::w")),
        verifier.alloc_scalar(label!("params::w_prime")),
        verifier.alloc_scalar(label!("params::x0")),
        verifier.alloc_scalar(label!("params::x1")),
        verifier.alloc_scalar(label!("params::ya")),
    ];
    params_statement(&mut verifier, vars, gens, pk, ma, mac);
    verifier.verify(proof)
}

// ProofOfMAC:
//   Z   = z * I
//   Cx1 = t * Cx0 + (-z * t) * Gx0 + z * Gx1

fn mac_statement<CS: ConstraintSystem>(
    cs: &mut CS,
    [z, t, neg_zt]: [ScalarVar; 3],
    gens: &Generators,
    pk: &ServerPublicKey,
    check_value: RistrettoPoint,
    commitments: &RandomizedCommitments,
) {
    let mut constraint_z = Constraint::new();
    constraint_z.add(cs, z, (label!("mac::i"), pk.i));
    constraint_z.eq(cs, (label!("mac::z"), check_value));

    let mut constraint_cx1 = Constraint::new();
    constraint_cx1.add(cs, t, (label!("mac::cx0"), commitments.cx0));
    constraint_cx1.add(cs, neg_zt, (label!("mac::gx0"), gens.gx0));
    constraint_cx1.add(cs, z, (label!("mac::gx1"), gens.gx1));
    constraint_cx1.eq(cs, (label!("mac::cx1"), commitments.cx1));
}

/// Client's proof of knowledge of a valid MAC behind a randomized presentation.
pub fn prove_mac_knowledge<R>(
    gens: &Generators,
    pk: &ServerPublicKey,
    z: Scalar,
    mac: &Mac,
    commitments: &RandomizedCommitments,
    rng: &mut R,
) -> Proof
where
    R: RngCore + CryptoRng + ?Sized,
{
    let mut prover = Prover::new(label!("mac").as_bytes());
    let vars = [
        prover.alloc_scalar((label!("mac::z"), z)),
        prover.alloc_scalar((label!("mac::t"), mac.t)),
        prover.alloc_scalar((label!("mac::neg_zt"), -(z * mac.t))),
    ];
    mac_statement(&mut prover, vars, gens, pk, z * pk.i, commitments);
    prover.prove(rng)
}

/// Verify a proof of MAC knowledge against the check value the coordinator computed from the
/// presentation.
pub fn verify_mac_knowledge(
    gens: &Generators,
    pk: &ServerPublicKey,
    check_value: RistrettoPoint,
    commitments: &RandomizedCommitments,
    proof: &Proof,
) -> Result<(), ProofError> {
    let mut verifier = Verifier::new(label!("mac").as_bytes());
    let vars = [
        verifier.alloc_scalar(label!("mac::z")),
        verifier.alloc_scalar(label!("mac::t")),
        verifier.alloc_scalar(label!("mac::neg_zt")),
    ];
    mac_statement(&mut verifier, vars, gens, pk, check_value, commitments);
    verifier.verify(proof)
}

// ProofOfSerialNumber:
//   Ca = z * Ga + a * Gg + r * Gh
//   S  = r * Gs

fn serial_number_statement<CS: ConstraintSystem>(
    cs: &mut CS,
    [z, a, r]: [ScalarVar; 3],
    gens: &Generators,
    ca: RistrettoPoint,
    serial_number: &SerialNumber,
) {
    let mut constraint_ca = Constraint::new();
    constraint_ca.add(cs, z, (label!("serial_number::ga"), gens.ga));
    constraint_ca.add(cs, a, (label!("serial_number::gg"), gens.gg));
    constraint_ca.add(cs, r, (label!("serial_number::gh"), gens.gh));
    constraint_ca.eq(cs, (label!("serial_number::ca"), ca));

    let mut constraint_s = Constraint::new();
    constraint_s.add(cs, r, (label!("serial_number::gs"), gens.gs));
    constraint_s.eq(cs, (label!("serial_number::s"), serial_number.0));
}

/// Prove that the revealed serial number belongs to the attribute behind the randomized amount
/// commitment `Ca`.
pub fn prove_serial_number<R>(
    gens: &Generators,
    z: Scalar,
    attribute: &Attribute,
    ca: RistrettoPoint,
    rng: &mut R,
) -> Proof
where
    R: RngCore + CryptoRng + ?Sized,
{
    let mut prover = Prover::new(label!("serial_number").as_bytes());
    let vars = [
        prover.alloc_scalar((label!("serial_number::z"), z)),
        prover.alloc_scalar((label!("serial_number::a"), attribute.amount())),
        prover.alloc_scalar((label!("serial_number::r"), attribute.blinding())),
    ];
    serial_number_statement(
        &mut prover,
        vars,
        gens,
        ca,
        &attribute.serial_number(gens),
    );
    prover.prove(rng)
}

pub fn verify_serial_number(
    gens: &Generators,
    ca: RistrettoPoint,
    serial_number: &SerialNumber,
    proof: &Proof,
) -> Result<(), ProofError> {
    let mut verifier = Verifier::new(label!("serial_number").as_bytes());
    let vars = [
        verifier.alloc_scalar(label!("serial_number::z")),
        verifier.alloc_scalar(label!("serial_number::a")),
        verifier.alloc_scalar(label!("serial_number::r")),
    ];
    serial_number_statement(&mut verifier, vars, gens, ca, serial_number);
    verifier.verify(proof)
}

// BalanceProof: B = z_sum * Ga + delta_r * Gh

fn balance_statement<CS: ConstraintSystem>(
    cs: &mut CS,
    [z_sum, delta_r]: [ScalarVar; 2],
    gens: &Generators,
    balance: RistrettoPoint,
) {
    let mut constraint = Constraint::new();
    constraint.add(cs, z_sum, (label!("balance::ga"), gens.ga));
    constraint.add(cs, delta_r, (label!("balance::gh"), gens.gh));
    constraint.eq(cs, (label!("balance::b"), balance));
}

/// Prove that `balance` carries no `Gg` component, i.e. that the amounts it was built from
/// cancel out.
pub fn prove_balance<R>(
    gens: &Generators,
    z_sum: Scalar,
    delta_r: Scalar,
    rng: &mut R,
) -> Proof
where
    R: RngCore + CryptoRng + ?Sized,
{
    let mut prover = Prover::new(label!("balance").as_bytes());
    let vars = [
        prover.alloc_scalar((label!("balance::z_sum"), z_sum)),
        prover.alloc_scalar((label!("balance::delta_r"), delta_r)),
    ];
    balance_statement(&mut prover, vars, gens, z_sum * gens.ga + delta_r * gens.gh);
    prover.prove(rng)
}

pub fn verify_balance(
    gens: &Generators,
    balance: RistrettoPoint,
    proof: &Proof,
) -> Result<(), ProofError> {
    let mut verifier = Verifier::new(label!("balance").as_bytes());
    let vars = [
        verifier.alloc_scalar(label!("balance::z_sum")),
        verifier.alloc_scalar(label!("balance::delta_r")),
    ];
    balance_statement(&mut verifier, vars, gens, balance);
    verifier.verify(proof)
}
