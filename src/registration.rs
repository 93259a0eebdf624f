//! The issue-then-present registration protocol.
//!
//! A [Client] registers inputs by requesting MACs over fresh amount commitments, either proving
//! that every requested amount is zero or proving that the requested amounts are balanced against
//! previously issued credentials plus a public delta. The [Coordinator] verifies the request,
//! issues one MAC per commitment and proves that it used its key honestly. Credentials are later
//! presented in output registration, re-randomized so that the coordinator cannot link them to
//! their issuance, together with their serial numbers which are recorded in a [NullifierSet] to
//! reject a second redemption.
//!
//! The message types here are plain data. Encoding them for transport is left to the caller.

use curve25519_dalek::Scalar;

use crate::{
    cmz::{Mac, RandomizedCommitments, ServerPublicKey},
    hash::HashToCurveError,
    pedersen::{PublicCommitment, SerialNumber},
    zkp::{Proof, ProofError},
};

pub mod client;
pub mod coordinator;
pub mod nullifier;

pub use client::{Client, Credential, PendingIssuance};
pub use coordinator::Coordinator;
pub use nullifier::{InMemoryNullifierSet, NullifierSet};

/// Parameters both roles agree on before a round starts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ProtocolParameters {
    /// Number of attributes requested, and of credentials presented, in every request.
    pub credential_count: usize,
}

impl Default for ProtocolParameters {
    fn default() -> Self {
        Self {
            credential_count: 4,
        }
    }
}

/// Reasons a registration request is rejected.
///
/// The variants deliberately carry no detail about which proof or which credential failed.
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum RegistrationError {
    #[error("malformed request: {0}")]
    Malformed(&'static str),
    #[error("request verification failed")]
    VerificationFailed,
    #[error("credential has already been redeemed")]
    DoubleRedemption,
    #[error("cryptographic primitive failure: {0}")]
    Fatal(#[from] HashToCurveError),
}

impl From<ProofError> for RegistrationError {
    fn from(_: ProofError) -> Self {
        RegistrationError::VerificationFailed
    }
}

impl RegistrationError {
    /// Short name of the error kind, suitable for logs and metrics labels.
    pub fn kind(&self) -> &'static str {
        match self {
            RegistrationError::Malformed(_) => "malformed",
            RegistrationError::VerificationFailed => "verification_failed",
            RegistrationError::DoubleRedemption => "double_redemption",
            RegistrationError::Fatal(_) => "fatal",
        }
    }
}

/// A re-randomized credential, with the proofs that it carries a valid MAC and that the revealed
/// serial number belongs to it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CredentialPresentation {
    pub commitments: RandomizedCommitments,
    pub mac_proof: Proof,
    pub serial_number: SerialNumber,
    pub serial_proof: Proof,
}

/// How a client justifies the amounts it asks the coordinator to certify.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IssuanceProof {
    /// One proof of exponent per requested commitment, showing each commits to zero.
    Null(Vec<Proof>),
    /// A single proof that the requested amounts equal the presented amounts plus the delta.
    Balance(Proof),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InputRegistrationRequest {
    /// Fresh amount commitments `Ma` to be MAC'd.
    pub requested: Vec<PublicCommitment>,
    /// Previously issued credentials being exchanged. Either empty or exactly
    /// [ProtocolParameters::credential_count] long.
    pub presented: Vec<CredentialPresentation>,
    pub proof: IssuanceProof,
    /// Amount being added from outside the credential system, e.g. a registered coin.
    pub delta_value: u64,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssuedCredential {
    pub mac: Mac,
    /// Proof of params binding the MAC to the coordinator's public key.
    pub proof: Proof,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct IssuanceResponse {
    pub public_key: ServerPublicKey,
    /// One entry per requested commitment, in request order.
    pub credentials: Vec<IssuedCredential>,
}

/// Aggregate opening of the presented amount commitments: `\Sigma z` and `\Sigma r`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BalanceOpening {
    pub z_sum: Scalar,
    pub r_sum: Scalar,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutputRegistrationRequest {
    pub presented: Vec<CredentialPresentation>,
    pub opening: BalanceOpening,
    /// Total amount the client redeems, e.g. the value of a transaction output.
    pub output_value: u64,
}
