//! Keyed-verification anonymous credentials for coin-mixing coordination.
//!
//! A coordinator issues algebraic MACs over Pedersen commitments to amounts. Clients later
//! present re-randomized credentials, proving in zero knowledge that they hold valid MACs, that
//! no value is created or destroyed, and revealing serial numbers that prevent a credential from
//! being redeemed twice. Everything works over the ristretto255 group.
//!
//! The building blocks are layered bottom-up:
//! - [hash] and [generators] derive the fixed public generators and the nums points,
//! - [pedersen] provides commitments and attributes,
//! - [cmz] is the algebraic MAC,
//! - [zkp] is a generic Schnorr proof engine, with the protocol statements in [proofs],
//! - [registration] ties them into the coordinator and client roles.

pub mod cmz;
pub mod generators;
pub mod hash;
pub mod pedersen;
pub mod proofs;
pub mod registration;
pub mod util;
pub mod zkp;

pub use generators::{CryptoContext, Generators};
pub use registration::{
    Client, Coordinator, Credential, InMemoryNullifierSet, NullifierSet, ProtocolParameters,
    RegistrationError,
};
