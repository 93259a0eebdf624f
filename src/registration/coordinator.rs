use std::sync::Arc;

use curve25519_dalek::{RistrettoPoint, Scalar};
use itertools::Itertools;
use rand::{CryptoRng, RngCore};
use subtle::ConstantTimeEq;

use super::{
    CredentialPresentation, InMemoryNullifierSet, InputRegistrationRequest, IssuanceProof,
    IssuanceResponse, IssuedCredential, NullifierSet, OutputRegistrationRequest,
    ProtocolParameters, RegistrationError,
};
use crate::{
    cmz::{ServerPublicKey, ServerSecretKey},
    generators::CryptoContext,
    pedersen::{PublicCommitment, SerialNumber},
    proofs::{
        prove_params, verify_balance, verify_exponent, verify_mac_knowledge, verify_serial_number,
    },
};

/// The credential issuer and verifier.
///
/// Both registration entry points take `&self`: the key material is immutable after
/// construction and the only mutable state is the nullifier set, which synchronizes itself. A
/// single coordinator can therefore be shared between threads.
pub struct Coordinator<N = InMemoryNullifierSet> {
    ctx: Arc<CryptoContext>,
    params: ProtocolParameters,
    secret_key: ServerSecretKey,
    public_key: ServerPublicKey,
    nullifiers: N,
}

impl Coordinator<InMemoryNullifierSet> {
    /// Create a coordinator with a freshly generated key and an empty in-memory nullifier set.
    pub fn generate<R>(ctx: Arc<CryptoContext>, params: ProtocolParameters, rng: &mut R) -> Self
    where
        R: RngCore + CryptoRng + ?Sized,
    {
        let secret_key = ServerSecretKey::generate(rng);
        Self::new(ctx, params, secret_key, InMemoryNullifierSet::new())
    }
}

impl<N: NullifierSet> Coordinator<N> {
    pub fn new(
        ctx: Arc<CryptoContext>,
        params: ProtocolParameters,
        secret_key: ServerSecretKey,
        nullifiers: N,
    ) -> Self {
        let public_key = secret_key.public_key(ctx.generators());
        Self {
            ctx,
            params,
            secret_key,
            public_key,
            nullifiers,
        }
    }

    pub fn public_key(&self) -> &ServerPublicKey {
        &self.public_key
    }

    pub fn parameters(&self) -> &ProtocolParameters {
        &self.params
    }

    pub fn nullifiers(&self) -> &N {
        &self.nullifiers
    }

    /// Verify an input registration and issue one MAC per requested commitment.
    ///
    /// Credentials presented in the request are redeemed: their serial numbers are recorded and
    /// cannot be presented again. Nothing is recorded unless the whole request is accepted.
    pub fn register_inputs<R>(
        &self,
        request: &InputRegistrationRequest,
        rng: &mut R,
    ) -> Result<IssuanceResponse, RegistrationError>
    where
        R: RngCore + CryptoRng + ?Sized,
    {
        let result = self.try_register_inputs(request, rng);
        match &result {
            Ok(response) => tracing::debug!(
                requested = request.requested.len(),
                presented = request.presented.len(),
                issued = response.credentials.len(),
                "input registration accepted"
            ),
            Err(err) => log_rejection("input", err),
        }
        result
    }

    /// Verify an output registration, redeeming every presented credential.
    pub fn register_outputs(
        &self,
        request: &OutputRegistrationRequest,
    ) -> Result<(), RegistrationError> {
        let result = self.try_register_outputs(request);
        match &result {
            Ok(()) => tracing::debug!(
                presented = request.presented.len(),
                "output registration accepted"
            ),
            Err(err) => log_rejection("output", err),
        }
        result
    }

    fn try_register_inputs<R>(
        &self,
        request: &InputRegistrationRequest,
        rng: &mut R,
    ) -> Result<IssuanceResponse, RegistrationError>
    where
        R: RngCore + CryptoRng + ?Sized,
    {
        let gens = self.ctx.generators();
        let count = self.params.credential_count;
        if request.requested.len() != count {
            return Err(RegistrationError::Malformed("requested attribute count"));
        }
        if !request.presented.is_empty() && request.presented.len() != count {
            return Err(RegistrationError::Malformed("presented credential count"));
        }
        let null_request = request.presented.is_empty() && request.delta_value == 0;
        match (&request.proof, null_request) {
            (IssuanceProof::Null(proofs), true) if proofs.len() == count => {}
            (IssuanceProof::Balance(_), false) => {}
            _ => return Err(RegistrationError::Malformed("issuance proof kind")),
        }

        let serial_numbers = self.verify_presentations(&request.presented)?;

        match &request.proof {
            IssuanceProof::Null(proofs) => {
                for (ma, proof) in itertools::zip_eq(&request.requested, proofs) {
                    verify_exponent(ma.elem, gens.gh, proof)?;
                }
            }
            IssuanceProof::Balance(proof) => {
                // B = delta * Gg + \Sigma Ca - \Sigma Ma'
                let balance = Scalar::from(request.delta_value) * gens.gg
                    + request
                        .presented
                        .iter()
                        .map(|p| p.commitments.ca)
                        .sum::<RistrettoPoint>()
                    - request
                        .requested
                        .iter()
                        .map(|ma| ma.elem)
                        .sum::<RistrettoPoint>();
                verify_balance(gens, balance, proof)?;
            }
        }

        let credentials = request
            .requested
            .iter()
            .map(|ma| self.issue(ma, rng))
            .collect::<Result<Vec<_>, _>>()?;

        if !self.nullifiers.insert_all(&serial_numbers) {
            return Err(RegistrationError::DoubleRedemption);
        }

        Ok(IssuanceResponse {
            public_key: self.public_key,
            credentials,
        })
    }

    fn try_register_outputs(
        &self,
        request: &OutputRegistrationRequest,
    ) -> Result<(), RegistrationError> {
        let gens = self.ctx.generators();
        if request.presented.len() != self.params.credential_count {
            return Err(RegistrationError::Malformed("presented credential count"));
        }

        let serial_numbers = self.verify_presentations(&request.presented)?;

        // \Sigma z * Ga + v_out * Gg + \Sigma r * Gh == \Sigma Ca
        let opening = &request.opening;
        let expected = opening.z_sum * gens.ga
            + Scalar::from(request.output_value) * gens.gg
            + opening.r_sum * gens.gh;
        let presented = request
            .presented
            .iter()
            .map(|p| p.commitments.ca)
            .sum::<RistrettoPoint>();
        if !bool::from(expected.ct_eq(&presented)) {
            return Err(RegistrationError::VerificationFailed);
        }

        if !self.nullifiers.insert_all(&serial_numbers) {
            return Err(RegistrationError::DoubleRedemption);
        }
        Ok(())
    }

    /// Check every presentation and return the serial numbers to record.
    fn verify_presentations(
        &self,
        presented: &[CredentialPresentation],
    ) -> Result<Vec<SerialNumber>, RegistrationError> {
        let gens = self.ctx.generators();

        if !presented
            .iter()
            .map(|p| p.serial_number.to_bytes())
            .all_unique()
        {
            return Err(RegistrationError::DoubleRedemption);
        }

        for presentation in presented {
            let commitments = &presentation.commitments;
            verify_serial_number(
                gens,
                commitments.ca,
                &presentation.serial_number,
                &presentation.serial_proof,
            )?;
            if self.nullifiers.contains(&presentation.serial_number) {
                return Err(RegistrationError::DoubleRedemption);
            }

            let check_value = self.secret_key.check_value(gens, commitments);
            verify_mac_knowledge(
                gens,
                &self.public_key,
                check_value,
                commitments,
                &presentation.mac_proof,
            )?;
        }

        Ok(presented.iter().map(|p| p.serial_number).collect())
    }

    fn issue<R>(
        &self,
        ma: &PublicCommitment,
        rng: &mut R,
    ) -> Result<IssuedCredential, RegistrationError>
    where
        R: RngCore + CryptoRng + ?Sized,
    {
        let mac = self.secret_key.compute_mac(&self.ctx, ma, rng)?;
        let proof = prove_params(self.ctx.generators(), &self.secret_key, ma, &mac, rng);
        Ok(IssuedCredential { mac, proof })
    }
}

fn log_rejection(stage: &'static str, err: &RegistrationError) {
    match err {
        RegistrationError::Fatal(inner) => {
            tracing::error!(stage, error = %inner, "registration aborted")
        }
        _ => tracing::warn!(stage, kind = err.kind(), "registration rejected"),
    }
}
