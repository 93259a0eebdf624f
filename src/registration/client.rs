use std::sync::Arc;

use curve25519_dalek::Scalar;
use rand::{CryptoRng, RngCore};

use super::{
    BalanceOpening, CredentialPresentation, InputRegistrationRequest, IssuanceProof,
    IssuanceResponse, OutputRegistrationRequest, ProtocolParameters, RegistrationError,
};
use crate::{
    cmz::{Mac, RandomizedCommitments, ServerPublicKey},
    generators::CryptoContext,
    pedersen::Attribute,
    proofs::{
        prove_balance, prove_exponent, prove_mac_knowledge, prove_serial_number, verify_params,
    },
    util::random_scalar,
};

/// An attribute with a MAC issued over it. Held by the client until it is presented.
#[derive(Clone, Debug)]
pub struct Credential {
    attribute: Attribute,
    mac: Mac,
}

impl Credential {
    pub fn attribute(&self) -> &Attribute {
        &self.attribute
    }

    pub fn mac(&self) -> &Mac {
        &self.mac
    }

    pub fn amount(&self) -> Scalar {
        self.attribute.amount()
    }
}

/// Openings of the commitments sent in an input registration request, kept until the response
/// arrives.
#[derive(Debug)]
pub struct PendingIssuance {
    attributes: Vec<Attribute>,
}

/// The requesting and presenting side of the protocol.
pub struct Client {
    ctx: Arc<CryptoContext>,
    params: ProtocolParameters,
    public_key: ServerPublicKey,
}

impl Client {
    pub fn new(
        ctx: Arc<CryptoContext>,
        params: ProtocolParameters,
        public_key: ServerPublicKey,
    ) -> Self {
        Self {
            ctx,
            params,
            public_key,
        }
    }

    /// Request credentials over zero amounts, without presenting anything.
    pub fn create_null_request<R>(
        &self,
        rng: &mut R,
    ) -> (InputRegistrationRequest, PendingIssuance)
    where
        R: RngCore + CryptoRng + ?Sized,
    {
        let gens = self.ctx.generators();
        let attributes: Vec<Attribute> = (0..self.params.credential_count)
            .map(|_| Attribute::new(gens, 0, rng))
            .collect();
        let proofs = attributes
            .iter()
            .map(|attribute| prove_exponent(attribute.blinding(), gens.gh, rng))
            .collect();

        let request = InputRegistrationRequest {
            requested: attributes.iter().map(Attribute::commitment).collect(),
            presented: Vec::new(),
            proof: IssuanceProof::Null(proofs),
            delta_value: 0,
        };
        (request, PendingIssuance { attributes })
    }

    /// Exchange `presented` credentials, plus `delta_value` from outside the credential system,
    /// for new credentials over `amounts`.
    ///
    /// The amounts must balance. A request that presents nothing and adds nothing is a null
    /// request.
    pub fn create_request<R>(
        &self,
        presented: &[Credential],
        amounts: &[u64],
        delta_value: u64,
        rng: &mut R,
    ) -> Result<(InputRegistrationRequest, PendingIssuance), RegistrationError>
    where
        R: RngCore + CryptoRng + ?Sized,
    {
        let count = self.params.credential_count;
        if amounts.len() != count {
            return Err(RegistrationError::Malformed("requested attribute count"));
        }
        if !presented.is_empty() && presented.len() != count {
            return Err(RegistrationError::Malformed("presented credential count"));
        }
        let available = presented.iter().map(Credential::amount).sum::<Scalar>()
            + Scalar::from(delta_value);
        let requested = amounts.iter().copied().map(Scalar::from).sum::<Scalar>();
        if available != requested {
            return Err(RegistrationError::Malformed("unbalanced amounts"));
        }
        if presented.is_empty() && delta_value == 0 {
            return Ok(self.create_null_request(rng));
        }

        let gens = self.ctx.generators();
        let attributes: Vec<Attribute> = amounts
            .iter()
            .map(|amount| Attribute::new(gens, *amount, rng))
            .collect();
        let (presentations, z_sum, presented_r_sum) = self.present_all(presented, rng);
        let requested_r_sum = attributes.iter().map(Attribute::blinding).sum::<Scalar>();
        let proof = prove_balance(gens, z_sum, presented_r_sum - requested_r_sum, rng);

        let request = InputRegistrationRequest {
            requested: attributes.iter().map(Attribute::commitment).collect(),
            presented: presentations,
            proof: IssuanceProof::Balance(proof),
            delta_value,
        };
        Ok((request, PendingIssuance { attributes }))
    }

    /// Check the coordinator's response and combine it with the pending openings.
    pub fn handle_response(
        &self,
        pending: PendingIssuance,
        response: &IssuanceResponse,
    ) -> Result<Vec<Credential>, RegistrationError> {
        if response.public_key != self.public_key {
            return Err(RegistrationError::VerificationFailed);
        }
        if response.credentials.len() != pending.attributes.len() {
            return Err(RegistrationError::Malformed("issued credential count"));
        }

        let gens = self.ctx.generators();
        itertools::zip_eq(pending.attributes, &response.credentials)
            .map(|(attribute, issued)| {
                // U must be derived from t, or the coordinator could mark the credential.
                if issued.mac.u != self.ctx.nums(&issued.mac.t)? {
                    return Err(RegistrationError::VerificationFailed);
                }
                verify_params(
                    gens,
                    &self.public_key,
                    &attribute.commitment(),
                    &issued.mac,
                    &issued.proof,
                )?;
                Ok(Credential {
                    attribute,
                    mac: issued.mac,
                })
            })
            .collect()
    }

    /// Redeem `credentials` for a total of `output_value`, which must equal their combined amount.
    pub fn create_output_request<R>(
        &self,
        credentials: &[Credential],
        output_value: u64,
        rng: &mut R,
    ) -> Result<OutputRegistrationRequest, RegistrationError>
    where
        R: RngCore + CryptoRng + ?Sized,
    {
        if credentials.len() != self.params.credential_count {
            return Err(RegistrationError::Malformed("presented credential count"));
        }
        let total = credentials.iter().map(Credential::amount).sum::<Scalar>();
        if total != Scalar::from(output_value) {
            return Err(RegistrationError::Malformed("unbalanced amounts"));
        }

        let (presented, z_sum, r_sum) = self.present_all(credentials, rng);
        Ok(OutputRegistrationRequest {
            presented,
            opening: BalanceOpening { z_sum, r_sum },
            output_value,
        })
    }

    /// Randomize a credential and prove knowledge of its MAC and serial number.
    ///
    /// Returns the randomizer `z` alongside the presentation, as it is needed for balance proofs.
    pub fn present<R>(
        &self,
        credential: &Credential,
        rng: &mut R,
    ) -> (CredentialPresentation, Scalar)
    where
        R: RngCore + CryptoRng + ?Sized,
    {
        let gens = self.ctx.generators();
        let z = random_scalar(rng);
        let attribute = &credential.attribute;
        let commitments =
            RandomizedCommitments::new(gens, z, &attribute.commitment(), &credential.mac);

        let presentation = CredentialPresentation {
            mac_proof: prove_mac_knowledge(
                gens,
                &self.public_key,
                z,
                &credential.mac,
                &commitments,
                rng,
            ),
            serial_number: attribute.serial_number(gens),
            serial_proof: prove_serial_number(gens, z, attribute, commitments.ca, rng),
            commitments,
        };
        (presentation, z)
    }

    fn present_all<R>(
        &self,
        credentials: &[Credential],
        rng: &mut R,
    ) -> (Vec<CredentialPresentation>, Scalar, Scalar)
    where
        R: RngCore + CryptoRng + ?Sized,
    {
        let mut z_sum = Scalar::ZERO;
        let mut r_sum = Scalar::ZERO;
        let presentations = credentials
            .iter()
            .map(|credential| {
                let (presentation, z) = self.present(credential, rng);
                z_sum += z;
                r_sum += credential.attribute.blinding();
                presentation
            })
            .collect();
        (presentations, z_sum, r_sum)
    }
}
