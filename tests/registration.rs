use std::{num::NonZeroUsize, sync::Arc, thread};

use coinjoin_credentials::{
    registration::{IssuanceProof, OutputRegistrationRequest},
    Client, Coordinator, Credential, CryptoContext, NullifierSet, ProtocolParameters,
    RegistrationError,
};
use curve25519_dalek::Scalar;

struct Round {
    ctx: Arc<CryptoContext>,
    coordinator: Coordinator,
    client: Client,
}

impl Round {
    fn new() -> Self {
        Self::with_context(Arc::new(CryptoContext::new().unwrap()))
    }

    fn with_context(ctx: Arc<CryptoContext>) -> Self {
        let params = ProtocolParameters::default();
        let coordinator = Coordinator::generate(Arc::clone(&ctx), params, &mut rand::thread_rng());
        let client = Client::new(Arc::clone(&ctx), params, *coordinator.public_key());
        Self {
            ctx,
            coordinator,
            client,
        }
    }

    fn null_credentials(&self) -> Vec<Credential> {
        let mut rng = rand::thread_rng();
        let (request, pending) = self.client.create_null_request(&mut rng);
        let response = self.coordinator.register_inputs(&request, &mut rng).unwrap();
        self.client.handle_response(pending, &response).unwrap()
    }

    fn credentials(&self, amounts: &[u64]) -> Vec<Credential> {
        let mut rng = rand::thread_rng();
        let presented = self.null_credentials();
        let (request, pending) = self
            .client
            .create_request(&presented, amounts, amounts.iter().sum(), &mut rng)
            .unwrap();
        let response = self.coordinator.register_inputs(&request, &mut rng).unwrap();
        self.client.handle_response(pending, &response).unwrap()
    }
}

#[test]
fn value_is_conserved_across_a_round() {
    let round = Round::new();
    let mut rng = rand::thread_rng();

    // Alice registers four zero-valued attributes.
    let null_credentials = round.null_credentials();
    assert_eq!(null_credentials.len(), 4);
    assert!(null_credentials.iter().all(|c| c.amount() == Scalar::ZERO));

    // She exchanges them, adding an input worth 351234, for credentials over her chosen split.
    let amounts = [100_000, 200_000, 50_000, 1_234];
    let (request, pending) = round
        .client
        .create_request(&null_credentials, &amounts, 351_234, &mut rng)
        .unwrap();
    assert!(matches!(request.proof, IssuanceProof::Balance(_)));
    let response = round.coordinator.register_inputs(&request, &mut rng).unwrap();
    let credentials = round.client.handle_response(pending, &response).unwrap();
    assert_eq!(round.coordinator.nullifiers().len(), 4);

    // Bob redeems them for an output of the same total.
    let request = round
        .client
        .create_output_request(&credentials, 351_234, &mut rng)
        .unwrap();
    round.coordinator.register_outputs(&request).unwrap();
    assert_eq!(round.coordinator.nullifiers().len(), 8);
}

#[test]
fn altered_requested_commitment_is_rejected() {
    let round = Round::new();
    let gens = round.ctx.generators();
    let mut rng = rand::thread_rng();
    let null_credentials = round.null_credentials();

    let (request, _) = round
        .client
        .create_request(
            &null_credentials,
            &[100_000, 200_000, 50_000, 1_234],
            351_234,
            &mut rng,
        )
        .unwrap();
    for i in 0..request.requested.len() {
        let mut altered = request.clone();
        altered.requested[i] = altered.requested[i].add(&gens.gg.into());
        let Err(RegistrationError::VerificationFailed) =
            round.coordinator.register_inputs(&altered, &mut rng)
        else {
            panic!("coordinator accepted an inflated commitment at position {i}");
        };
    }

    // Rejected requests leave no trace, so the untouched request still goes through.
    assert!(round.coordinator.nullifiers().is_empty());
    round.coordinator.register_inputs(&request, &mut rng).unwrap();
    assert_eq!(round.coordinator.nullifiers().len(), 4);
}

#[test]
fn misdeclared_delta_is_rejected() {
    let round = Round::new();
    let mut rng = rand::thread_rng();
    let null_credentials = round.null_credentials();

    let (mut request, _) = round
        .client
        .create_request(&null_credentials, &[1, 2, 3, 4], 10, &mut rng)
        .unwrap();
    request.delta_value = 11;
    let Err(RegistrationError::VerificationFailed) =
        round.coordinator.register_inputs(&request, &mut rng)
    else {
        panic!("coordinator accepted a delta that does not match the requested amounts");
    };
}

#[test]
fn null_proof_over_nonzero_amount_is_rejected() {
    let round = Round::new();
    let gens = round.ctx.generators();
    let mut rng = rand::thread_rng();

    let (mut request, _) = round.client.create_null_request(&mut rng);
    request.requested[0] = request.requested[0].add(&gens.gg.into());
    let Err(RegistrationError::VerificationFailed) =
        round.coordinator.register_inputs(&request, &mut rng)
    else {
        panic!("coordinator issued a credential over a nonzero amount without a balance proof");
    };
}

#[test]
fn overstated_output_is_rejected() {
    let round = Round::new();
    let mut rng = rand::thread_rng();
    let credentials = round.credentials(&[10, 20, 30, 40]);

    let mut request = round
        .client
        .create_output_request(&credentials, 100, &mut rng)
        .unwrap();
    request.output_value = 101;
    let Err(RegistrationError::VerificationFailed) = round.coordinator.register_outputs(&request)
    else {
        panic!("coordinator accepted an output worth more than the presented credentials");
    };

    // Nothing was redeemed by the failed attempt.
    request.output_value = 100;
    round.coordinator.register_outputs(&request).unwrap();
}

#[test]
fn double_redemption_across_requests_is_rejected() {
    let round = Round::new();
    let mut rng = rand::thread_rng();
    let credentials = round.credentials(&[5_000, 0, 0, 7_000]);

    let first = round
        .client
        .create_output_request(&credentials, 12_000, &mut rng)
        .unwrap();
    round.coordinator.register_outputs(&first).unwrap();

    // A fresh randomization with fresh proofs, which verify on their own.
    let second = round
        .client
        .create_output_request(&credentials, 12_000, &mut rng)
        .unwrap();
    let Err(RegistrationError::DoubleRedemption) = round.coordinator.register_outputs(&second)
    else {
        panic!("coordinator accepted a second redemption of the same credentials");
    };

    // Replaying the exact same request is caught the same way.
    let Err(RegistrationError::DoubleRedemption) = round.coordinator.register_outputs(&first)
    else {
        panic!("coordinator accepted a replayed output registration");
    };
}

#[test]
fn credentials_exchanged_in_input_registration_are_spent() {
    let round = Round::new();
    let mut rng = rand::thread_rng();
    let null_credentials = round.null_credentials();

    let (request, _) = round
        .client
        .create_request(&null_credentials, &[0, 0, 0, 0], 0, &mut rng)
        .unwrap();
    round.coordinator.register_inputs(&request, &mut rng).unwrap();

    let (again, _) = round
        .client
        .create_request(&null_credentials, &[0, 0, 0, 0], 0, &mut rng)
        .unwrap();
    let Err(RegistrationError::DoubleRedemption) =
        round.coordinator.register_inputs(&again, &mut rng)
    else {
        panic!("coordinator re-issued value from already exchanged credentials");
    };
}

#[test]
fn duplicate_presentation_within_request_is_rejected() {
    let round = Round::new();
    let mut rng = rand::thread_rng();
    let credentials = round.credentials(&[1, 1, 1, 1]);

    let mut request = round
        .client
        .create_output_request(&credentials, 4, &mut rng)
        .unwrap();
    let (duplicate, _) = round.client.present(&credentials[0], &mut rng);
    request.presented[1] = duplicate;
    let Err(RegistrationError::DoubleRedemption) = round.coordinator.register_outputs(&request)
    else {
        panic!("coordinator accepted a request presenting one credential twice");
    };
    assert!(!round
        .coordinator
        .nullifiers()
        .contains(&credentials[0].attribute().serial_number(round.ctx.generators())));
}

#[test]
fn forged_presentation_is_rejected() {
    let round = Round::new();
    let other = Round::new();
    let mut rng = rand::thread_rng();

    // Credentials issued by a different coordinator carry MACs under a different key.
    let foreign = other.credentials(&[1, 2, 3, 4]);
    let foreign_client = Client::new(
        Arc::clone(&round.ctx),
        *round.coordinator.parameters(),
        *round.coordinator.public_key(),
    );
    let request = foreign_client
        .create_output_request(&foreign, 10, &mut rng)
        .unwrap();
    let Err(RegistrationError::VerificationFailed) = round.coordinator.register_outputs(&request)
    else {
        panic!("coordinator accepted credentials it never issued");
    };
}

#[test]
fn tampered_presentation_proofs_are_rejected() {
    let round = Round::new();
    let mut rng = rand::thread_rng();
    let credentials = round.credentials(&[1, 2, 3, 4]);
    let request = round
        .client
        .create_output_request(&credentials, 10, &mut rng)
        .unwrap();

    let tamper: [fn(&mut OutputRegistrationRequest); 4] = [
        |r| r.presented[0].mac_proof.responses[0] += Scalar::ONE,
        |r| r.presented[1].serial_proof.responses[1] += Scalar::ONE,
        |r| r.presented[2].commitments.cv = r.presented[3].commitments.cv,
        |r| r.presented[3].commitments.ca = r.presented[0].commitments.ca,
    ];
    for (i, tamper) in tamper.iter().enumerate() {
        let mut tampered = request.clone();
        tamper(&mut tampered);
        let Err(RegistrationError::VerificationFailed) =
            round.coordinator.register_outputs(&tampered)
        else {
            panic!("tampered presentation {i} was accepted");
        };
    }
    round.coordinator.register_outputs(&request).unwrap();
}

#[test]
fn malformed_requests_are_rejected() {
    let round = Round::new();
    let mut rng = rand::thread_rng();

    let (request, _) = round.client.create_null_request(&mut rng);

    let mut short = request.clone();
    short.requested.pop();
    let Err(RegistrationError::Malformed(_)) = round.coordinator.register_inputs(&short, &mut rng)
    else {
        panic!("coordinator accepted too few requested attributes");
    };

    let mut with_delta = request.clone();
    with_delta.delta_value = 1;
    let Err(RegistrationError::Malformed(_)) =
        round.coordinator.register_inputs(&with_delta, &mut rng)
    else {
        panic!("coordinator accepted null proofs for a nonzero delta");
    };

    let IssuanceProof::Null(mut proofs) = request.proof.clone() else {
        panic!("null request carries a balance proof");
    };
    proofs.pop();
    let mut missing_proof = request.clone();
    missing_proof.proof = IssuanceProof::Null(proofs);
    let Err(RegistrationError::Malformed(_)) =
        round.coordinator.register_inputs(&missing_proof, &mut rng)
    else {
        panic!("coordinator accepted a missing null proof");
    };

    let credentials = round.credentials(&[1, 1, 1, 1]);
    let mut output = round
        .client
        .create_output_request(&credentials, 4, &mut rng)
        .unwrap();
    output.presented.truncate(3);
    let Err(RegistrationError::Malformed(_)) = round.coordinator.register_outputs(&output) else {
        panic!("coordinator accepted too few presented credentials");
    };
}

#[test]
fn concurrent_redemptions_admit_one() {
    let round = Arc::new(Round::new());
    let credentials = round.credentials(&[2, 2, 2, 2]);

    let requests: Vec<_> = (0..4)
        .map(|_| {
            round
                .client
                .create_output_request(&credentials, 8, &mut rand::thread_rng())
                .unwrap()
        })
        .collect();
    let handles: Vec<_> = requests
        .into_iter()
        .map(|request| {
            let round = Arc::clone(&round);
            thread::spawn(move || round.coordinator.register_outputs(&request))
        })
        .collect();

    let mut accepted = 0;
    for handle in handles {
        match handle.join().unwrap() {
            Ok(()) => accepted += 1,
            Err(RegistrationError::DoubleRedemption) => {}
            Err(err) => panic!("unexpected rejection: {err}"),
        }
    }
    assert_eq!(accepted, 1);
}

#[test]
fn issuance_does_not_fill_the_nums_cache() {
    let round = Round::new();
    let mut rng = rand::thread_rng();

    for _ in 0..10 {
        let (request, _) = round.client.create_null_request(&mut rng);
        round.coordinator.register_inputs(&request, &mut rng).unwrap();
    }
    assert!(round.ctx.nums_cache().is_empty());
}

#[test]
fn nums_cache_stays_bounded_across_rounds() {
    let capacity = NonZeroUsize::new(6).unwrap();
    let round = Round::with_context(Arc::new(
        CryptoContext::with_nums_capacity(capacity).unwrap(),
    ));

    for _ in 0..10 {
        let credentials = round.null_credentials();
        assert_eq!(credentials.len(), 4);
        assert!(round.ctx.nums_cache().len() <= capacity.get());
    }
    assert_eq!(round.ctx.nums_cache().len(), capacity.get());
}
