use std::sync::Arc;

use anyhow::{anyhow, bail, Result};
use coinjoin_credentials::{
    Client, Coordinator, CryptoContext, ProtocolParameters, RegistrationError,
};
use tracing_subscriber::EnvFilter;

/// Amount of the coin Alice registers, split over her four new credentials.
const INPUT_VALUE: u64 = 351_234;
const SPLIT: [u64; 4] = [100_000, 200_000, 50_000, 1_234];

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let mut rng = rand::thread_rng();
    let ctx = Arc::new(CryptoContext::new()?);
    let params = ProtocolParameters::default();
    let coordinator = Coordinator::generate(Arc::clone(&ctx), params, &mut rng);

    // Alice and Bob are the same wallet, but never share anything the coordinator could link.
    let alice = Client::new(Arc::clone(&ctx), params, *coordinator.public_key());
    let bob = Client::new(Arc::clone(&ctx), params, *coordinator.public_key());

    let (request, pending) = alice.create_null_request(&mut rng);
    let response = coordinator.register_inputs(&request, &mut rng)?;
    let null_credentials = alice.handle_response(pending, &response)?;
    tracing::info!(count = null_credentials.len(), "Alice received zero-valued credentials");

    let (request, pending) =
        alice.create_request(&null_credentials, &SPLIT, INPUT_VALUE, &mut rng)?;
    let response = coordinator.register_inputs(&request, &mut rng)?;
    let credentials = alice.handle_response(pending, &response)?;
    tracing::info!(value = INPUT_VALUE, split = ?SPLIT, "Alice registered an input");

    let request = bob.create_output_request(&credentials, INPUT_VALUE, &mut rng)?;
    coordinator.register_outputs(&request)?;
    tracing::info!(value = INPUT_VALUE, "Bob registered an output");

    let replay = bob.create_output_request(&credentials, INPUT_VALUE, &mut rng)?;
    match coordinator.register_outputs(&replay) {
        Err(RegistrationError::DoubleRedemption) => {
            tracing::info!("coordinator rejected a second redemption of the same credentials")
        }
        Err(err) => bail!("second redemption rejected for the wrong reason: {err}"),
        Ok(()) => return Err(anyhow!("coordinator accepted a double redemption")),
    }

    Ok(())
}
