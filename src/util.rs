use curve25519_dalek::Scalar;
use rand::{CryptoRng, RngCore};

/// Number of draws [random_scalar] makes before treating the entropy source as broken.
const MAX_SAMPLING_ATTEMPTS: usize = 128;

/// Sample a scalar uniformly from `[1, l - 1]`.
///
/// Draws are masked to 253 bits, and any draw that is not a canonical encoding or that equals zero
/// is rejected, so accepted values are uniform without modular bias.
///
/// # Panics
///
/// Panics if no draw is accepted within a bounded number of attempts. About half of all draws
/// are accepted, so this only happens when the entropy source is producing garbage, which is not
/// something a caller can recover from.
pub fn random_scalar<R>(rng: &mut R) -> Scalar
where
    R: RngCore + CryptoRng + ?Sized,
{
    let mut bytes = [0u8; 32];
    for _ in 0..MAX_SAMPLING_ATTEMPTS {
        rng.fill_bytes(&mut bytes);
        bytes[31] &= 0x1f;
        let candidate: Option<Scalar> = Scalar::from_canonical_bytes(bytes).into();
        match candidate {
            Some(x) if x != Scalar::ZERO => return x,
            _ => continue,
        }
    }
    panic!("entropy source failed to produce a valid scalar in {MAX_SAMPLING_ATTEMPTS} draws");
}

#[cfg(test)]
mod test {
    use curve25519_dalek::Scalar;
    use rand::{CryptoRng, RngCore};

    use super::random_scalar;

    /// An RNG that only ever yields zero bytes.
    struct ZeroRng;

    impl RngCore for ZeroRng {
        fn next_u32(&mut self) -> u32 {
            0
        }

        fn next_u64(&mut self) -> u64 {
            0
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            dest.fill(0);
        }

        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
            self.fill_bytes(dest);
            Ok(())
        }
    }

    impl CryptoRng for ZeroRng {}

    #[test]
    fn random_scalars_are_nonzero_and_distinct() {
        let mut rng = rand::thread_rng();
        let a = random_scalar(&mut rng);
        let b = random_scalar(&mut rng);
        assert_ne!(a, Scalar::ZERO);
        assert_ne!(a, b);
    }

    #[test]
    #[should_panic(expected = "entropy source")]
    fn zero_entropy_is_fatal() {
        random_scalar(&mut ZeroRng);
    }
}
