use esp_hal::rng::Rng;
use rand_core::{CryptoRng, RngCore};

pub(crate) fn get_seed() -> u64 {
    let rng = Rng::new();
    u64::from(rng.random()) << 32 | u64::from(rng.random())
}

/// Hardware random number generator for the TLS handshake.
///
/// The ESP32 RNG is only cryptographically strong while the radio is running,
/// which holds for every TLS session since they need Wi-Fi.
#[derive(Clone, Copy)]
pub struct EspRng(Rng);

impl EspRng {
    pub fn new() -> Self {
        Self(Rng::new())
    }
}

impl Default for EspRng {
    fn default() -> Self {
        Self::new()
    }
}

impl RngCore for EspRng {
    fn next_u32(&mut self) -> u32 {
        self.0.random()
    }

    fn next_u64(&mut self) -> u64 {
        u64::from(self.next_u32()) << 32 | u64::from(self.next_u32())
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let word = self.next_u32().to_le_bytes();
            chunk.copy_from_slice(&word[..chunk.len()]);
        }
    }

    fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand_core::Error> {
        self.fill_bytes(dest);
        Ok(())
    }
}

impl CryptoRng for EspRng {}
