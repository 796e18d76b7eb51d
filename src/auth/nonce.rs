//! Per-request nonce generation.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use ring::digest;
use ring::rand::{SecureRandom, SystemRandom};
use tracing::warn;

/// Nonce size in bytes (rendered as 32 hex characters).
const NONCE_BYTES: usize = 16;

/// Process-wide counter mixed into fallback nonces.
static FALLBACK_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Generates the nonce the server must echo back in its response.
///
/// Nonces are not stored; they only bind a response to its request.
pub struct NonceGenerator {
    rng: SystemRandom,
}

impl NonceGenerator {
    /// Create a generator backed by the operating system CSPRNG.
    pub fn new() -> Self {
        Self {
            rng: SystemRandom::new(),
        }
    }

    /// Generate a 128-bit nonce as 32 lowercase hex characters.
    pub fn generate(&self) -> String {
        let mut bytes = [0u8; NONCE_BYTES];
        match self.rng.fill(&mut bytes) {
            Ok(()) => hex::encode(bytes),
            Err(_) => {
                warn!("System CSPRNG unavailable, using weaker time-based nonce");
                fallback_nonce()
            }
        }
    }
}

impl Default for NonceGenerator {
    fn default() -> Self {
        Self::new()
    }
}

/// Digest of clock, pid and a counter. Unique but predictable, so
/// cryptographically weaker than the CSPRNG path.
fn fallback_nonce() -> String {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos())
        .unwrap_or(0);
    let count = FALLBACK_COUNTER.fetch_add(1, Ordering::Relaxed);

    let mut ctx = digest::Context::new(&digest::SHA256);
    ctx.update(&nanos.to_le_bytes());
    ctx.update(&std::process::id().to_le_bytes());
    ctx.update(&count.to_le_bytes());

    hex::encode(&ctx.finish().as_ref()[..NONCE_BYTES])
}
