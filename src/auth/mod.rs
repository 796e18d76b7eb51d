//! Authentication module.
//!
//! Handles API credentials, HMAC-SHA1 request/response signatures and
//! per-request nonces.

mod credentials;
mod nonce;
mod signature;

pub use credentials::Credentials;
pub use nonce::NonceGenerator;
pub use signature::{canonical_query, sign, verify, SignatureCodec, RESPONSE_SIGNED_FIELDS};
