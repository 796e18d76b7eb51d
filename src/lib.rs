//! YubiKey OTP validation library.
//!
//! This crate validates one-time passwords against the Yubico WSAPI 2.0
//! validation servers: it signs the request, queries one or all hosts
//! concurrently, checks each server signature and combines the answers
//! into a single verdict.
//!
//! ```ignore
//! let credentials = Credentials::new("dGVzdGluZzEyMzQ1Njc4OTA=", "12345")?;
//! let transport = Arc::new(HttpTransport::new(&TransportConfig::default())?);
//! let service = ValidationService::new(credentials, transport);
//! let verdict = service.check(otp, true).await?;
//! ```

pub mod auth;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod protocol;
pub mod quorum;
pub mod transport;
pub mod validate;

pub use auth::Credentials;
pub use error::{ValidateError, ValidateResult};
pub use quorum::QuorumMode;
pub use validate::{HostPool, ValidationService, Verdict};
