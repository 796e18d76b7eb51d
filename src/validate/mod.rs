//! OTP validation service.
//!
//! Ties the protocol pieces together: builds and signs the request, sends it
//! to one or all hosts, drops responses with a bad server signature and
//! evaluates the quorum over the rest.

mod hosts;
mod service;

pub use hosts::{HostPool, DEFAULT_HOSTS};
pub use service::{ValidationService, Verdict, MAX_OTP_LENGTH, MIN_OTP_LENGTH};
