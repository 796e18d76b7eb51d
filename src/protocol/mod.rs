//! Wire protocol module.
//!
//! Defines the verification request, the parsed server response and the
//! response body format.
//!
//! ## Wire Format
//!
//! Requests are HTTP GETs against the verification endpoint:
//! ```text
//! /wsapi/2.0/verify?id=<id>&nonce=<nonce>&otp=<otp>&timestamp=1&h=<signature>
//! ```
//!
//! Responses are newline-separated `key=value` lines:
//! ```text
//! h=vjhFxZrNHB5CjI6vhuSeF2n46a8=
//! t=2024-01-01T12:00:00Z0123
//! otp=cccccccbcjdifctrndncchkftchjlnbhvhtugdljibej
//! nonce=aef3a7835277a28da831005c2ae3b919e2076a62
//! sl=100
//! status=OK
//! ```

mod request;
mod response;
mod wire;

pub use request::{Scheme, ValidationRequest, Verb, VERIFY_PATH};
pub use response::{public_id, Status, ValidationResponse};
pub use wire::parse;
