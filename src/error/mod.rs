//! Error handling module.

mod types;

pub use types::{
    AuthErrorKind, ConfigErrorKind, InputErrorKind, ProtocolErrorKind, ValidateError,
    ValidateResult,
};
