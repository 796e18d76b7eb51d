//! API credentials issued by the validation service.

use std::fmt;

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;

use crate::error::{ConfigErrorKind, ValidateError, ValidateResult};

/// Client ID and decoded API secret.
#[derive(Clone)]
pub struct Credentials {
    api_key: Vec<u8>,
    client_id: String,
}

impl Credentials {
    /// Create credentials from a base64-encoded API key.
    ///
    /// Fails with `InvalidApiKey` if the key is not valid base64. Padding is
    /// optional.
    pub fn new(api_key: &str, client_id: impl Into<String>) -> ValidateResult<Self> {
        Ok(Self {
            api_key: decode_api_key(api_key)?,
            client_id: client_id.into().trim().to_string(),
        })
    }

    /// Decoded API secret.
    pub fn api_key(&self) -> &[u8] {
        &self.api_key
    }

    /// Replace the API key (base64-encoded).
    pub fn set_api_key(&mut self, api_key: &str) -> ValidateResult<()> {
        self.api_key = decode_api_key(api_key)?;
        Ok(())
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn set_client_id(&mut self, client_id: impl Into<String>) {
        self.client_id = client_id.into().trim().to_string();
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"[redacted]")
            .field("client_id", &self.client_id)
            .finish()
    }
}

/// Standard alphabet; keys are accepted with or without `=` padding.
const API_KEY_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

fn decode_api_key(api_key: &str) -> ValidateResult<Vec<u8>> {
    API_KEY_ENGINE
        .decode(api_key.trim())
        .map_err(|_| ValidateError::config(ConfigErrorKind::InvalidApiKey))
}
