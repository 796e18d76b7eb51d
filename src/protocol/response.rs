//! Parsed responses from the validation servers.

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Serialize, Serializer};

use super::wire;
use crate::auth::RESPONSE_SIGNED_FIELDS;

/// Status values returned by the validation servers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    Ok,
    ReplayedOtp,
    ReplayedRequest,
    MissingParameter,
    NoSuchClient,
    BadOtp,
    BadSignature,
    OperationNotAllowed,
    BackendError,
    NotEnoughAnswers,
    /// A status string this crate does not know. Never a success.
    Unknown(String),
}

impl Status {
    pub fn parse(value: &str) -> Self {
        match value {
            "OK" => Self::Ok,
            "REPLAYED_OTP" => Self::ReplayedOtp,
            "REPLAYED_REQUEST" => Self::ReplayedRequest,
            "MISSING_PARAMETER" => Self::MissingParameter,
            "NO_SUCH_CLIENT" => Self::NoSuchClient,
            "BAD_OTP" => Self::BadOtp,
            "BAD_SIGNATURE" => Self::BadSignature,
            "OPERATION_NOT_ALLOWED" => Self::OperationNotAllowed,
            "BACKEND_ERROR" => Self::BackendError,
            "NOT_ENOUGH_ANSWERS" => Self::NotEnoughAnswers,
            other => Self::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Ok => "OK",
            Self::ReplayedOtp => "REPLAYED_OTP",
            Self::ReplayedRequest => "REPLAYED_REQUEST",
            Self::MissingParameter => "MISSING_PARAMETER",
            Self::NoSuchClient => "NO_SUCH_CLIENT",
            Self::BadOtp => "BAD_OTP",
            Self::BadSignature => "BAD_SIGNATURE",
            Self::OperationNotAllowed => "OPERATION_NOT_ALLOWED",
            Self::BackendError => "BACKEND_ERROR",
            Self::NotEnoughAnswers => "NOT_ENOUGH_ANSWERS",
            Self::Unknown(other) => other,
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Status {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// One host's answer to a verification request.
///
/// Signed fields keep the exact text the server sent so the response
/// signature can be recomputed.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ValidationResponse {
    /// Server signature over the other fields (`h`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hash: Option<String>,

    /// Server UTC timestamp with millisecond suffix (`t`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,

    /// OTP echoed by the server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub otp: Option<String>,

    /// Nonce echoed by the server.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,

    /// Percentage of sync servers that answered (`sl`, 0-100).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sl: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,

    /// Internal key timestamp, only sent when requested.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_counter: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_use: Option<String>,

    /// Host that produced this response.
    pub host: String,

    /// Time from dispatch start until this response completed.
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,

    #[serde(skip)]
    pub input_otp: Option<String>,

    #[serde(skip)]
    pub input_nonce: Option<String>,
}

impl ValidationResponse {
    /// Build a response from parsed fields. Unrecognised keys are ignored.
    pub fn from_fields(
        fields: &BTreeMap<String, String>,
        host: impl Into<String>,
        elapsed: Duration,
    ) -> Self {
        let mut response = Self {
            host: host.into(),
            elapsed,
            ..Self::default()
        };

        for (key, value) in fields {
            let value = Some(value.clone());
            match key.as_str() {
                "h" => response.hash = value,
                "t" => response.t = value,
                "otp" => response.otp = value,
                "nonce" => response.nonce = value,
                "sl" => response.sl = value,
                "status" => response.status = value.as_deref().map(Status::parse),
                "timestamp" => response.timestamp = value,
                "sessioncounter" => response.session_counter = value,
                "sessionuse" => response.session_use = value,
                _ => {}
            }
        }

        response
    }

    /// Parse a raw response body.
    pub fn parse(raw: &str, host: impl Into<String>, elapsed: Duration) -> Self {
        Self::from_fields(&wire::parse(raw), host, elapsed)
    }

    /// Attach the OTP and nonce that were sent, for the success check.
    pub fn set_input(&mut self, otp: impl Into<String>, nonce: impl Into<String>) {
        self.input_otp = Some(otp.into());
        self.input_nonce = Some(nonce.into());
    }

    /// Builder form of [`set_input`](Self::set_input).
    pub fn with_input(mut self, otp: impl Into<String>, nonce: impl Into<String>) -> Self {
        self.set_input(otp, nonce);
        self
    }

    /// Whether this response validates the OTP that was sent.
    ///
    /// Requires the inputs to be attached and echoed back exactly, and an
    /// `OK` status.
    pub fn success(&self) -> bool {
        let (Some(input_otp), Some(input_nonce)) = (&self.input_otp, &self.input_nonce) else {
            return false;
        };

        self.otp.as_ref() == Some(input_otp)
            && self.nonce.as_ref() == Some(input_nonce)
            && self.status == Some(Status::Ok)
    }

    pub fn is_status(&self, status: &Status) -> bool {
        self.status.as_ref() == Some(status)
    }

    /// Fields covered by the server signature that this response carries.
    pub fn signed_fields(&self) -> BTreeMap<String, String> {
        RESPONSE_SIGNED_FIELDS
            .iter()
            .filter_map(|&name| self.signed_field(name).map(|v| (name.to_string(), v)))
            .collect()
    }

    fn signed_field(&self, name: &str) -> Option<String> {
        match name {
            "nonce" => self.nonce.clone(),
            "otp" => self.otp.clone(),
            "sessioncounter" => self.session_counter.clone(),
            "sessionuse" => self.session_use.clone(),
            "sl" => self.sl.clone(),
            "status" => self.status.as_ref().map(|s| s.as_str().to_string()),
            "t" => self.t.clone(),
            "timestamp" => self.timestamp.clone(),
            _ => None,
        }
    }

    /// Sync level as a percentage, if present and in range.
    pub fn sync_level(&self) -> Option<u8> {
        self.sl
            .as_deref()
            .and_then(|sl| sl.parse::<u8>().ok())
            .filter(|sl| *sl <= 100)
    }

    /// Server time parsed from `t` (`YYYY-MM-DDTHH:MM:SSZ` plus milliseconds).
    pub fn server_time(&self) -> Option<DateTime<Utc>> {
        let t = self.t.as_deref()?;
        let (stamp, millis) = t.split_once('Z')?;
        let naive = NaiveDateTime::parse_from_str(stamp, "%Y-%m-%dT%H:%M:%S").ok()?;
        let millis: i64 = if millis.is_empty() { 0 } else { millis.parse().ok()? };
        Some(naive.and_utc() + chrono::Duration::milliseconds(millis))
    }
}

/// Public identity prefix of an OTP: everything before the final 32
/// characters. Safe to log, unlike the full OTP.
pub fn public_id(otp: &str) -> &str {
    let end = otp.len().saturating_sub(32);
    otp.get(..end).unwrap_or("")
}

fn serialize_millis<S: Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(elapsed.as_millis() as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    const OTP: &str = "cccccccbcjdifctrndncchkftchjlnbhvhtugdljibej";

    fn ok_body(otp: &str, nonce: &str) -> String {
        format!(
            "h=abc=\nt=2024-01-01T12:00:00Z0123\notp={}\nnonce={}\nsl=100\nstatus=OK\n",
            otp, nonce
        )
    }

    #[test]
    fn test_status_round_trip() {
        for text in [
            "OK",
            "REPLAYED_OTP",
            "REPLAYED_REQUEST",
            "MISSING_PARAMETER",
            "NO_SUCH_CLIENT",
            "BAD_OTP",
            "BAD_SIGNATURE",
            "OPERATION_NOT_ALLOWED",
            "BACKEND_ERROR",
            "NOT_ENOUGH_ANSWERS",
        ] {
            let status = Status::parse(text);
            assert!(!matches!(status, Status::Unknown(_)), "{text}");
            assert_eq!(status.as_str(), text);
        }
        assert_eq!(Status::parse("WHATEVER"), Status::Unknown("WHATEVER".to_string()));
    }

    #[test]
    fn test_parse_fields() {
        let response = ValidationResponse::parse(
            &ok_body(OTP, "n1"),
            "api.yubico.com",
            Duration::from_millis(40),
        );
        assert_eq!(response.hash.as_deref(), Some("abc="));
        assert_eq!(response.otp.as_deref(), Some(OTP));
        assert_eq!(response.nonce.as_deref(), Some("n1"));
        assert_eq!(response.status, Some(Status::Ok));
        assert_eq!(response.sync_level(), Some(100));
        assert_eq!(response.host, "api.yubico.com");
        assert_eq!(response.elapsed, Duration::from_millis(40));
    }

    #[test]
    fn test_success_requires_inputs() {
        let response = ValidationResponse::parse(&ok_body(OTP, "n1"), "h", Duration::ZERO);
        assert!(!response.success());
        assert!(response.clone().with_input(OTP, "n1").success());
    }

    #[test]
    fn test_success_requires_exact_echo_and_ok() {
        let response = ValidationResponse::parse(&ok_body(OTP, "n1"), "h", Duration::ZERO);
        assert!(!response.clone().with_input(OTP, "n2").success());
        assert!(!response.clone().with_input("other", "n1").success());

        let replayed = ValidationResponse::parse(
            &ok_body(OTP, "n1").replace("status=OK", "status=REPLAYED_OTP"),
            "h",
            Duration::ZERO,
        )
        .with_input(OTP, "n1");
        assert!(!replayed.success());
        assert!(replayed.is_status(&Status::ReplayedOtp));
    }

    #[test]
    fn test_signed_fields_skip_absent_and_hash() {
        let response = ValidationResponse::parse("h=x\notp=o\nstatus=OK\nextra=1\n", "h", Duration::ZERO);
        let fields = response.signed_fields();
        assert_eq!(fields.len(), 2);
        assert_eq!(fields["otp"], "o");
        assert_eq!(fields["status"], "OK");
    }

    #[test]
    fn test_signed_fields_cover_every_signed_name() {
        let body = "h=x\nt=2024-01-01T12:00:00Z0123\notp=o\nnonce=n\nsl=50\nstatus=OK\n\
                    timestamp=1\nsessioncounter=3\nsessionuse=4\n";
        let fields = ValidationResponse::parse(body, "h", Duration::ZERO).signed_fields();
        let names: Vec<&str> = fields.keys().map(String::as_str).collect();
        assert_eq!(names, RESPONSE_SIGNED_FIELDS);
    }

    #[test]
    fn test_server_time() {
        let response = ValidationResponse::parse(&ok_body(OTP, "n"), "h", Duration::ZERO);
        let time = response.server_time().unwrap();
        assert_eq!(time.to_rfc3339(), "2024-01-01T12:00:00.123+00:00");
    }

    #[test]
    fn test_sync_level_out_of_range() {
        let response = ValidationResponse::parse("sl=250\n", "h", Duration::ZERO);
        assert_eq!(response.sync_level(), None);
    }

    #[test]
    fn test_public_id() {
        assert_eq!(public_id(OTP), "cccccccbcjdi");
        assert_eq!(public_id(&"c".repeat(32)), "");
    }

    #[test]
    fn test_serialization() {
        let response = ValidationResponse::parse(&ok_body(OTP, "n"), "h", Duration::from_millis(7))
            .with_input(OTP, "n");
        let json = serde_json::to_string(&response).unwrap();
        assert!(json.contains("\"status\":\"OK\""));
        assert!(json.contains("\"elapsed_ms\":7"));
        assert!(!json.contains("input_otp"));
    }
}
