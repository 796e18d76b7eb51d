//! Shared helpers for integration tests.

#![allow(dead_code)]

use std::collections::BTreeMap;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use yubikey_validate::auth::sign;
use yubikey_validate::transport::{FetchedBody, Transport};

pub const API_KEY: &str = "dGVzdGluZzEyMzQ1Njc4OTA=";
pub const SECRET: &[u8] = b"testing1234567890";
pub const CLIENT_ID: &str = "12345";
pub const OTP: &str = "cccccccccccccccccccccccccccccccc";

/// How a stub host answers.
#[derive(Debug, Clone)]
pub enum Reply {
    /// Signed response with this status, echoing otp and nonce.
    Status(&'static str),
    /// Signed OK response echoing a different nonce.
    WrongNonce,
    /// OK response with a signature made with the wrong key.
    BadSignature,
    /// OK response with no `h` field.
    Unsigned,
    /// Transport failure.
    Drop,
}

/// Query parameters of a verification URL.
pub fn query_params(url: &str) -> BTreeMap<String, String> {
    let query = url.split_once('?').map(|(_, q)| q).unwrap_or("");
    yubikey_validate::protocol::parse(&query.replace('&', "\n"))
}

/// Build the body a validation server would send for `request_url`.
pub fn reply_body(request_url: &str, reply: &Reply) -> Option<String> {
    let request = query_params(request_url);
    let (status, nonce, key): (&str, String, &[u8]) = match reply {
        Reply::Status(status) => (*status, request["nonce"].clone(), SECRET),
        Reply::WrongNonce => ("OK", "f".repeat(32), SECRET),
        Reply::BadSignature => ("OK", request["nonce"].clone(), b"wrong-key".as_slice()),
        Reply::Unsigned => ("OK", request["nonce"].clone(), SECRET),
        Reply::Drop => return None,
    };

    let mut fields = BTreeMap::from([
        ("t".to_string(), "2024-01-01T12:00:00Z0123".to_string()),
        ("otp".to_string(), request["otp"].clone()),
        ("nonce".to_string(), nonce),
        ("sl".to_string(), "100".to_string()),
        ("status".to_string(), status.to_string()),
    ]);

    if !matches!(reply, Reply::Unsigned) {
        // Servers send plain base64, without the %2B escape
        let h = sign(&fields, key).ok()?.replace("%2B", "+");
        fields.insert("h".to_string(), h);
    }

    let mut body: String = fields.iter().map(|(k, v)| format!("{}={}\r\n", k, v)).collect();
    body.push_str("\r\n");
    Some(body)
}

/// Transport stub that answers each host according to a script and
/// records every batch it was asked to fetch.
pub struct ScriptedTransport {
    replies: Vec<(&'static str, Reply, u64)>,
    default: Reply,
    pub batches: Mutex<Vec<Vec<String>>>,
}

impl ScriptedTransport {
    pub fn new(default: Reply) -> Self {
        Self {
            replies: Vec::new(),
            default,
            batches: Mutex::new(Vec::new()),
        }
    }

    /// Script the reply of `host`, completing after `elapsed_ms`.
    pub fn host(mut self, host: &'static str, reply: Reply, elapsed_ms: u64) -> Self {
        self.replies.push((host, reply, elapsed_ms));
        self
    }

    pub fn call_count(&self) -> usize {
        self.batches.lock().unwrap().len()
    }

    pub fn urls(&self) -> Vec<String> {
        self.batches.lock().unwrap().concat()
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn fetch_all(&self, urls: &[String]) -> Vec<FetchedBody> {
        self.batches.lock().unwrap().push(urls.to_vec());

        urls.iter()
            .filter_map(|url| {
                let (reply, elapsed_ms) = self
                    .replies
                    .iter()
                    .find(|(host, _, _)| url.contains(&format!("://{}/", host)))
                    .map(|(_, reply, ms)| (reply.clone(), *ms))
                    .unwrap_or((self.default.clone(), 10));

                reply_body(url, &reply).map(|body| FetchedBody {
                    url: url.clone(),
                    body,
                    elapsed: Duration::from_millis(elapsed_ms),
                })
            })
            .collect()
    }
}
