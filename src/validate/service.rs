//! The OTP check itself.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::{canonical_query, Credentials, NonceGenerator, SignatureCodec};
use crate::config::Settings;
use crate::dispatch::RequestDispatcher;
use crate::error::{ConfigErrorKind, InputErrorKind, ValidateError, ValidateResult};
use crate::protocol::{public_id, Scheme, ValidationRequest, ValidationResponse};
use crate::quorum::{self, QuorumMode};
use crate::transport::{HttpTransport, Transport};

use super::hosts::{check_host, HostPool};

/// Shortest OTP accepted.
pub const MIN_OTP_LENGTH: usize = 32;

/// Longest OTP accepted.
pub const MAX_OTP_LENGTH: usize = 48;

/// Stages of a single check, traced at debug level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CheckState {
    Idle,
    ParamsBuilt,
    Signed,
    Dispatched,
    Verified,
    Done,
    Failed,
}

impl fmt::Display for CheckState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::ParamsBuilt => "params_built",
            Self::Signed => "signed",
            Self::Dispatched => "dispatched",
            Self::Verified => "verified",
            Self::Done => "done",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Outcome of a check.
#[derive(Debug, Clone, Serialize)]
pub struct Verdict {
    /// Correlation ID for this check in the logs.
    pub check_id: Uuid,
    /// Whether the OTP is valid under the quorum mode.
    pub success: bool,
    pub mode: QuorumMode,
    /// Number of hosts the request was sent to.
    pub requested: usize,
    /// Responses whose server signature was valid.
    pub responses: Vec<ValidationResponse>,
    /// Responses discarded because their signature did not verify.
    pub rejected_signatures: usize,
}

/// Validates OTPs against a pool of validation hosts.
pub struct ValidationService {
    credentials: Credentials,
    hosts: HostPool,
    host: Option<String>,
    scheme: Scheme,
    mode: QuorumMode,
    dispatcher: RequestDispatcher,
    nonces: NonceGenerator,
}

impl ValidationService {
    /// Create a service using the default hosts over https.
    pub fn new(credentials: Credentials, transport: Arc<dyn Transport>) -> Self {
        Self {
            credentials,
            hosts: HostPool::default(),
            host: None,
            scheme: Scheme::Https,
            mode: QuorumMode::default(),
            dispatcher: RequestDispatcher::new(transport),
            nonces: NonceGenerator::new(),
        }
    }

    /// Create a service with an HTTP transport from settings.
    pub fn from_settings(settings: &Settings) -> ValidateResult<Self> {
        let transport = Arc::new(HttpTransport::new(&settings.transport)?);
        let mut service = Self::new(settings.credentials()?, transport)
            .with_hosts(settings.host_pool()?)
            .with_mode(settings.quorum.mode);
        service.set_use_secure(settings.transport.secure);
        Ok(service)
    }

    pub fn with_hosts(mut self, hosts: HostPool) -> Self {
        self.hosts = hosts;
        self
    }

    pub fn with_mode(mut self, mode: QuorumMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> QuorumMode {
        self.mode
    }

    pub fn set_mode(&mut self, mode: QuorumMode) {
        self.mode = mode;
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    pub fn credentials_mut(&mut self) -> &mut Credentials {
        &mut self.credentials
    }

    /// Whether requests go over https.
    pub fn use_secure(&self) -> bool {
        self.scheme == Scheme::Https
    }

    pub fn set_use_secure(&mut self, secure: bool) {
        self.scheme = Scheme::from_secure(secure);
    }

    pub fn hosts(&self) -> &HostPool {
        &self.hosts
    }

    pub fn add_host(&mut self, host: impl Into<String>) -> ValidateResult<()> {
        self.hosts.add(host)
    }

    pub fn set_hosts<I, S>(&mut self, hosts: I) -> ValidateResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.hosts.replace(hosts)
    }

    /// Host used for single-host checks: the pinned host, or the first in
    /// the pool.
    pub fn host(&self) -> &str {
        self.host.as_deref().unwrap_or_else(|| self.hosts.first())
    }

    /// Pin the host used for single-host checks.
    pub fn set_host(&mut self, host: impl Into<String>) -> ValidateResult<()> {
        self.host = Some(check_host(host.into())?);
        Ok(())
    }

    /// Check an OTP against one host, or every host when `multi_host` is set.
    ///
    /// Errors are reserved for problems that stop the check before any
    /// request is sent. A rejected OTP, unreachable hosts or bad server
    /// signatures all end in `Verdict { success: false, .. }`.
    pub async fn check(&self, otp: &str, multi_host: bool) -> ValidateResult<Verdict> {
        let check_id = Uuid::new_v4();
        trace_state(check_id, CheckState::Idle);

        let result = self.run_check(check_id, otp, multi_host).await;
        if let Err(e) = &result {
            trace_state(check_id, CheckState::Failed);
            debug!(check_id = %check_id, error = %e, "Check aborted");
        }
        result
    }

    async fn run_check(
        &self,
        check_id: Uuid,
        otp: &str,
        multi_host: bool,
    ) -> ValidateResult<Verdict> {
        let otp = otp.trim();
        if !(MIN_OTP_LENGTH..=MAX_OTP_LENGTH).contains(&otp.len()) {
            return Err(ValidateError::Input {
                kind: InputErrorKind::InvalidOtpLength { length: otp.len() },
            });
        }

        let client_id = self.credentials.client_id();
        if client_id.is_empty() {
            return Err(ValidateError::config(ConfigErrorKind::MissingClientId));
        }

        let codec = SignatureCodec::new(self.credentials.api_key())?;

        let nonce = self.nonces.generate();
        let params = request_params(client_id, otp, &nonce);
        trace_state(check_id, CheckState::ParamsBuilt);

        let signature = codec.sign(&params);
        let query = canonical_query(&params);
        trace_state(check_id, CheckState::Signed);

        let targets: Vec<&str> = if multi_host {
            self.hosts.hosts().iter().map(String::as_str).collect()
        } else {
            vec![self.host()]
        };
        let requests = targets
            .iter()
            .map(|host| ValidationRequest::verify(self.scheme, host, &query, &signature))
            .collect::<ValidateResult<Vec<_>>>()?;

        info!(
            check_id = %check_id,
            public_id = %public_id(otp),
            hosts = requests.len(),
            mode = ?self.mode,
            "Validating OTP"
        );

        let mut responses = self.dispatcher.dispatch(&requests).await;
        for response in &mut responses {
            response.set_input(otp, nonce.as_str());
        }
        trace_state(check_id, CheckState::Dispatched);

        let received = responses.len();
        responses.retain(|response| {
            let valid = codec.verify_response(response);
            if !valid {
                warn!(
                    check_id = %check_id,
                    host = %response.host,
                    "Response signature mismatch, discarding response"
                );
            }
            valid
        });
        let rejected_signatures = received - responses.len();
        trace_state(check_id, CheckState::Verified);

        let success = quorum::evaluate(&responses, self.mode);
        trace_state(check_id, CheckState::Done);

        info!(
            check_id = %check_id,
            success,
            requested = requests.len(),
            received,
            rejected_signatures,
            "Check complete"
        );

        Ok(Verdict {
            check_id,
            success,
            mode: self.mode,
            requested: requests.len(),
            responses,
            rejected_signatures,
        })
    }
}

/// Request parameters, sorted by key.
fn request_params(client_id: &str, otp: &str, nonce: &str) -> BTreeMap<String, String> {
    BTreeMap::from([
        ("id".to_string(), client_id.to_string()),
        ("nonce".to_string(), nonce.to_string()),
        ("otp".to_string(), otp.to_string()),
        ("timestamp".to_string(), "1".to_string()),
    ])
}

fn trace_state(check_id: Uuid, state: CheckState) {
    debug!(check_id = %check_id, state = %state, "Check state");
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use std::time::Duration;

    use async_trait::async_trait;

    use crate::auth::sign;
    use crate::transport::FetchedBody;

    const API_KEY: &str = "dGVzdGluZzEyMzQ1Njc4OTA=";
    const OTP: &str = "cccccccccccccccccccccccccccccccc";

    /// Echoes the request back as a signed OK response.
    struct EchoTransport {
        key: Vec<u8>,
        urls: Mutex<Vec<String>>,
    }

    impl EchoTransport {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                key: b"testing1234567890".to_vec(),
                urls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl Transport for EchoTransport {
        async fn fetch_all(&self, urls: &[String]) -> Vec<FetchedBody> {
            self.urls.lock().unwrap().extend(urls.iter().cloned());
            urls.iter()
                .map(|url| {
                    let query = url.split_once('?').unwrap().1;
                    let request = crate::protocol::parse(&query.replace('&', "\n"));
                    let mut fields = BTreeMap::from([
                        ("otp".to_string(), request["otp"].clone()),
                        ("nonce".to_string(), request["nonce"].clone()),
                        ("status".to_string(), "OK".to_string()),
                    ]);
                    let h = sign(&fields, &self.key).unwrap().replace("%2B", "+");
                    fields.insert("h".to_string(), h);
                    let body = fields
                        .iter()
                        .map(|(k, v)| format!("{}={}", k, v))
                        .collect::<Vec<_>>()
                        .join("\n");
                    FetchedBody {
                        url: url.clone(),
                        body,
                        elapsed: Duration::from_millis(5),
                    }
                })
                .collect()
        }
    }

    fn service(transport: Arc<EchoTransport>) -> ValidationService {
        ValidationService::new(Credentials::new(API_KEY, "12345").unwrap(), transport)
    }

    #[tokio::test]
    async fn test_single_host_check() {
        let transport = EchoTransport::new();
        let verdict = service(transport.clone()).check(OTP, false).await.unwrap();

        assert!(verdict.success);
        assert_eq!(verdict.requested, 1);
        assert_eq!(verdict.rejected_signatures, 0);

        let urls = transport.urls.lock().unwrap();
        assert_eq!(urls.len(), 1);
        assert!(urls[0].starts_with("https://api.yubico.com/wsapi/2.0/verify?id=12345&nonce="));
        assert!(urls[0].contains("&timestamp=1&h="));
    }

    #[tokio::test]
    async fn test_multi_host_check() {
        let transport = EchoTransport::new();
        let verdict = service(transport.clone()).check(OTP, true).await.unwrap();

        assert!(verdict.success);
        assert_eq!(verdict.responses.len(), 5);
        assert_eq!(transport.urls.lock().unwrap().len(), 5);
    }

    #[tokio::test]
    async fn test_pinned_host_and_http() {
        let transport = EchoTransport::new();
        let mut service = service(transport.clone());
        service.set_host("localhost:8080").unwrap();
        service.set_use_secure(false);

        service.check(OTP, false).await.unwrap();

        let urls = transport.urls.lock().unwrap();
        assert!(urls[0].starts_with("http://localhost:8080/wsapi/2.0/verify?"));
    }

    #[tokio::test]
    async fn test_otp_is_trimmed() {
        let transport = EchoTransport::new();
        let verdict = service(transport).check(&format!("  {}\n", OTP), false).await.unwrap();
        assert!(verdict.success);
    }

    #[tokio::test]
    async fn test_fatal_errors_before_dispatch() {
        let transport = EchoTransport::new();
        let mut service = service(transport.clone());

        assert!(matches!(
            service.check(&"c".repeat(31), false).await,
            Err(ValidateError::Input { .. })
        ));
        assert!(matches!(
            service.check(&"c".repeat(49), false).await,
            Err(ValidateError::Input { .. })
        ));

        service.credentials_mut().set_client_id("");
        assert!(matches!(
            service.check(OTP, false).await,
            Err(ValidateError::Config {
                kind: ConfigErrorKind::MissingClientId
            })
        ));

        service.credentials_mut().set_client_id("1");
        service.credentials_mut().set_api_key("").unwrap();
        assert!(matches!(
            service.check(OTP, false).await,
            Err(ValidateError::Auth { .. })
        ));

        assert!(transport.urls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_request_params_sorted() {
        let params = request_params("1", "otp", "nonce");
        let keys: Vec<&str> = params.keys().map(String::as_str).collect();
        assert_eq!(keys, ["id", "nonce", "otp", "timestamp"]);
        assert_eq!(params["timestamp"], "1");
    }
}
