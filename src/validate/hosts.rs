//! Validation host pool.

use crate::error::{ConfigErrorKind, ValidateError, ValidateResult};

/// Public Yubico validation hosts.
pub const DEFAULT_HOSTS: [&str; 5] = [
    "api.yubico.com",
    "api2.yubico.com",
    "api3.yubico.com",
    "api4.yubico.com",
    "api5.yubico.com",
];

/// Ordered, non-empty set of validation hostnames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostPool {
    hosts: Vec<String>,
}

impl HostPool {
    /// Create a pool from hostnames (optionally with `:port`).
    ///
    /// Later duplicates are dropped; first-seen order is kept.
    pub fn new<I, S>(hosts: I) -> ValidateResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for host in hosts {
            let host = check_host(host.into())?;
            if !unique.contains(&host) {
                unique.push(host);
            }
        }
        let hosts = unique;

        if hosts.is_empty() {
            return Err(ValidateError::config(ConfigErrorKind::Invalid {
                message: "Host pool cannot be empty".to_string(),
            }));
        }

        Ok(Self { hosts })
    }

    /// Append a host. Duplicates are ignored.
    pub fn add(&mut self, host: impl Into<String>) -> ValidateResult<()> {
        let host = check_host(host.into())?;
        if !self.hosts.contains(&host) {
            self.hosts.push(host);
        }
        Ok(())
    }

    /// Replace all hosts. The pool is left unchanged on error.
    pub fn replace<I, S>(&mut self, hosts: I) -> ValidateResult<()>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        *self = Self::new(hosts)?;
        Ok(())
    }

    pub fn hosts(&self) -> &[String] {
        &self.hosts
    }

    pub fn first(&self) -> &str {
        &self.hosts[0]
    }

    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

impl Default for HostPool {
    fn default() -> Self {
        Self {
            hosts: DEFAULT_HOSTS.iter().map(|h| h.to_string()).collect(),
        }
    }
}

pub(crate) fn check_host(host: String) -> ValidateResult<String> {
    let trimmed = host.trim();
    let valid = !trimmed.is_empty()
        && !trimmed
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '/' | '?' | '#' | '@'));

    if !valid {
        return Err(ValidateError::config(ConfigErrorKind::InvalidHost { host }));
    }
    Ok(trimmed.to_string())
}
