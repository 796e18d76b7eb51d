//! Response body parsing.

use std::collections::BTreeMap;

/// Parse a `key=value` response body.
///
/// Lines are split on the first `=`. Lines without a value are skipped, since
/// the servers send blank trailer lines. Unknown keys are kept.
pub fn parse(raw: &str) -> BTreeMap<String, String> {
    raw.split('\n')
        .filter_map(|line| {
            let (key, value) = line.split_once('=')?;
            let (key, value) = (key.trim(), value.trim());
            if key.is_empty() || value.is_empty() {
                return None;
            }
            Some((key.to_string(), value.to_string()))
        })
        .collect()
}
