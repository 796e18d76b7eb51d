//! Quorum evaluation over host responses.

use serde::{Deserialize, Serialize};

use crate::protocol::{Status, ValidationResponse};

/// How host responses are combined into one verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum QuorumMode {
    /// Every response must succeed, except that `REPLAYED_REQUEST` answers
    /// are tolerated. At least one success is required.
    #[default]
    #[serde(rename = "all")]
    AllMustAgree,

    /// The fastest response decides alone.
    #[serde(rename = "first")]
    AnyFirst,
}

/// Combine `responses` into a single pass/fail verdict.
///
/// An empty response set always fails.
pub fn evaluate(responses: &[ValidationResponse], mode: QuorumMode) -> bool {
    match mode {
        QuorumMode::AllMustAgree => all_must_agree(responses),
        QuorumMode::AnyFirst => responses
            .iter()
            .min_by_key(|r| r.elapsed)
            .is_some_and(ValidationResponse::success),
    }
}

fn all_must_agree(responses: &[ValidationResponse]) -> bool {
    let mut success = false;

    for response in responses {
        // REPLAYED_REQUEST only means another host already recorded this OTP.
        let tolerated = response.is_status(&Status::ReplayedRequest);
        if response.success() {
            success = true;
        } else if !tolerated {
            return false;
        }
    }

    success
}
