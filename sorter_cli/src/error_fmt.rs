//! Human-readable error descriptions, exit codes, and structured JSON errors.

use sorter_core::error::{
    ArgumentError, BindError, BuildError, LifecycleError, NotReadyReason, ResolveError,
};

/// A self-check ran to completion and found a problem.
#[derive(Debug, thiserror::Error)]
pub enum CheckFailed {
    #[error("ring cart count mismatch: expected {expected} carts, detected {detected}")]
    RingMismatch { expected: i32, detected: i32 },
    #[error("chute mapping self-check failed for {failed} of {total} chutes")]
    ChuteMapping { failed: usize, total: usize },
}

fn find<E: std::error::Error + 'static>(err: &eyre::Report) -> Option<&E> {
    err.chain().find_map(|e| e.downcast_ref::<E>())
}

/// The resolution failure behind an error, whether it came from the
/// resolver directly or through the binder.
fn resolve_error(err: &eyre::Report) -> Option<ResolveError> {
    find::<ResolveError>(err)
        .copied()
        .or_else(|| find::<BindError>(err).and_then(|b| b.resolve_error().copied()))
}

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(cf) = find::<CheckFailed>(err) {
        return match cf {
            CheckFailed::RingMismatch { expected, detected } => format!(
                "What happened: The ring reports {detected} carts but {expected} are locked in.\nLikely causes: A missed or doubled origin sensor read, a cart added or removed, or a recording shorter than one rotation.\nHow to fix: Inspect the origin sensor and the ring. If the ring really changed, relock the cart count; otherwise record a longer run and retry."
            ),
            CheckFailed::ChuteMapping { failed, total } => format!(
                "What happened: {failed} of {total} chutes do not line up with the cart the geometry predicts.\nLikely causes: Wrong cart_number_at_head_one calibration, or wrong chute_width_mm / cart_spacing_mm in [topology].\nHow to fix: Re-calibrate the failing chutes (see the per-chute report) or correct the layout."
            ),
        };
    }

    if let Some(re) = resolve_error(err) {
        return match re {
            ResolveError::NotReady(NotReadyReason::CartCountNotLocked) => {
                "What happened: The ring cart count is not locked yet.\nLikely causes: No ring self-check has completed on this machine, or the ring state file is missing.\nHow to fix: Record origin passes for at least one full rotation and run `sorter ring-check --events <FILE>`.".to_string()
            }
            ResolveError::NotReady(NotReadyReason::HeadPositionNotReady) => {
                "What happened: The head cart position is not known yet.\nLikely causes: No cart has passed the origin sensor since start.\nHow to fix: Run the belt until the origin sensor fires, then retry.".to_string()
            }
            ResolveError::NotFound(reason) => format!(
                "What happened: {reason}.\nLikely causes: The chute is missing from [[chutes]] and from the calibration CSV.\nHow to fix: Add the chute with its cart_number_at_head_one and rerun."
            ),
            ResolveError::Invalid(reason) => format!(
                "What happened: {reason}.\nLikely causes: Chute calibration taken on a different ring length, or a relock without re-homing the head.\nHow to fix: Re-calibrate the chute against the locked ring, then rerun."
            ),
        };
    }

    if let Some(ae) = find::<ArgumentError>(err) {
        return format!(
            "What happened: Invalid input ({ae}).\nLikely causes: A missing or out-of-range value on the command line or in the config.\nHow to fix: Correct the value and rerun."
        );
    }

    if let Some(LifecycleError::Persistence(src)) = find::<LifecycleError>(err) {
        return format!(
            "What happened: The ring configuration could not be read or written ({src}).\nLikely causes: Missing directory, no write permission, or a corrupt state file.\nHow to fix: Check [ring].state_file and its directory permissions."
        );
    }

    if let Some(be) = find::<BuildError>(err) {
        return match be {
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Missing or out-of-range values in the TOML.\nHow to fix: Edit the config file, then rerun."
            ),
            other => format!(
                "What happened: The engine could not be assembled ({other}).\nLikely causes: An internal wiring bug.\nHow to fix: Re-run with --log-level=debug and report the output."
            ),
        };
    }

    // String-based heuristics for errors coming from config or CSV loading
    let msg = format!("{err:#}");
    let lower = msg.to_ascii_lowercase();

    if lower.contains("csv must have headers") {
        return format!(
            "What happened: {err}.\nHow to fix: Use the exact header row shown above."
        );
    }

    if lower.contains("invalid configuration") || lower.contains("read config") {
        return format!(
            "What happened: Configuration is invalid or unreadable ({msg}).\nHow to fix: Edit the TOML config and try again."
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable process exit codes: 2 not ready, 3 ring mismatch, 4 invalid
/// input or ring state, 5 chute mapping failed, 1 anything else.
pub fn exit_code_for_error(err: &eyre::Report) -> u8 {
    if let Some(cf) = find::<CheckFailed>(err) {
        return match cf {
            CheckFailed::RingMismatch { .. } => 3,
            CheckFailed::ChuteMapping { .. } => 5,
        };
    }
    if let Some(re) = resolve_error(err) {
        return match re {
            ResolveError::NotReady(_) => 2,
            ResolveError::NotFound(_) | ResolveError::Invalid(_) => 4,
        };
    }
    if find::<ArgumentError>(err).is_some() {
        return 4;
    }
    1
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if let Some(cf) = find::<CheckFailed>(err) {
        return match cf {
            CheckFailed::RingMismatch { .. } => "RingMismatch",
            CheckFailed::ChuteMapping { .. } => "ChuteMappingFailed",
        };
    }
    match resolve_error(err) {
        Some(ResolveError::NotReady(_)) => "NotReady",
        Some(ResolveError::NotFound(_)) => "NotFound",
        Some(ResolveError::Invalid(_)) => "Invalid",
        None if find::<ArgumentError>(err).is_some() => "InvalidArgument",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    use serde_json::json;

    let details = match find::<CheckFailed>(err) {
        Some(CheckFailed::RingMismatch { expected, detected }) => {
            Some(json!({ "expected_cart_count": expected, "detected_cart_count": detected }))
        }
        Some(CheckFailed::ChuteMapping { failed, total }) => {
            Some(json!({ "failed": failed, "total": total }))
        }
        None => resolve_error(err).map(|re| json!({ "error": re.to_string() })),
    };

    let mut obj = json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    });
    if let (Some(d), Some(map)) = (details, obj.as_object_mut()) {
        map.insert("details".to_string(), d);
    }
    obj.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use sorter_core::error::{InvalidReason, NotFoundReason};

    #[test]
    fn exit_codes_are_stable() {
        let not_ready = eyre::Report::new(ResolveError::NotReady(NotReadyReason::CartCountNotLocked));
        assert_eq!(exit_code_for_error(&not_ready), 2);

        let mismatch = eyre::Report::new(CheckFailed::RingMismatch { expected: 10, detected: 8 });
        assert_eq!(exit_code_for_error(&mismatch), 3);

        let invalid = eyre::Report::new(ResolveError::Invalid(InvalidReason::HeadCartOutOfRange {
            head: 12,
            total: 10,
        }));
        assert_eq!(exit_code_for_error(&invalid), 4);

        let chutes = eyre::Report::new(CheckFailed::ChuteMapping { failed: 1, total: 4 });
        assert_eq!(exit_code_for_error(&chutes), 5);

        assert_eq!(exit_code_for_error(&eyre::eyre!("boom")), 1);
    }

    #[test]
    fn bind_errors_map_through_their_source() {
        let err = eyre::Report::new(BindError::CartStateNotReady {
            package_id: "P".into(),
            chute_id: 1,
            source: ResolveError::NotReady(NotReadyReason::HeadPositionNotReady),
        });
        assert_eq!(exit_code_for_error(&err), 2);

        let err = eyre::Report::new(BindError::Unexpected {
            package_id: "P".into(),
            chute_id: 9,
            source: ResolveError::NotFound(NotFoundReason::ChuteNotConfigured { chute_id: 9 }),
        });
        assert_eq!(exit_code_for_error(&err), 4);
        assert!(humanize(&err).contains("chute 9 is not configured"));
    }

    #[test]
    fn json_error_carries_reason_and_details() {
        let err = eyre::Report::new(CheckFailed::RingMismatch { expected: 10, detected: 8 });
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&err)).expect("json");
        assert_eq!(v["reason"], "RingMismatch");
        assert_eq!(v["exit_code"], 3);
        assert_eq!(v["details"]["expected_cart_count"], 10);
        assert_eq!(v["details"]["detected_cart_count"], 8);
    }
}
