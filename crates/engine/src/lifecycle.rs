//! Status transition rules
//!
//! Statuses advance Draft → Development → Stable → Deprecated → Archived and
//! never move backward. Lock state is orthogonal and enforced at the store
//! boundary, where the version being mutated is at hand.

use crate::error::{EngineError, Result};
use crate::model::{Version, VersionStatus};

/// Validate a status transition on the given version
///
/// Rules:
/// - a locked version cannot change status (`Immutable`)
/// - the current version cannot be archived in place (`Immutable`)
/// - backward moves are rejected (`Validation`)
/// - re-applying the same status is a no-op and allowed
pub(crate) fn validate_transition(version: &Version, to: VersionStatus) -> Result<()> {
    if version.is_locked() {
        return Err(EngineError::immutable(format!(
            "version {} is locked",
            version.id
        )));
    }

    if to == VersionStatus::Archived && version.is_current {
        return Err(EngineError::immutable(format!(
            "version {} is current and cannot be archived",
            version.id
        )));
    }

    if to < version.status {
        return Err(EngineError::validation(format!(
            "cannot move status backward from {} to {}",
            version.status, to
        )));
    }

    Ok(())
}
