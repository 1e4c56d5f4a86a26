//! Work/recovery sequencing.

use crate::model::SessionKind;

/// Kind of the session that follows `finished`.
///
/// `completed_work_sessions` already counts `finished` when it was a work
/// session. Every `recovery_interval`-th work session is followed by a long
/// recovery; an interval of zero never selects one.
pub fn next_kind(
    finished: SessionKind,
    completed_work_sessions: u32,
    recovery_interval: u32,
) -> SessionKind {
    match finished {
        SessionKind::Work => {
            if recovery_interval > 0
                && completed_work_sessions > 0
                && completed_work_sessions % recovery_interval == 0
            {
                SessionKind::LongRecovery
            } else {
                SessionKind::ShortRecovery
            }
        }
        SessionKind::ShortRecovery | SessionKind::LongRecovery => SessionKind::Work,
    }
}
