use std::fmt;

use super::SyncError;

/// Lifecycle of one chromosome scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanState {
    /// No per-chromosome state held.
    Idle,
    /// Records are being consumed.
    Scanning,
    /// Buffered events are being flushed.
    Finalizing,
}

impl ScanState {
    /// Move to `next`, rejecting transitions the lifecycle does not allow.
    ///
    /// `Scanning -> Idle` is the abort path (cancellation, out-of-order
    /// input).
    pub fn transition(self, next: ScanState) -> Result<ScanState, SyncError> {
        use ScanState::*;
        match (self, next) {
            (Idle, Scanning) | (Scanning, Finalizing) | (Finalizing, Idle) | (Scanning, Idle) => {
                Ok(next)
            }
            (from, to) => Err(SyncError::InvalidTransition { from, to }),
        }
    }
}

impl fmt::Display for ScanState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ScanState::Idle => "IDLE",
            ScanState::Scanning => "SCANNING",
            ScanState::Finalizing => "FINALIZING",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lifecycle_round_trip() {
        let state = ScanState::Idle
            .transition(ScanState::Scanning)
            .and_then(|s| s.transition(ScanState::Finalizing))
            .and_then(|s| s.transition(ScanState::Idle))
            .unwrap();
        assert_eq!(state, ScanState::Idle);
    }

    #[test]
    fn cannot_finalize_from_idle() {
        assert!(matches!(
            ScanState::Idle.transition(ScanState::Finalizing),
            Err(SyncError::InvalidTransition {
                from: ScanState::Idle,
                to: ScanState::Finalizing
            })
        ));
    }
}
