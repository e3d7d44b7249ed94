//! Fire-and-forget wizard telemetry.

use serde::Serialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::TelemetryError;

/// Direction of a step transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Forward,
    Backward,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Forward => write!(f, "next"),
            Self::Backward => write!(f, "previous"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TelemetryEvent {
    /// A step passed validation and was committed. `step` is zero-based.
    StepCompleted { step: usize },
    StepNavigated {
        from: usize,
        to: usize,
        direction: Direction,
    },
    /// The final step was committed and the record handed to submission.
    FormCompleted,
}

pub trait TelemetrySink: Send + Sync {
    fn emit(&self, event: &TelemetryEvent) -> Result<(), TelemetryError>;
}

/// Emit an event, ignoring sink failures.
pub fn report(sink: &dyn TelemetrySink, event: TelemetryEvent) {
    if let Err(e) = sink.emit(&event) {
        debug!(error = %e, ?event, "Telemetry event dropped");
    }
}

/// Writes events to the tracing log, tagged with a per-session id.
pub struct TracingTelemetry {
    session_id: Uuid,
}

impl TracingTelemetry {
    pub fn new() -> Self {
        Self {
            session_id: Uuid::new_v4(),
        }
    }
}

impl Default for TracingTelemetry {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetrySink for TracingTelemetry {
    fn emit(&self, event: &TelemetryEvent) -> Result<(), TelemetryError> {
        match event {
            TelemetryEvent::StepCompleted { step } => {
                info!(session = %self.session_id, step = step + 1, "Step completed");
            }
            TelemetryEvent::StepNavigated {
                from,
                to,
                direction,
            } => {
                info!(
                    session = %self.session_id,
                    from = from + 1,
                    to = to + 1,
                    %direction,
                    "Step navigated"
                );
            }
            TelemetryEvent::FormCompleted => {
                info!(session = %self.session_id, "Form completed");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct BrokenSink;

    impl TelemetrySink for BrokenSink {
        fn emit(&self, _event: &TelemetryEvent) -> Result<(), TelemetryError> {
            Err(TelemetryError {
                sink: "broken".into(),
                reason: "offline".into(),
            })
        }
    }

    #[test]
    fn report_swallows_failures() {
        report(&BrokenSink, TelemetryEvent::FormCompleted);
        report(&TracingTelemetry::new(), TelemetryEvent::StepCompleted { step: 0 });
    }

    #[test]
    fn event_serialization() {
        let json = serde_json::to_value(TelemetryEvent::StepNavigated {
            from: 1,
            to: 0,
            direction: Direction::Backward,
        })
        .unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "event": "step_navigated",
                "from": 1,
                "to": 0,
                "direction": "backward"
            })
        );
    }
}
