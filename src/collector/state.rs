use std::fmt;

use thiserror::Error;

use crate::models::RunReport;

/// Lifecycle of a collector within one invocation.
///
/// ```text
/// Idle ──begin──▶ AwaitingResult ──valid payload──▶ Delivered ──close──▶ Closed
///                   │    ▲
///                   └────┘ malformed payload (rejected, keep waiting)
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CollectorState {
    /// Bound to a port, not yet expecting data.
    #[default]
    Idle,
    /// Waiting for exactly one delivery.
    AwaitingResult,
    Delivered,
    Closed,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DeliveryRejection {
    #[error("collector is not awaiting a result")]
    NotAwaiting,

    #[error("a result has already been delivered")]
    AlreadyDelivered,

    #[error("collector is closed")]
    Closed,

    #[error("malformed report payload: {0}")]
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("collector cannot move from {from} to {to}")]
pub struct InvalidTransition {
    pub from: CollectorState,
    pub to: CollectorState,
}

impl CollectorState {
    pub fn name(&self) -> &'static str {
        match self {
            CollectorState::Idle => "idle",
            CollectorState::AwaitingResult => "awaiting-result",
            CollectorState::Delivered => "delivered",
            CollectorState::Closed => "closed",
        }
    }

    /// `Idle → AwaitingResult`, on invocation start.
    pub fn begin(&mut self) -> Result<(), InvalidTransition> {
        match self {
            CollectorState::Idle => {
                *self = CollectorState::AwaitingResult;
                Ok(())
            }
            other => Err(InvalidTransition {
                from: *other,
                to: CollectorState::AwaitingResult,
            }),
        }
    }

    /// Handle one inbound payload. Only a well-formed payload received while
    /// awaiting moves the state; a malformed one leaves it unchanged.
    pub fn deliver(&mut self, payload: &str) -> Result<RunReport, DeliveryRejection> {
        match self {
            CollectorState::AwaitingResult => {
                let report = RunReport::from_json(payload)
                    .map_err(|err| DeliveryRejection::Malformed(err.to_string()))?;
                *self = CollectorState::Delivered;
                Ok(report)
            }
            CollectorState::Idle => Err(DeliveryRejection::NotAwaiting),
            CollectorState::Delivered => Err(DeliveryRejection::AlreadyDelivered),
            CollectorState::Closed => Err(DeliveryRejection::Closed),
        }
    }

    /// Stop accepting deliveries. Valid from any state.
    pub fn close(&mut self) {
        *self = CollectorState::Closed;
    }
}

impl fmt::Display for CollectorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
