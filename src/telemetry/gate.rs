use time::Date;

use crate::telemetry::types::ActiveWindow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Active,
    StartsLater,
    Ended,
}

impl GateDecision {
    pub fn reason(self) -> Option<&'static str> {
        match self {
            GateDecision::Active => None,
            GateDecision::StartsLater => Some("starts_later"),
            GateDecision::Ended => Some("ended"),
        }
    }
}

/// Both bounds are inclusive. The start bound is checked first, so an
/// inverted window reports `StartsLater` until its start date passes.
pub fn evaluate(window: &ActiveWindow, today: Date) -> GateDecision {
    if window.start.is_some_and(|start| today < start) {
        return GateDecision::StartsLater;
    }
    if window.end.is_some_and(|end| today > end) {
        return GateDecision::Ended;
    }
    GateDecision::Active
}

pub fn is_active(window: &ActiveWindow, today: Date) -> bool {
    evaluate(window, today) == GateDecision::Active
}
