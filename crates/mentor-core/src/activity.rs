//! Single-permit admission gate shared by chat sends and feedback submits
//!
//! At most one network operation is outstanding at a time. Acquiring hands out
//! a `Permit` that cannot be cloned; the only way back to `Idle` is to give
//! that permit back, so a release without a matching acquire does not compile.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Chat,
    Feedback,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operation::Chat => f.write_str("chat"),
            Operation::Feedback => f.write_str("feedback"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Activity {
    #[default]
    Idle,
    Busy(Operation),
}

/// Proof that the gate is held for `operation`
#[derive(Debug, PartialEq, Eq)]
#[must_use = "dropping a permit leaves the gate busy; hand it back with ActivityGate::release"]
pub struct Permit {
    operation: Operation,
}

impl Permit {
    pub fn operation(&self) -> Operation {
        self.operation
    }
}

#[derive(Debug, Default)]
pub struct ActivityGate {
    state: Activity,
}

impl ActivityGate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> Activity {
        self.state
    }

    pub fn is_busy(&self) -> bool {
        matches!(self.state, Activity::Busy(_))
    }

    /// Take the gate, or report which operation already holds it.
    pub fn try_acquire(&mut self, operation: Operation) -> Result<Permit, Operation> {
        match self.state {
            Activity::Idle => {
                self.state = Activity::Busy(operation);
                tracing::debug!(%operation, "activity gate acquired");
                Ok(Permit { operation })
            }
            Activity::Busy(current) => Err(current),
        }
    }

    pub fn release(&mut self, permit: Permit) {
        tracing::debug!(operation = %permit.operation, "activity gate released");
        self.state = Activity::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_acquire_then_release() {
        let mut gate = ActivityGate::new();
        let permit = gate.try_acquire(Operation::Chat).unwrap();
        assert_eq!(gate.state(), Activity::Busy(Operation::Chat));
        gate.release(permit);
        assert_eq!(gate.state(), Activity::Idle);
    }

    #[test]
    fn test_second_acquire_rejected() {
        let mut gate = ActivityGate::new();
        let permit = gate.try_acquire(Operation::Feedback).unwrap();
        assert_eq!(gate.try_acquire(Operation::Chat), Err(Operation::Feedback));
        assert_eq!(gate.try_acquire(Operation::Feedback), Err(Operation::Feedback));
        gate.release(permit);
        assert!(gate.try_acquire(Operation::Chat).is_ok());
    }
}
