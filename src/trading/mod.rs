//! Trading logic: stake sizing and risk gating.

mod safety;
mod stake;

pub use safety::{LockReason, LockState, SafetyGate};
pub use stake::{MasanielloProgress, MasanielloStatus, StrategyEngine};
