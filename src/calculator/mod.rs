//! Calculator service
//!
//! Basic arithmetic over JSON operands, with every successful calculation
//! recorded in a bounded in-memory history.

pub mod engine;
pub mod history;

pub use engine::{calculate, evaluate, Calculation, Evaluation, Operation};
pub use history::{HistoryLedger, HISTORY_CAPACITY};
