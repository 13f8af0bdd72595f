//! The time-driven attendance engine: background schedulers, device
//! polling, punch normalization, attendance calculation, the approval
//! state machine, and the effective-date transfer sweep.

pub mod adapter;
pub mod approval;
pub mod calculator;
pub mod error;
pub mod normalizer;
pub mod poller;
pub mod scheduler;
pub mod store;
pub mod transfer;

pub use error::{EngineError, EngineResult};
