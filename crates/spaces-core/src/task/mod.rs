//! Agent task execution: launching out-of-process runs and polling them.
//!
//! - `TaskBackend`: port implemented by the HTTP adapter in spaces-infra
//! - `TaskLauncher`: starts a run and extracts its handle
//! - `TaskPoller`: the polling state machine (dedup, cadence, cancellation,
//!   terminal detection)

pub mod backend;
pub mod launcher;
pub mod poller;
