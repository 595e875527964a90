//! Processing strategies that advance a campaign's cursor

pub mod context;
pub mod continuation;
pub mod processor;
pub mod turbo;
pub mod worker;

pub use context::DispatchServices;
pub use continuation::{ContinuationScheduler, HttpContinuation};
pub use processor::SingleStepProcessor;
pub use turbo::TurboDispatcher;
pub use worker::ContinuousWorker;
