pub mod errors;
pub mod runner;
pub mod store;
pub mod types;

// Re-export main interfaces
pub use errors::ServiceError;
pub use runner::BacktestRunner;
pub use store::{format_result_line, QualifyingTickerStore};
pub use types::*;
