mod coordinator;
mod outcome;
mod plan;

pub use coordinator::RetryCoordinator;
pub use outcome::{AttemptFailure, RetryOutcome};
pub use plan::{JitterStrategy, RetryPlan};
