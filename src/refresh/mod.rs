mod coordinator;
mod operation;

pub use coordinator::{AuthFailureHook, RefreshCoordinator};
pub use operation::{HttpRefreshOperation, RefreshOperation};
