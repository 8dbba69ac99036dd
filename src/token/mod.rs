mod claims;
mod state;
mod store;

pub use claims::expiry_epoch_seconds;
pub use state::{TokenPair, TokenState, is_expired, is_expired_at};
pub use store::{MemoryTokenStore, TokenStore};
