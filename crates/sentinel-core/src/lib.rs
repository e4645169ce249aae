pub mod error;
pub mod patterns;
pub mod project;
pub mod types;

pub use error::SentinelError;
pub use types::{Domain, EventKind, Tier};
