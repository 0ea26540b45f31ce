pub mod client;
pub mod endpoint;
pub mod error;
pub mod types;

pub use client::{ApiClient, Transport};
pub use endpoint::Endpoint;
pub use error::{RequestError, RequestErrorKind};
pub use types::{Entity, Variable, WorkPool, WorkPoolStatus};
