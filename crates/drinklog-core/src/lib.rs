pub mod backup;
pub mod buckets;
pub mod config;
pub mod error;
pub mod persist;
pub mod record;
pub mod session;
pub mod stats;
pub mod store;
pub mod transfer;

pub use error::RecordError;
pub use record::{DrinkRecord, RecordInput};
pub use session::Session;
