pub mod local;
pub mod memory;
pub mod retry;
pub mod s3;

pub use local::LocalStore;
pub use memory::{Failure, MemoryStore};
pub use retry::{retry_with_backoff, RetryConfig, RetryStore, Retryable};
pub use s3::{S3Config, S3Store};
