pub mod archive;
pub mod backup;
pub mod catalog;
pub mod error;
pub mod existence;
pub mod naming;
pub mod reader;
pub mod sentinel;
pub mod store;
pub mod types;

pub use archive::Archive;
pub use backup::Backup;
pub use catalog::{BackupCatalog, LATEST};
pub use error::{Error, Result};
pub use existence::CheckExistence;
pub use reader::{ReaderMaker, StoreReaderMaker};
pub use sentinel::BackupSentinel;
pub use store::{ListPage, ObjectInfo, ObjectReader, ObjectStore, StoreType};
pub use types::*;
