//! Storage module for uploaded blobs
//!
//! Provides the disk-backed blob store the upload and deletion paths
//! write through.

mod disk_store;

pub use disk_store::{DiskStore, StoredBlob};
