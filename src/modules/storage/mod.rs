//! Storage module for uploaded audio
//!
//! Provides a local filesystem store that writes blobs into the public
//! uploads directory and maps them to relative URLs.

mod local_storage;

pub use local_storage::LocalStorage;
