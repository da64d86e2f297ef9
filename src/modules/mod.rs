//! Modules layer - Infrastructure components
//!
//! Contains adapters for resources outside the database, like file storage.

pub mod storage;
