//! Encrypted sync blob relay.
//!
//! Clients upload the sealed export produced by `LocalStore::export_data_for_sync`
//! under their user hash and download it on another device. The relay stores
//! the blob verbatim and cannot decrypt it.

pub mod api;
pub mod store;

pub use store::BlobStore;
