// src/storage/encrypted/mod.rs
mod cipher;
mod store;

pub use store::EncryptedStore;
