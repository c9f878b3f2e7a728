//! At-rest protection for stored credentials.

pub mod secrets;

pub use secrets::SecretStore;
