pub mod connection;
pub mod execution;
pub mod profile;
pub mod query;
pub mod settings;
