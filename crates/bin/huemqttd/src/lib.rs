//! Library half of `huemqttd`: configuration and credential storage, shared by
//! the binary and its integration tests.

pub mod config;
pub mod credentials;
