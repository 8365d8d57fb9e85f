#![cfg_attr(not(test), no_std)]

pub mod acquisition;
pub mod config;
pub mod connectivity;
pub mod control;
pub mod credentials;
pub mod dhcp;
pub mod dns;
pub mod error;
pub mod http;
pub mod json;
pub mod sampling;
pub mod stream;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod test_support;
