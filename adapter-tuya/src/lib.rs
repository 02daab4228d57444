mod client;
pub mod signing;

pub use client::{REQUEST_TIMEOUT, TuyaClient, TuyaCredentials};
