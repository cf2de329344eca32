pub mod error;

pub mod chain;
pub mod client;
pub mod config;
pub mod environment;
pub mod identity;
pub mod role;
pub mod session;
pub mod sign;

pub mod cmd;

#[cfg(test)]
pub(crate) mod dev;
