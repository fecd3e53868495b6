//! Scripts for publishing, initializing and administering the Metrom package on Aptos.

#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

pub mod account;
pub mod cli;
pub mod client;
pub mod commands;
pub mod constants;
pub mod errors;
pub mod progress;
pub mod publish;
pub mod toolchain;
pub mod types;
pub mod utils;
