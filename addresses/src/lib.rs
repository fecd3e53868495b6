//! Addresses of the deployed Metrom package, one immutable registry per deployment.
//!
//! Every deployment lives in its own module, generated by [`chain_registry`], which
//! exposes a `SupportedChain` enum and a total `resolve` function over it. A new
//! on-chain deployment is recorded by adding a sibling module, never by editing an
//! existing one.

#![deny(missing_docs)]
#![deny(clippy::missing_docs_in_private_items)]

mod macros;
pub mod types;
pub mod v1;

#[doc(hidden)]
pub use serde;

pub use types::{
    AddressError, AddressFormat, ChainContract, Provenance, ProvenanceKind, Registry,
    UnknownChain, APTOS_ADDRESS_HEX_LEN,
};
