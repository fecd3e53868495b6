//! Type definitions shared by all registry instances

use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};

use serde::{ser::SerializeStruct, Serialize, Serializer};

/// The number of hex digits in a full-length Aptos account address
pub const APTOS_ADDRESS_HEX_LEN: usize = 64;

/// The prefix expected on hex-encoded addresses
const HEX_PREFIX: &[u8] = b"0x";

/// When a contract was deployed.
///
/// Most deployments record the block height, one records a version counter
/// instead. The two are kept distinct rather than folded into a single number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provenance {
    /// The block height at which the contract was deployed
    BlockCreated(u64),
    /// The version at which the contract was deployed
    VersionCreated(u64),
}

/// The kind of provenance a registry instance records
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProvenanceKind {
    /// Block heights
    BlockHeight,
    /// Version counters
    Version,
}

impl Provenance {
    /// The kind of this provenance marker
    pub const fn kind(&self) -> ProvenanceKind {
        match self {
            Provenance::BlockCreated(_) => ProvenanceKind::BlockHeight,
            Provenance::VersionCreated(_) => ProvenanceKind::Version,
        }
    }

    /// The raw height or version
    pub const fn value(&self) -> u64 {
        match self {
            Provenance::BlockCreated(v) | Provenance::VersionCreated(v) => *v,
        }
    }

    /// The field name used for this marker in exported records
    pub const fn field_name(&self) -> &'static str {
        match self {
            Provenance::BlockCreated(_) => "blockCreated",
            Provenance::VersionCreated(_) => "versionCreated",
        }
    }
}

/// A contract deployed on a single chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ChainContract {
    /// The on-chain address of the module
    pub address: &'static str,
    /// When the module was deployed
    pub provenance: Provenance,
}

impl ChainContract {
    /// Creates a new contract record
    pub const fn new(address: &'static str, provenance: Provenance) -> Self {
        Self {
            address,
            provenance,
        }
    }

    /// The block height at which the contract was deployed, if recorded
    pub const fn block_created(&self) -> Option<u64> {
        match self.provenance {
            Provenance::BlockCreated(height) => Some(height),
            Provenance::VersionCreated(_) => None,
        }
    }

    /// The version at which the contract was deployed, if recorded
    pub const fn version_created(&self) -> Option<u64> {
        match self.provenance {
            Provenance::VersionCreated(version) => Some(version),
            Provenance::BlockCreated(_) => None,
        }
    }
}

impl Serialize for ChainContract {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut record = serializer.serialize_struct("ChainContract", 2)?;
        record.serialize_field("address", self.address)?;
        record.serialize_field(self.provenance.field_name(), &self.provenance.value())?;
        record.end()
    }
}

/// The shape addresses in a registry instance must have
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddressFormat {
    /// `0x` followed by exactly `len` hex digits
    PrefixedHex {
        /// The number of hex digits after the prefix
        len: usize,
    },
    /// Any string
    Unconstrained,
}

impl AddressFormat {
    /// The format of a full-length, `0x`-prefixed Aptos address
    pub const APTOS: AddressFormat = AddressFormat::PrefixedHex {
        len: APTOS_ADDRESS_HEX_LEN,
    };

    /// Whether the given address has this format.
    ///
    /// Usable in const context, which is how registry instances check their
    /// entries at compile time.
    pub const fn is_valid(&self, address: &str) -> bool {
        match self {
            AddressFormat::Unconstrained => true,
            AddressFormat::PrefixedHex { len } => {
                let bytes = address.as_bytes();
                if bytes.len() != HEX_PREFIX.len() + *len
                    || bytes[0] != HEX_PREFIX[0]
                    || bytes[1] != HEX_PREFIX[1]
                {
                    return false;
                }

                let mut i = HEX_PREFIX.len();
                while i < bytes.len() {
                    if !bytes[i].is_ascii_hexdigit() {
                        return false;
                    }
                    i += 1;
                }
                true
            }
        }
    }

    /// Checks the given address against this format
    pub fn validate(&self, address: &str) -> Result<(), AddressError> {
        if self.is_valid(address) {
            Ok(())
        } else {
            Err(AddressError {
                address: address.to_string(),
                format: *self,
            })
        }
    }
}

impl Display for AddressFormat {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            AddressFormat::PrefixedHex { len } => write!(f, "0x-prefixed hex of {len} digits"),
            AddressFormat::Unconstrained => write!(f, "any string"),
        }
    }
}

/// An address that does not match its registry's format
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddressError {
    /// The offending address
    pub address: String,
    /// The format it was checked against
    pub format: AddressFormat,
}

impl Display for AddressError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "address \"{}\" is not {}", self.address, self.format)
    }
}

impl Error for AddressError {}

/// A chain identifier that a registry instance does not support
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownChain(pub String);

impl Display for UnknownChain {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "unsupported chain \"{}\"", self.0)
    }
}

impl Error for UnknownChain {}

/// A single deployment's mapping from supported chains to contracts.
///
/// Implemented by the `Deployment` type of every module generated with
/// [`chain_registry`](crate::chain_registry).
pub trait Registry {
    /// The chains this deployment exists on
    type Chain: Copy + Eq + Display + Serialize + 'static;

    /// The name of the deployment
    const NAME: &'static str;
    /// The format every address in this deployment follows
    const FORMAT: AddressFormat;
    /// The kind of provenance every entry records
    const PROVENANCE: ProvenanceKind;

    /// Every supported chain, in declaration order
    fn chains() -> &'static [Self::Chain];

    /// The contract deployed on the given chain
    fn resolve(chain: Self::Chain) -> ChainContract;

    /// Every `(chain, contract)` pair of the deployment
    fn entries() -> Vec<(Self::Chain, ChainContract)> {
        Self::chains()
            .iter()
            .map(|chain| (*chain, Self::resolve(*chain)))
            .collect()
    }
}
