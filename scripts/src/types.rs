//! Type definitions used throughout the scripts

use std::{
    fmt::{self, Display},
    str::FromStr,
};

use clap::ValueEnum;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_with::{serde_as, DisplayFromStr};

use crate::{
    constants::{
        DEVNET_FAUCET_URL, DEVNET_NODE_URL, LOCAL_FAUCET_URL, LOCAL_NODE_URL, MAINNET_NODE_URL,
        PUBLISH_PACKAGE_FUNCTION, TESTNET_FAUCET_URL, TESTNET_NODE_URL,
    },
    errors::ScriptError,
};

/// The number of bytes in an Aptos account address
pub const NUM_BYTES_ADDRESS: usize = 32;

// ------------
// | NETWORKS |
// ------------

/// The Aptos networks the package can be published to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Network {
    /// Aptos mainnet
    Mainnet,
    /// Aptos testnet
    Testnet,
    /// Aptos devnet
    Devnet,
    /// A network running on the local machine
    Local,
    /// Any other network, reachable only through an explicit node URL
    Custom,
}

impl Network {
    /// Every supported network
    pub const ALL: [Network; 5] = [
        Network::Mainnet,
        Network::Testnet,
        Network::Devnet,
        Network::Local,
        Network::Custom,
    ];

    /// The default fullnode REST API of the network, if it has one
    pub fn node_url(&self) -> Option<&'static str> {
        match self {
            Network::Mainnet => Some(MAINNET_NODE_URL),
            Network::Testnet => Some(TESTNET_NODE_URL),
            Network::Devnet => Some(DEVNET_NODE_URL),
            Network::Local => Some(LOCAL_NODE_URL),
            Network::Custom => None,
        }
    }

    /// The default faucet of the network, if it has one
    pub fn faucet_url(&self) -> Option<&'static str> {
        match self {
            Network::Mainnet | Network::Custom => None,
            Network::Testnet => Some(TESTNET_FAUCET_URL),
            Network::Devnet => Some(DEVNET_FAUCET_URL),
            Network::Local => Some(LOCAL_FAUCET_URL),
        }
    }
}

impl Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Mainnet => write!(f, "mainnet"),
            Network::Testnet => write!(f, "testnet"),
            Network::Devnet => write!(f, "devnet"),
            Network::Local => write!(f, "local"),
            Network::Custom => write!(f, "custom"),
        }
    }
}

impl FromStr for Network {
    type Err = ScriptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Network::ALL
            .into_iter()
            .find(|network| network.to_string() == s)
            .ok_or_else(|| {
                ScriptError::InvalidNetwork(format!(
                    "Invalid network \"{}\" provided; valid values are: {}",
                    s,
                    Network::ALL.iter().join(", ")
                ))
            })
    }
}

// ------------
// | ACCOUNTS |
// ------------

/// An Aptos account address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AccountAddress(pub [u8; NUM_BYTES_ADDRESS]);

impl Display for AccountAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for AccountAddress {
    type Err = ScriptError;

    /// Parses a hex address, with or without the `0x` prefix.
    /// Short forms such as `0x1` are left-padded with zeros.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_prefix("0x").unwrap_or(s);
        if digits.is_empty() || digits.len() > NUM_BYTES_ADDRESS * 2 {
            return Err(ScriptError::InvalidArgument(format!(
                "\"{}\" is not an account address",
                s
            )));
        }

        let padded = format!("{:0>width$}", digits, width = NUM_BYTES_ADDRESS * 2);
        let mut bytes = [0u8; NUM_BYTES_ADDRESS];
        hex::decode_to_slice(padded, &mut bytes)
            .map_err(|e| ScriptError::InvalidArgument(format!("\"{}\": {}", s, e)))?;

        Ok(AccountAddress(bytes))
    }
}

// ----------------
// | TRANSACTIONS |
// ----------------

/// An entry function call, in the JSON form accepted by the node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryFunctionPayload {
    /// The fully qualified function id, `<address>::<module>::<function>`
    pub function: String,
    /// Type arguments of the function
    pub type_arguments: Vec<String>,
    /// Arguments of the function
    pub arguments: Vec<Value>,
}

impl EntryFunctionPayload {
    /// Creates a payload calling the given function without type arguments
    pub fn new(function: impl Into<String>, arguments: Vec<Value>) -> Self {
        Self {
            function: function.into(),
            type_arguments: Vec::new(),
            arguments,
        }
    }
}

/// A transaction the node has committed
#[serde_as]
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct CommittedTransaction {
    /// The hash of the transaction
    pub hash: String,
    /// The ledger version at which the transaction was committed
    #[serde_as(as = "DisplayFromStr")]
    pub version: u64,
    /// Whether the transaction executed successfully
    pub success: bool,
    /// The VM status of the execution
    pub vm_status: String,
}

impl CommittedTransaction {
    /// Turns an unsuccessful transaction into an error
    pub fn into_result(self) -> Result<Self, ScriptError> {
        if self.success {
            Ok(self)
        } else {
            Err(ScriptError::TransactionFailed {
                hash: self.hash,
                vm_status: self.vm_status,
            })
        }
    }
}

// -----------
// | MODULES |
// -----------

/// A module published under an account
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AccountModule {
    /// The hex-encoded bytecode of the module
    pub bytecode: String,
    /// The ABI of the module, if the node returned it
    pub abi: Option<MoveModuleAbi>,
}

/// The ABI of a Move module
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MoveModuleAbi {
    /// The name of the module
    pub name: String,
    /// The functions callable from outside the module
    pub exposed_functions: Vec<MoveFunction>,
}

impl MoveModuleAbi {
    /// Finds an exposed function by name
    pub fn function(&self, name: &str) -> Option<&MoveFunction> {
        self.exposed_functions.iter().find(|f| f.name == name)
    }
}

/// A function in a module's ABI
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct MoveFunction {
    /// The name of the function
    pub name: String,
    /// The Move types of the parameters, e.g. `&signer`, `address`, `u64`
    pub params: Vec<String>,
}

// --------------------
// | PUBLISH PAYLOADS |
// --------------------

/// A compiled package, as written by `aptos move build-publish-payload`
#[derive(Debug, Clone, PartialEq)]
pub struct PublishPayload {
    /// The hex-encoded package metadata
    pub metadata: String,
    /// The hex-encoded bytecode of each module in the package
    pub modules: Vec<String>,
}

impl PublishPayload {
    /// The call publishing this package
    pub fn publish_call(&self) -> EntryFunctionPayload {
        EntryFunctionPayload::new(
            PUBLISH_PACKAGE_FUNCTION,
            vec![
                Value::String(self.metadata.clone()),
                Value::Array(self.modules.iter().cloned().map(Value::String).collect()),
            ],
        )
    }
}

/// The on-disk layout of a publish payload
#[derive(Debug, Deserialize)]
pub(crate) struct PublishPayloadFile {
    /// The positional arguments of the publish call
    pub args: Vec<PayloadArgument>,
}

/// A single positional argument of a publish payload
#[derive(Debug, Deserialize)]
pub(crate) struct PayloadArgument {
    /// The argument's value
    pub value: PayloadValue,
}

/// A hex value, or a vector of hex values
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum PayloadValue {
    /// A single hex string
    Single(String),
    /// A vector of hex strings
    Many(Vec<String>),
}

// ---------------
// | DEPLOYMENTS |
// ---------------

/// The registry instances known to the scripts
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deployment {
    /// The first deployment of the package
    V1,
}

impl Display for Deployment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Deployment::V1 => write!(f, "{}", addresses::v1::NAME),
        }
    }
}
