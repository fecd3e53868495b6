//! Definitions of errors that can occur during the execution of the package management scripts

use std::{
    error::Error,
    fmt::{self, Display, Formatter},
};

/// Errors that can occur during the execution of the package management scripts
#[derive(Debug)]
pub enum ScriptError {
    /// The requested network is not one of the supported networks
    InvalidNetwork(String),
    /// A command line argument could not be interpreted
    InvalidArgument(String),
    /// Error constructing the client for the Aptos node
    ClientInitialization(String),
    /// Error funding the deployment account
    Funding(String),
    /// Error compiling the Move package
    Compilation(String),
    /// Error reading or parsing the publish payload artifact
    ArtifactParsing(String),
    /// Error building, signing or submitting a transaction
    TransactionSubmission(String),
    /// A transaction was committed on-chain but did not succeed
    TransactionFailed {
        /// The hash of the failed transaction
        hash: String,
        /// The VM status reported by the node
        vm_status: String,
    },
    /// A transaction was not committed before the wait timed out
    TransactionTimeout(String),
    /// The on-chain state after publishing does not match the local build
    PostPublishCheck(String),
    /// Error in a request to the Aptos node
    Request(String),
    /// Error spawning an external command
    CommandExecution(String),
    /// Error de/serializing JSON
    Serde(String),
}

impl Display for ScriptError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            ScriptError::InvalidNetwork(s) => write!(f, "{}", s),
            ScriptError::InvalidArgument(s) => write!(f, "invalid argument: {}", s),
            ScriptError::ClientInitialization(s) => write!(f, "error initializing client: {}", s),
            ScriptError::Funding(s) => write!(f, "error funding account: {}", s),
            ScriptError::Compilation(s) => write!(f, "error compiling package: {}", s),
            ScriptError::ArtifactParsing(s) => write!(f, "error parsing artifact: {}", s),
            ScriptError::TransactionSubmission(s) => {
                write!(f, "error submitting transaction: {}", s)
            }
            ScriptError::TransactionFailed { hash, vm_status } => {
                write!(f, "transaction {} failed: {}", hash, vm_status)
            }
            ScriptError::TransactionTimeout(hash) => {
                write!(f, "timed out waiting for transaction {}", hash)
            }
            ScriptError::PostPublishCheck(s) => write!(f, "check failed: {}", s),
            ScriptError::Request(s) => write!(f, "error in node request: {}", s),
            ScriptError::CommandExecution(s) => write!(f, "error running command: {}", s),
            ScriptError::Serde(s) => write!(f, "error de/serializing JSON: {}", s),
        }
    }
}

impl Error for ScriptError {}

impl From<reqwest::Error> for ScriptError {
    fn from(e: reqwest::Error) -> Self {
        ScriptError::Request(e.to_string())
    }
}
