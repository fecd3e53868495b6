//! The publish-and-initialize workflow.
//!
//! The workflow is a strictly linear pipeline: generate an account, fund it,
//! compile the package against it, publish, verify the deployment, and
//! initialize the module's state. The first failing step aborts the pipeline;
//! effects of the steps that already succeeded (a funded account, a published
//! package) are left as they are.

use std::{
    fmt::{self, Display},
    path::PathBuf,
};

use serde::Serialize;
use serde_json::Value;
use tracing::{info, warn};
use url::Url;

use crate::{
    account::LocalAccount,
    cli::PublishPackageArgs,
    client::AptosClient,
    constants::{INIT_STATE_FUNCTION, MODULE_NAME},
    errors::ScriptError,
    progress::Progress,
    toolchain::MoveToolchain,
    types::{
        AccountAddress, AccountModule, CommittedTransaction, EntryFunctionPayload, MoveFunction,
        Network, PublishPayload,
    },
    utils::read_publish_payload,
};

// -----------------
// | CONFIGURATION |
// -----------------

/// Everything a single run of the workflow needs, validated up front
#[derive(Debug, Clone)]
pub struct PublishConfig {
    /// The network to publish to
    pub network: Network,
    /// The fullnode REST API of the network
    pub node_url: Url,
    /// The faucet of the network, if it has one
    pub faucet_url: Option<Url>,
    /// The owner of the module; the deployment account when absent
    pub owner: Option<AccountAddress>,
    /// The updater of the module
    pub updater: AccountAddress,
    /// The protocol fee, in parts per million
    pub fee: u64,
    /// The minimum campaign duration, in seconds
    pub minimum_campaign_duration: u64,
    /// The maximum campaign duration, in seconds
    pub maximum_campaign_duration: u64,
    /// The directory of the Move package
    pub package_dir: PathBuf,
    /// Where the compiled publish payload is written
    pub artifact_path: PathBuf,
    /// The amount, in octas, the deployment account is funded with
    pub fund_amount: u64,
}

impl TryFrom<PublishPackageArgs> for PublishConfig {
    type Error = ScriptError;

    fn try_from(args: PublishPackageArgs) -> Result<Self, Self::Error> {
        // The network is validated first so that nothing else runs for an unknown one
        let network: Network = args.network.parse()?;

        let node_url = match (args.node_url, network.node_url()) {
            (Some(url), _) => url,
            (None, Some(url)) => parse_url(url)?,
            (None, None) => {
                return Err(ScriptError::InvalidArgument(format!(
                    "the {} network requires --node-url",
                    network
                )))
            }
        };
        let faucet_url = match args.faucet_url {
            Some(url) => Some(url),
            None => network.faucet_url().map(parse_url).transpose()?,
        };

        let owner = args
            .owner
            .as_deref()
            .map(str::parse::<AccountAddress>)
            .transpose()?;
        let updater = args.updater.parse::<AccountAddress>()?;

        Ok(Self {
            network,
            node_url,
            faucet_url,
            owner,
            updater,
            fee: args.fee,
            minimum_campaign_duration: args.minimum_campaign_duration,
            maximum_campaign_duration: args.maximum_campaign_duration,
            package_dir: args.package_dir,
            artifact_path: args.artifact_path,
            fund_amount: args.fund_amount,
        })
    }
}

/// Parses one of the built-in endpoint URLs
fn parse_url(url: &str) -> Result<Url, ScriptError> {
    Url::parse(url).map_err(|e| ScriptError::ClientInitialization(e.to_string()))
}

// -----------
// | RESULTS |
// -----------

/// The outcome of a successful run
#[derive(Debug, Clone)]
pub struct PublishReport {
    /// The address of the deployment account, which is the module's address
    pub address: AccountAddress,
    /// The owner the module was initialized with
    pub owner: AccountAddress,
    /// The transaction publishing the package
    pub publish_transaction: CommittedTransaction,
    /// The transaction initializing the module's state
    pub init_transaction: CommittedTransaction,
    /// The registry entry describing the deployment, if its block could be resolved
    pub registry_entry: Option<RegistryEntry>,
}

/// A deployment, in the shape of an address registry record
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistryEntry {
    /// The address of the module
    pub address: String,
    /// The height of the block containing the publish transaction
    pub block_created: u64,
}

// ------------
// | PIPELINE |
// ------------

/// Runs the workflow against a network client and a local toolchain
pub struct Publisher<'a, C, T, P> {
    /// The validated configuration of the run
    config: &'a PublishConfig,
    /// The network the package is published to
    client: &'a C,
    /// The tooling compiling the package
    toolchain: &'a T,
    /// The observer notified of each step
    progress: &'a mut P,
}

impl<'a, C: AptosClient, T: MoveToolchain, P: Progress> Publisher<'a, C, T, P> {
    /// Creates a publisher for a single run
    pub fn new(
        config: &'a PublishConfig,
        client: &'a C,
        toolchain: &'a T,
        progress: &'a mut P,
    ) -> Self {
        Self {
            config,
            client,
            toolchain,
            progress,
        }
    }

    /// Runs every step in order, stopping at the first failure
    pub async fn run(mut self) -> Result<PublishReport, ScriptError> {
        info!("Publishing to {} ({})", self.config.network, self.config.node_url);

        let account = self.generate_account();
        let owner = self.config.owner.unwrap_or_else(|| account.address());

        self.fund(&account).await?;
        let payload = self.compile(&account).await?;
        let publish_transaction = self.publish(&account, &payload).await?;
        let init_state = self.check_deployment(&account, &payload).await?;
        let init_transaction = self.initialize(&account, owner, &init_state).await?;
        let registry_entry = self.registry_entry(&account, &publish_transaction).await;

        Ok(PublishReport {
            address: account.address(),
            owner,
            publish_transaction,
            init_transaction,
            registry_entry,
        })
    }

    /// Generates the account the package is published under
    fn generate_account(&mut self) -> LocalAccount {
        self.progress.start("Generating deployment account");
        let account = LocalAccount::generate();
        self.progress.succeed(&format!(
            "Deployment account with address {} generated (will be the module's address)",
            account.address()
        ));
        account
    }

    /// Funds the deployment account from the faucet
    async fn fund(&mut self, account: &LocalAccount) -> Result<(), ScriptError> {
        self.progress.start("Funding deployment account");
        let result = self
            .client
            .fund_account(&account.address(), self.config.fund_amount)
            .await;
        self.conclude(
            result,
            |_| "Deployment account funded".to_string(),
            "Could not fund deployment account",
        )
    }

    /// Compiles the package against the deployment account and reads back the payload
    async fn compile(&mut self, account: &LocalAccount) -> Result<PublishPayload, ScriptError> {
        self.progress.start("Compiling package");
        let result = match self
            .toolchain
            .build_publish_payload(
                &self.config.package_dir,
                &account.address(),
                &self.config.artifact_path,
            )
            .await
        {
            Ok(()) => read_publish_payload(&self.config.artifact_path),
            Err(e) => Err(e),
        };
        self.conclude(
            result,
            |_| "Package compiled".to_string(),
            "Error compiling the package",
        )
    }

    /// Publishes the compiled package
    async fn publish(
        &mut self,
        account: &LocalAccount,
        payload: &PublishPayload,
    ) -> Result<CommittedTransaction, ScriptError> {
        self.progress.start("Publishing the package on-chain");
        let result = self
            .broadcast(account, payload.publish_call(), "Publish")
            .await;
        self.conclude(
            result,
            |tx| format!("Publish transaction confirmed on-chain (hash: {})", tx.hash),
            "Transaction broadcast failed",
        )
    }

    /// Checks the published modules against the local build,
    /// returning the ABI of the initialization function
    async fn check_deployment(
        &mut self,
        account: &LocalAccount,
        payload: &PublishPayload,
    ) -> Result<MoveFunction, ScriptError> {
        self.progress.start("Checking the on-chain deployment");
        let result = match self.client.account_modules(&account.address()).await {
            Ok(modules) => verify_deployment(&modules, payload),
            Err(e) => Err(e),
        };
        self.conclude(
            result,
            |_| "On-chain checks passed".to_string(),
            "Could not verify the on-chain deployment",
        )
    }

    /// Initializes the module's state
    async fn initialize(
        &mut self,
        account: &LocalAccount,
        owner: AccountAddress,
        init_state: &MoveFunction,
    ) -> Result<CommittedTransaction, ScriptError> {
        self.progress.start("Initializing the package on-chain");

        let arguments = [
            InitArgument::Address(owner),
            InitArgument::Address(self.config.updater),
            InitArgument::Integer(self.config.fee),
            InitArgument::Integer(self.config.minimum_campaign_duration),
            InitArgument::Integer(self.config.maximum_campaign_duration),
        ];
        let result = match encode_arguments(init_state, &arguments) {
            Ok(encoded) => {
                let function = format!(
                    "{}::{}::{}",
                    account.address(),
                    MODULE_NAME,
                    INIT_STATE_FUNCTION
                );
                self.broadcast(account, EntryFunctionPayload::new(function, encoded), "Init state")
                    .await
            }
            Err(e) => Err(e),
        };

        self.conclude(
            result,
            |tx| format!("Init state transaction confirmed on-chain (hash: {})", tx.hash),
            "Init state transaction broadcast failed",
        )
    }

    /// Resolves the registry entry of the deployment.
    ///
    /// The package is already live at this point, so a failure here is only reported.
    async fn registry_entry(
        &mut self,
        account: &LocalAccount,
        publish_transaction: &CommittedTransaction,
    ) -> Option<RegistryEntry> {
        match self
            .client
            .block_height_by_version(publish_transaction.version)
            .await
        {
            Ok(block_created) => Some(RegistryEntry {
                address: account.address().to_string(),
                block_created,
            }),
            Err(e) => {
                warn!("Could not resolve the block of the publish transaction: {}", e);
                None
            }
        }
    }

    /// Submits a call and waits for it to be committed successfully
    async fn broadcast(
        &mut self,
        account: &LocalAccount,
        call: EntryFunctionPayload,
        label: &str,
    ) -> Result<CommittedTransaction, ScriptError> {
        let hash = self.client.sign_and_submit(account, call).await?;
        self.progress.update(&format!(
            "{} transaction broadcast on-chain with hash {}",
            label, hash
        ));
        self.client.wait_for_transaction(&hash).await?.into_result()
    }

    /// Reports the outcome of the running step and passes the result on
    fn conclude<V>(
        &mut self,
        result: Result<V, ScriptError>,
        success: impl FnOnce(&V) -> String,
        failure: &str,
    ) -> Result<V, ScriptError> {
        match &result {
            Ok(value) => self.progress.succeed(&success(value)),
            Err(e) => self.progress.fail(&format!("{}: {}", failure, e)),
        }
        result
    }
}

// ---------------------
// | DEPLOYMENT CHECKS |
// ---------------------

/// Checks that exactly the locally built module was published,
/// returning the ABI of its initialization function
pub fn verify_deployment(
    modules: &[AccountModule],
    payload: &PublishPayload,
) -> Result<MoveFunction, ScriptError> {
    let [module] = modules else {
        return Err(ScriptError::PostPublishCheck(format!(
            "expected 1 module to be published, but {} were instead",
            modules.len()
        )));
    };

    let local = payload.modules.first().ok_or_else(|| {
        ScriptError::ArtifactParsing("the publish payload contains no modules".to_string())
    })?;
    if !same_bytecode(&module.bytecode, local) {
        return Err(ScriptError::PostPublishCheck(
            "the published module's bytecode does not match the locally built one".to_string(),
        ));
    }

    module
        .abi
        .as_ref()
        .and_then(|abi| abi.function(INIT_STATE_FUNCTION))
        .cloned()
        .ok_or_else(|| {
            ScriptError::PostPublishCheck(format!(
                "the published module does not expose `{}`",
                INIT_STATE_FUNCTION
            ))
        })
}

/// Compares two hex-encoded bytecodes, ignoring prefix and case
fn same_bytecode(a: &str, b: &str) -> bool {
    let strip = |s: &str| s.trim_start_matches("0x").to_string();
    strip(a).eq_ignore_ascii_case(&strip(b))
}

// ---------------------
// | ARGUMENT ENCODING |
// ---------------------

/// A value passed to an entry function
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitArgument {
    /// An account address
    Address(AccountAddress),
    /// An unsigned integer
    Integer(u64),
}

impl Display for InitArgument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitArgument::Address(address) => write!(f, "{}", address),
            InitArgument::Integer(value) => write!(f, "{}", value),
        }
    }
}

/// Encodes arguments for the node's JSON API following the function's parameter types.
///
/// Leading signer parameters are supplied by the transaction and skipped.
pub fn encode_arguments(
    function: &MoveFunction,
    values: &[InitArgument],
) -> Result<Vec<Value>, ScriptError> {
    let params: Vec<&str> = function
        .params
        .iter()
        .map(String::as_str)
        .skip_while(|param| matches!(*param, "signer" | "&signer"))
        .collect();

    if params.len() != values.len() {
        return Err(ScriptError::InvalidArgument(format!(
            "`{}` takes {} arguments, {} were supplied",
            function.name,
            params.len(),
            values.len()
        )));
    }

    params
        .into_iter()
        .zip(values)
        .map(|(ty, value)| encode_argument(ty, value))
        .collect()
}

/// Encodes a single argument as the given Move type
fn encode_argument(ty: &str, value: &InitArgument) -> Result<Value, ScriptError> {
    match (ty, value) {
        ("address", InitArgument::Address(address)) => Ok(Value::String(address.to_string())),
        ("u8", InitArgument::Integer(n)) => narrow::<u8>(*n, ty),
        ("u16", InitArgument::Integer(n)) => narrow::<u16>(*n, ty),
        ("u32", InitArgument::Integer(n)) => narrow::<u32>(*n, ty),
        ("u64" | "u128" | "u256", InitArgument::Integer(n)) => Ok(Value::String(n.to_string())),
        _ => Err(ScriptError::InvalidArgument(format!(
            "cannot pass {} as `{}`",
            value, ty
        ))),
    }
}

/// Encodes an integer as a narrower JSON number, failing if it does not fit
fn narrow<N: TryFrom<u64> + Into<Value>>(n: u64, ty: &str) -> Result<Value, ScriptError> {
    N::try_from(n)
        .map(Into::into)
        .map_err(|_| ScriptError::InvalidArgument(format!("{} does not fit in `{}`", n, ty)))
}
