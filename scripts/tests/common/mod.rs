//! In-memory stand-ins for the network, the Aptos CLI and the terminal

#![allow(dead_code)]

use std::{
    cell::{Cell, RefCell},
    fs,
    path::Path,
    rc::Rc,
};

use scripts::{
    account::LocalAccount,
    cli::PublishPackageArgs,
    client::AptosClient,
    errors::ScriptError,
    progress::Progress,
    toolchain::{MoveRunCall, MoveToolchain},
    types::{
        AccountAddress, AccountModule, CommittedTransaction, EntryFunctionPayload, MoveFunction,
        MoveModuleAbi,
    },
};
use serde_json::json;
use url::Url;

/// The bytecode the mock toolchain compiles the package to
pub const BYTECODE: &str = "0xa11ce";

/// The ledger version every mock transaction is committed at
pub const COMMITTED_VERSION: u64 = 1_234;

/// The block height every mock ledger version resolves to
pub const BLOCK_HEIGHT: u64 = 99;

/// A module published with the given bytecode, exposing `init_state`
pub fn metrom_module(bytecode: &str) -> AccountModule {
    AccountModule {
        bytecode: bytecode.to_string(),
        abi: Some(MoveModuleAbi {
            name: "metrom".to_string(),
            exposed_functions: vec![MoveFunction {
                name: "init_state".to_string(),
                params: ["&signer", "address", "address", "u32", "u64", "u64"]
                    .map(String::from)
                    .to_vec(),
            }],
        }),
    }
}

/// Valid publish arguments for devnet, writing artifacts under `dir`
pub fn publish_args(dir: &Path) -> PublishPackageArgs {
    PublishPackageArgs {
        network: "devnet".to_string(),
        updater: "0x2".to_string(),
        fee: 10_000,
        minimum_campaign_duration: 3_600,
        maximum_campaign_duration: 86_400,
        owner: None,
        node_url: Some(Url::parse("http://127.0.0.1:8080/v1").unwrap()),
        faucet_url: Some(Url::parse("http://127.0.0.1:8081").unwrap()),
        package_dir: dir.to_path_buf(),
        artifact_path: dir.join("build").join("publish-payload.json"),
        fund_amount: 5_000,
    }
}

// ----------
// | CLIENT |
// ----------

/// What the mock network has been asked to do
#[derive(Default)]
pub struct ClientState {
    /// The name of every call, in order
    pub calls: RefCell<Vec<String>>,
    /// Every funding request
    pub funded: RefCell<Vec<(AccountAddress, u64)>>,
    /// Every submitted call
    pub submitted: RefCell<Vec<EntryFunctionPayload>>,
    /// The modules reported as published
    pub modules: RefCell<Vec<AccountModule>>,
    /// The 1-based index of the waited-on transaction that reports a failure
    pub fail_transaction: Cell<Option<usize>>,
    /// How many transactions have been waited on
    pub waited: Cell<usize>,
    /// Whether the faucet refuses to fund accounts
    pub fail_funding: Cell<bool>,
    /// Whether the block lookup fails
    pub fail_block_lookup: Cell<bool>,
}

impl ClientState {
    /// The names of the calls made so far
    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    /// The functions of the calls submitted so far
    pub fn submitted_functions(&self) -> Vec<String> {
        self.submitted
            .borrow()
            .iter()
            .map(|payload| payload.function.clone())
            .collect()
    }

    fn record(&self, call: &str) {
        self.calls.borrow_mut().push(call.to_string());
    }
}

/// A network client backed by shared in-memory state
#[derive(Clone, Default)]
pub struct MockClient {
    /// The state shared with the test
    pub state: Rc<ClientState>,
}

impl MockClient {
    /// A client reporting the given modules as published
    pub fn with_modules(modules: Vec<AccountModule>) -> Self {
        let client = Self::default();
        *client.state.modules.borrow_mut() = modules;
        client
    }
}

impl AptosClient for MockClient {
    async fn fund_account(&self, address: &AccountAddress, amount: u64) -> Result<(), ScriptError> {
        self.state.record("fund_account");
        if self.state.fail_funding.get() {
            return Err(ScriptError::Funding("faucet down".to_string()));
        }
        self.state.funded.borrow_mut().push((*address, amount));
        Ok(())
    }

    async fn sign_and_submit(
        &self,
        _signer: &LocalAccount,
        payload: EntryFunctionPayload,
    ) -> Result<String, ScriptError> {
        self.state.record("sign_and_submit");
        let mut submitted = self.state.submitted.borrow_mut();
        submitted.push(payload);
        Ok(format!("0x{:064x}", submitted.len()))
    }

    async fn wait_for_transaction(&self, hash: &str) -> Result<CommittedTransaction, ScriptError> {
        self.state.record("wait_for_transaction");
        let index = self.state.waited.get() + 1;
        self.state.waited.set(index);
        let failed = self.state.fail_transaction.get() == Some(index);
        Ok(CommittedTransaction {
            hash: hash.to_string(),
            version: COMMITTED_VERSION,
            success: !failed,
            vm_status: if failed { "Move abort" } else { "Executed successfully" }.to_string(),
        })
    }

    async fn account_modules(
        &self,
        _address: &AccountAddress,
    ) -> Result<Vec<AccountModule>, ScriptError> {
        self.state.record("account_modules");
        Ok(self.state.modules.borrow().clone())
    }

    async fn block_height_by_version(&self, version: u64) -> Result<u64, ScriptError> {
        self.state.record("block_height_by_version");
        if self.state.fail_block_lookup.get() {
            return Err(ScriptError::Request(format!("version {} was pruned", version)));
        }
        Ok(BLOCK_HEIGHT)
    }
}

// -------------
// | TOOLCHAIN |
// -------------

/// An Aptos CLI that compiles instantly and runs nothing
pub struct MockToolchain {
    /// Whether the CLI reports itself as installed
    pub installed: bool,
    /// Whether compiling the package fails
    pub fail_build: bool,
    /// The exit code returned by every `move run`
    pub exit_code: i32,
    /// How many times the installation was checked
    pub install_checks: Cell<usize>,
    /// The named address of every compilation
    pub compilations: RefCell<Vec<AccountAddress>>,
    /// Every `move run` invocation
    pub runs: RefCell<Vec<MoveRunCall>>,
}

impl MockToolchain {
    /// An installed toolchain whose runs exit with the given code
    pub fn exiting_with(exit_code: i32) -> Self {
        Self {
            installed: true,
            fail_build: false,
            exit_code,
            install_checks: Cell::new(0),
            compilations: RefCell::new(Vec::new()),
            runs: RefCell::new(Vec::new()),
        }
    }

    /// A toolchain that is not installed
    pub fn missing() -> Self {
        Self {
            installed: false,
            ..Self::exiting_with(0)
        }
    }

    /// An installed toolchain that fails to compile the package
    pub fn failing_build() -> Self {
        Self {
            fail_build: true,
            ..Self::exiting_with(0)
        }
    }
}

impl MoveToolchain for MockToolchain {
    async fn is_installed(&self) -> bool {
        self.install_checks.set(self.install_checks.get() + 1);
        self.installed
    }

    async fn build_publish_payload(
        &self,
        _package_dir: &Path,
        named_address: &AccountAddress,
        output: &Path,
    ) -> Result<(), ScriptError> {
        self.compilations.borrow_mut().push(*named_address);
        if self.fail_build {
            return Err(ScriptError::Compilation("unbound module".to_string()));
        }

        let payload = json!({
            "function_id": "0x1::code::publish_package_txn",
            "type_args": [],
            "args": [
                { "type": "hex", "value": "0x0b1e55ed" },
                { "type": "hex", "value": [BYTECODE] }
            ]
        });
        if let Some(parent) = output.parent() {
            fs::create_dir_all(parent).map_err(|e| ScriptError::Compilation(e.to_string()))?;
        }
        fs::write(output, payload.to_string()).map_err(|e| ScriptError::Compilation(e.to_string()))
    }

    async fn run_function(&self, call: &MoveRunCall) -> Result<i32, ScriptError> {
        self.runs.borrow_mut().push(call.clone());
        Ok(self.exit_code)
    }
}

// ------------
// | PROGRESS |
// ------------

/// A progress event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A step started
    Start(String),
    /// A step reported something
    Update(String),
    /// A step succeeded
    Succeed(String),
    /// A step failed
    Fail(String),
}

/// Records every progress event
#[derive(Debug, Default)]
pub struct RecordingProgress {
    /// The events, in order
    pub events: Vec<Event>,
}

impl RecordingProgress {
    /// The messages of the failed steps
    pub fn failures(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|event| match event {
                Event::Fail(message) => Some(message.as_str()),
                _ => None,
            })
            .collect()
    }
}

impl Progress for RecordingProgress {
    fn start(&mut self, message: &str) {
        self.events.push(Event::Start(message.to_string()));
    }

    fn update(&mut self, message: &str) {
        self.events.push(Event::Update(message.to_string()));
    }

    fn succeed(&mut self, message: &str) {
        self.events.push(Event::Succeed(message.to_string()));
    }

    fn fail(&mut self, message: &str) {
        self.events.push(Event::Fail(message.to_string()));
    }
}
