//! Constants used in the package management scripts

use std::time::Duration;

/// The name of the Aptos CLI executable
pub const APTOS_COMMAND: &str = "aptos";

/// The flag printing the Aptos CLI version
pub const VERSION_FLAG: &str = "--version";

/// The Aptos CLI command group for Move packages
pub const MOVE_COMMAND: &str = "move";

/// The command compiling a package into a publish payload
pub const BUILD_PUBLISH_PAYLOAD_COMMAND: &str = "build-publish-payload";

/// The command running an entry function
pub const RUN_COMMAND: &str = "run";

/// The named address the package is compiled against
pub const PACKAGE_NAMED_ADDRESS: &str = "metrom";

/// The name of the Move module published by the package
pub const MODULE_NAME: &str = "metrom";

/// The entry function initializing the module's state
pub const INIT_STATE_FUNCTION: &str = "init_state";

/// The entry function settling a campaign's rewards
pub const DISTRIBUTE_REWARDS_FUNCTION: &str = "distribute_rewards";

/// The entry function setting the minimum reward rate of a token
pub const SET_MINIMUM_REWARD_TOKEN_RATE_FUNCTION: &str = "set_minimum_reward_token_rate";

/// The framework function publishing a package
pub const PUBLISH_PACKAGE_FUNCTION: &str = "0x1::code::publish_package_txn";

/// The Aptos CLI profile used when none is given
pub const DEFAULT_PROFILE: &str = "default";

/// Where the publish payload is written when no path is given
pub const DEFAULT_ARTIFACT_PATH: &str = "build/publish-payload.json";

/// The amount, in octas, the deployment account is funded with
pub const DEFAULT_FUND_AMOUNT: u64 = 100_000_000;

/// The maximum gas a submitted transaction may consume
pub const MAX_GAS_AMOUNT: u64 = 200_000;

/// How long a submitted transaction stays valid
pub const TRANSACTION_EXPIRATION: Duration = Duration::from_secs(20);

/// How long to wait for a transaction to be committed
pub const WAIT_FOR_TRANSACTION_TIMEOUT: Duration = Duration::from_secs(20);

/// How long to sleep between polls of a pending transaction
pub const WAIT_FOR_TRANSACTION_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// The scheme byte appended to an ed25519 public key when deriving the authentication key
pub const ED25519_SCHEME: u8 = 0;

/// The `type` of a pending transaction in node responses
pub const PENDING_TRANSACTION_TYPE: &str = "pending_transaction";

/// The log level used when `RUST_LOG` is unset
pub const DEFAULT_LOG_LEVEL: &str = "info";

// -------------
// | ENDPOINTS |
// -------------

/// The mainnet fullnode REST API
pub const MAINNET_NODE_URL: &str = "https://api.mainnet.aptoslabs.com/v1";

/// The testnet fullnode REST API
pub const TESTNET_NODE_URL: &str = "https://api.testnet.aptoslabs.com/v1";

/// The devnet fullnode REST API
pub const DEVNET_NODE_URL: &str = "https://api.devnet.aptoslabs.com/v1";

/// The fullnode REST API of a local network
pub const LOCAL_NODE_URL: &str = "http://127.0.0.1:8080/v1";

/// The testnet faucet
pub const TESTNET_FAUCET_URL: &str = "https://faucet.testnet.aptoslabs.com";

/// The devnet faucet
pub const DEVNET_FAUCET_URL: &str = "https://faucet.devnet.aptoslabs.com";

/// The faucet of a local network
pub const LOCAL_FAUCET_URL: &str = "http://127.0.0.1:8081";
