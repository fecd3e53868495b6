//! Invocations of the Aptos CLI

use std::{
    ffi::OsString,
    path::{Path, PathBuf},
    process::Stdio,
};

use tokio::{fs, process::Command};
use tracing::debug;

use crate::{
    constants::{
        APTOS_COMMAND, BUILD_PUBLISH_PAYLOAD_COMMAND, DISTRIBUTE_REWARDS_FUNCTION, MODULE_NAME,
        MOVE_COMMAND, PACKAGE_NAMED_ADDRESS, RUN_COMMAND, SET_MINIMUM_REWARD_TOKEN_RATE_FUNCTION,
        VERSION_FLAG,
    },
    errors::ScriptError,
    types::AccountAddress,
};

/// The exit code reported when a command was terminated without one, e.g. by a signal
const EXIT_CODE_UNKNOWN: i32 = 1;

/// The local tooling used to compile the package and run entry functions.
///
/// Every method awaits the spawned process rather than blocking the runtime.
#[allow(async_fn_in_trait)]
pub trait MoveToolchain {
    /// Whether the tooling is installed
    async fn is_installed(&self) -> bool;

    /// Compiles the package in `package_dir` against the given named address,
    /// writing the publish payload to `output`
    async fn build_publish_payload(
        &self,
        package_dir: &Path,
        named_address: &AccountAddress,
        output: &Path,
    ) -> Result<(), ScriptError>;

    /// Runs an entry function with inherited stdio, returning the tool's exit code
    async fn run_function(&self, call: &MoveRunCall) -> Result<i32, ScriptError>;
}

/// A `move run` invocation of the Aptos CLI
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRunCall {
    /// The CLI profile signing the transaction
    pub profile: String,
    /// The fully qualified function to call
    pub function_id: String,
    /// The CLI-encoded arguments, e.g. `u64:5`
    pub args: Vec<String>,
}

impl MoveRunCall {
    /// Settles the rewards of a campaign
    pub fn distribute_rewards(
        profile: &str,
        metrom: &str,
        campaign_id: &str,
        root: &str,
        data_hash: &str,
    ) -> Self {
        Self {
            profile: profile.to_string(),
            function_id: function_id(metrom, DISTRIBUTE_REWARDS_FUNCTION),
            args: [campaign_id, root, data_hash]
                .iter()
                .map(|value| format!("hex:[\"{}\"]", value))
                .collect(),
        }
    }

    /// Sets the minimum reward rate of a token
    pub fn set_minimum_reward_token_rate(
        profile: &str,
        metrom: &str,
        token: &str,
        ratio: &str,
    ) -> Self {
        Self {
            profile: profile.to_string(),
            function_id: function_id(metrom, SET_MINIMUM_REWARD_TOKEN_RATE_FUNCTION),
            args: vec![format!("address:{}", token), format!("u64:{}", ratio)],
        }
    }

    /// The CLI arguments, excluding the executable
    pub fn to_args(&self) -> Vec<String> {
        let mut args = vec![
            MOVE_COMMAND.to_string(),
            RUN_COMMAND.to_string(),
            "--profile".to_string(),
            self.profile.clone(),
            "--function-id".to_string(),
            self.function_id.clone(),
            "--args".to_string(),
        ];
        args.extend(self.args.iter().cloned());
        args
    }
}

/// The id of a function of the Metrom module published at `metrom`
fn function_id(metrom: &str, function: &str) -> String {
    format!("{}::{}::{}", metrom, MODULE_NAME, function)
}

/// The `build-publish-payload` arguments, excluding the executable
pub fn build_publish_payload_args(
    package_dir: &Path,
    named_address: &AccountAddress,
    output: &Path,
) -> Vec<OsString> {
    vec![
        MOVE_COMMAND.into(),
        BUILD_PUBLISH_PAYLOAD_COMMAND.into(),
        "--package-dir".into(),
        package_dir.as_os_str().to_owned(),
        "--json-output-file".into(),
        output.as_os_str().to_owned(),
        "--named-addresses".into(),
        format!("{}={}", PACKAGE_NAMED_ADDRESS, named_address).into(),
        "--assume-yes".into(),
    ]
}

/// The Aptos CLI installed on the local machine
#[derive(Debug, Clone)]
pub struct AptosCli {
    /// The executable to invoke
    executable: PathBuf,
}

impl Default for AptosCli {
    fn default() -> Self {
        Self {
            executable: PathBuf::from(APTOS_COMMAND),
        }
    }
}

impl AptosCli {
    /// Uses the given executable instead of `aptos` from the `PATH`
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
        }
    }
}

impl MoveToolchain for AptosCli {
    async fn is_installed(&self) -> bool {
        Command::new(&self.executable)
            .arg(VERSION_FLAG)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await
            .is_ok_and(|status| status.success())
    }

    async fn build_publish_payload(
        &self,
        package_dir: &Path,
        named_address: &AccountAddress,
        output: &Path,
    ) -> Result<(), ScriptError> {
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| ScriptError::Compilation(e.to_string()))?;
        }

        let mut cmd = Command::new(&self.executable);
        cmd.args(build_publish_payload_args(package_dir, named_address, output))
            .stdin(Stdio::null());
        debug!("Running {:?}", cmd);

        let out = cmd
            .output()
            .await
            .map_err(|e| ScriptError::Compilation(e.to_string()))?;
        if !out.status.success() {
            return Err(ScriptError::Compilation(format!(
                "{}: {}",
                out.status,
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }

        Ok(())
    }

    async fn run_function(&self, call: &MoveRunCall) -> Result<i32, ScriptError> {
        let mut cmd = Command::new(&self.executable);
        cmd.args(call.to_args())
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        debug!("Running {:?}", cmd);

        let status = cmd
            .status()
            .await
            .map_err(|e| ScriptError::CommandExecution(e.to_string()))?;

        Ok(status.code().unwrap_or(EXIT_CODE_UNKNOWN))
    }
}
