//! Definitions of CLI arguments and commands for the package management scripts

use std::{path::PathBuf, process::ExitCode};

use clap::{Args, Parser, Subcommand};
use tracing::info;
use url::Url;

use crate::{
    client::RestClient,
    commands::{
        distribute_rewards, export_addresses, publish_package, set_minimum_reward_token_ratio,
    },
    constants::{DEFAULT_ARTIFACT_PATH, DEFAULT_FUND_AMOUNT, DEFAULT_PROFILE},
    errors::ScriptError,
    progress::TerminalProgress,
    toolchain::AptosCli,
    types::Deployment,
};

/// The exit code reported when the Aptos CLI exits with a code outside of `0..=255`
const EXIT_CODE_OUT_OF_RANGE: u8 = 1;

/// Publish and administer the Metrom package on Aptos
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// The script to run
    #[command(subcommand)]
    pub command: Command,
}

/// The available scripts
#[derive(Subcommand)]
pub enum Command {
    /// Publish the package under a fresh account and initialize its state
    PublishPackage(PublishPackageArgs),
    /// Distribute the rewards of a campaign
    DistributeRewards(DistributeRewardsArgs),
    /// Set the minimum reward ratio of a token
    SetMinimumRewardTokenRatio(SetMinimumRewardTokenRatioArgs),
    /// Print the addresses of a deployment
    Addresses(AddressesArgs),
}

impl Command {
    /// Runs the command, returning the exit code of the process
    pub async fn run(self) -> Result<ExitCode, ScriptError> {
        let toolchain = AptosCli::default();

        match self {
            Command::PublishPackage(args) => {
                let mut progress = TerminalProgress;
                let report = publish_package(
                    args,
                    |config| RestClient::new(config.node_url.clone(), config.faucet_url.clone()),
                    &toolchain,
                    &mut progress,
                )
                .await?;

                info!("Module published at {}, owned by {}", report.address, report.owner);
                if let Some(entry) = report.registry_entry {
                    let json = serde_json::to_string_pretty(&entry)
                        .map_err(|e| ScriptError::Serde(e.to_string()))?;
                    println!("{}", json);
                }
                Ok(ExitCode::SUCCESS)
            }
            Command::DistributeRewards(args) => {
                distribute_rewards(args, &toolchain).await.map(exit_code)
            }
            Command::SetMinimumRewardTokenRatio(args) => {
                set_minimum_reward_token_ratio(args, &toolchain)
                    .await
                    .map(exit_code)
            }
            Command::Addresses(args) => {
                let json = serde_json::to_string_pretty(&export_addresses(args)?)
                    .map_err(|e| ScriptError::Serde(e.to_string()))?;
                println!("{}", json);
                Ok(ExitCode::SUCCESS)
            }
        }
    }
}

/// Converts the exit code of an external command into the process's own
fn exit_code(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code).unwrap_or(EXIT_CODE_OUT_OF_RANGE))
}

/// Publish the package and initialize its state
#[derive(Args, Debug, Clone)]
pub struct PublishPackageArgs {
    /// The network on which to deploy (mainnet, testnet, devnet, local or custom)
    #[arg(long)]
    pub network: String,

    /// The updater of the contract
    #[arg(long)]
    pub updater: String,

    /// The initial fee (in ppm)
    #[arg(long)]
    pub fee: u64,

    /// The initial minimum campaign duration in seconds
    #[arg(long)]
    pub minimum_campaign_duration: u64,

    /// The initial maximum campaign duration in seconds
    #[arg(long)]
    pub maximum_campaign_duration: u64,

    /// The owner of the contract, defaulting to the generated deployment account
    #[arg(long)]
    pub owner: Option<String>,

    /// Overrides the fullnode REST API of the network
    #[arg(long, env = "APTOS_NODE_URL")]
    pub node_url: Option<Url>,

    /// Overrides the faucet of the network
    #[arg(long, env = "APTOS_FAUCET_URL")]
    pub faucet_url: Option<Url>,

    /// The directory of the Move package
    #[arg(long, default_value = ".")]
    pub package_dir: PathBuf,

    /// Where to write the compiled publish payload
    #[arg(long, default_value = DEFAULT_ARTIFACT_PATH)]
    pub artifact_path: PathBuf,

    /// The amount, in octas, to fund the deployment account with
    #[arg(long, default_value_t = DEFAULT_FUND_AMOUNT)]
    pub fund_amount: u64,
}

/// Distribute the rewards of a campaign
#[derive(Args, Debug, Clone)]
pub struct DistributeRewardsArgs {
    /// The profile to use in the Aptos CLI
    #[arg(long, default_value = DEFAULT_PROFILE)]
    pub profile: String,

    /// The Metrom module address
    #[arg(long)]
    pub metrom: String,

    /// The id of the campaign to distribute rewards for
    #[arg(long)]
    pub campaign_id: String,

    /// The Merkle root
    #[arg(long)]
    pub root: String,

    /// The data hash
    #[arg(long)]
    pub data_hash: String,
}

/// Set the minimum reward ratio of a token
#[derive(Args, Debug, Clone)]
pub struct SetMinimumRewardTokenRatioArgs {
    /// The profile to use in the Aptos CLI
    #[arg(long, default_value = DEFAULT_PROFILE)]
    pub profile: String,

    /// The Metrom module address
    #[arg(long)]
    pub metrom: String,

    /// The token of which to set the ratio
    #[arg(long)]
    pub token: String,

    /// The ratio
    #[arg(long)]
    pub ratio: String,
}

/// Print the addresses of a deployment
#[derive(Args, Debug, Clone)]
pub struct AddressesArgs {
    /// The deployment to print
    #[arg(long, value_enum, default_value_t = Deployment::V1)]
    pub deployment: Deployment,

    /// Only print the entry of this chain
    #[arg(long)]
    pub chain: Option<String>,
}
