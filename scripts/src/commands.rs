//! Implementations of the various package management scripts

use serde_json::Value;
use tracing::{info, warn};

use crate::{
    cli::{
        AddressesArgs, DistributeRewardsArgs, PublishPackageArgs,
        SetMinimumRewardTokenRatioArgs,
    },
    client::AptosClient,
    errors::ScriptError,
    progress::Progress,
    publish::{PublishConfig, PublishReport, Publisher},
    toolchain::{MoveRunCall, MoveToolchain},
    types::Deployment,
    utils::registry_json,
};

/// Publishes the package under a fresh account and initializes its state.
///
/// The arguments are validated before anything else happens: `connect` is only
/// called, and the toolchain only touched, once they are known to be good.
pub async fn publish_package<C, T, P, F>(
    args: PublishPackageArgs,
    connect: F,
    toolchain: &T,
    progress: &mut P,
) -> Result<PublishReport, ScriptError>
where
    C: AptosClient,
    T: MoveToolchain,
    P: Progress,
    F: FnOnce(&PublishConfig) -> Result<C, ScriptError>,
{
    let config = PublishConfig::try_from(args)?;

    if !toolchain.is_installed().await {
        warn!("The Aptos CLI is not installed. Please install it from the instructions on aptos.dev");
    }

    let client = connect(&config)?;
    Publisher::new(&config, &client, toolchain, progress)
        .run()
        .await
}

/// Settles a campaign's rewards, returning the exit code of the Aptos CLI
pub async fn distribute_rewards(
    args: DistributeRewardsArgs,
    toolchain: &impl MoveToolchain,
) -> Result<i32, ScriptError> {
    let call = MoveRunCall::distribute_rewards(
        &args.profile,
        &args.metrom,
        &args.campaign_id,
        &args.root,
        &args.data_hash,
    );
    info!("Distributing rewards for campaign {}", args.campaign_id);

    toolchain.run_function(&call).await
}

/// Sets the minimum reward rate of a token, returning the exit code of the Aptos CLI
pub async fn set_minimum_reward_token_ratio(
    args: SetMinimumRewardTokenRatioArgs,
    toolchain: &impl MoveToolchain,
) -> Result<i32, ScriptError> {
    let call = MoveRunCall::set_minimum_reward_token_rate(
        &args.profile,
        &args.metrom,
        &args.token,
        &args.ratio,
    );
    info!("Setting the minimum reward ratio of {} to {}", args.token, args.ratio);

    toolchain.run_function(&call).await
}

/// Exports the addresses of a deployment
pub fn export_addresses(args: AddressesArgs) -> Result<Value, ScriptError> {
    let chain = args.chain.as_deref();
    match args.deployment {
        Deployment::V1 => registry_json::<addresses::v1::Deployment>(chain),
    }
}
