//! Utilities for the package management scripts.

use std::{fs, path::Path};

use addresses::{Registry, UnknownChain};
use serde_json::{Map, Value};

use crate::{
    errors::ScriptError,
    types::{PayloadValue, PublishPayload, PublishPayloadFile},
};

/// Reads the publish payload written by `aptos move build-publish-payload`.
///
/// Argument 0 holds the package metadata, argument 1 the module bytecode.
pub fn read_publish_payload(path: &Path) -> Result<PublishPayload, ScriptError> {
    let contents = fs::read_to_string(path)
        .map_err(|e| ScriptError::ArtifactParsing(format!("{}: {}", path.display(), e)))?;
    let file: PublishPayloadFile =
        serde_json::from_str(&contents).map_err(|e| ScriptError::ArtifactParsing(e.to_string()))?;

    let mut args = file.args.into_iter().map(|arg| arg.value);

    let metadata = match args.next() {
        Some(PayloadValue::Single(metadata)) => metadata,
        _ => {
            return Err(ScriptError::ArtifactParsing(
                "argument 0 must hold the package metadata".to_string(),
            ))
        }
    };
    let modules = match args.next() {
        Some(PayloadValue::Many(modules)) => modules,
        Some(PayloadValue::Single(module)) => vec![module],
        None => {
            return Err(ScriptError::ArtifactParsing(
                "argument 1 must hold the module bytecode".to_string(),
            ))
        }
    };

    Ok(PublishPayload { metadata, modules })
}

/// Serializes a registry instance, or a single chain's entry of it
pub fn registry_json<R: Registry>(chain: Option<&str>) -> Result<Value, ScriptError> {
    let entries = R::entries();

    match chain {
        Some(id) => {
            let (_, contract) = entries
                .into_iter()
                .find(|(chain, _)| chain.to_string() == id)
                .ok_or_else(|| {
                    ScriptError::InvalidArgument(format!(
                        "{} in deployment {}",
                        UnknownChain(id.to_string()),
                        R::NAME
                    ))
                })?;
            serde_json::to_value(contract).map_err(|e| ScriptError::Serde(e.to_string()))
        }
        None => {
            let map = entries
                .into_iter()
                .map(|(chain, contract)| {
                    serde_json::to_value(contract)
                        .map(|value| (chain.to_string(), value))
                        .map_err(|e| ScriptError::Serde(e.to_string()))
                })
                .collect::<Result<Map<String, Value>, _>>()?;
            Ok(Value::Object(map))
        }
    }
}
