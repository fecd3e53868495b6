//! The first deployment of the Metrom package

crate::chain_registry! {
    name: "v1";
    format: crate::AddressFormat::APTOS;
    provenance: BlockCreated;
    chains {
        /// Aptos devnet
        Devnet = "devnet" => "0x280de537562f50a78bba408ac0ea6c9ea8e661222e22734cc8315d8b3341a705" @ 15406126,
    }
}

#[cfg(test)]
mod tests {
    use super::{resolve, SupportedChain};

    #[test]
    fn test_resolve_devnet() {
        let contract = resolve(SupportedChain::Devnet);

        assert_eq!(
            contract.address,
            "0x280de537562f50a78bba408ac0ea6c9ea8e661222e22734cc8315d8b3341a705"
        );
        assert_eq!(contract.block_created(), Some(15406126));
        assert_eq!(contract.version_created(), None);
    }

    #[test]
    fn test_only_devnet_is_supported() {
        assert_eq!(SupportedChain::ALL, &[SupportedChain::Devnet]);
        assert_eq!("devnet".parse::<SupportedChain>(), Ok(SupportedChain::Devnet));
        assert!("testnet".parse::<SupportedChain>().is_err());
        assert!("mainnet".parse::<SupportedChain>().is_err());
    }
}
