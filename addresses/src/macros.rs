//! The macro from which registry instances are generated

/// Declares a registry instance in the enclosing module.
///
/// Generates a `SupportedChain` enum with one variant per entry, a `const`
/// `resolve` function that is total over it, and a `Deployment` marker type
/// implementing [`Registry`](crate::Registry). Addresses are checked against
/// the declared format at compile time.
///
/// ```
/// mod staging {
///     addresses::chain_registry! {
///         name: "staging";
///         format: addresses::AddressFormat::PrefixedHex { len: 4 };
///         provenance: BlockCreated;
///         chains {
///             /// A local network
///             Local = "local" => "0xbeef" @ 12,
///         }
///     }
/// }
///
/// let contract = staging::resolve(staging::SupportedChain::Local);
/// assert_eq!(contract.address, "0xbeef");
/// assert_eq!(contract.block_created(), Some(12));
/// ```
#[macro_export]
macro_rules! chain_registry {
    (
        name: $name:literal;
        format: $format:expr;
        provenance: $kind:ident;
        chains {
            $(
                $(#[$chain_meta:meta])*
                $chain:ident = $id:literal => $address:literal @ $created:literal
            ),+ $(,)?
        }
    ) => {
        /// The networks this deployment exists on
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum SupportedChain {
            $(
                $(#[$chain_meta])*
                $chain,
            )+
        }

        impl SupportedChain {
            /// Every supported chain, in declaration order
            pub const ALL: &'static [SupportedChain] = &[$(SupportedChain::$chain,)+];

            /// The identifier of the chain
            pub const fn id(&self) -> &'static str {
                match self {
                    $(SupportedChain::$chain => $id,)+
                }
            }
        }

        impl ::core::fmt::Display for SupportedChain {
            fn fmt(&self, f: &mut ::core::fmt::Formatter<'_>) -> ::core::fmt::Result {
                f.write_str(self.id())
            }
        }

        impl ::core::str::FromStr for SupportedChain {
            type Err = $crate::UnknownChain;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($id => Ok(SupportedChain::$chain),)+
                    _ => Err($crate::UnknownChain(s.to_string())),
                }
            }
        }

        impl $crate::serde::Serialize for SupportedChain {
            fn serialize<S: $crate::serde::Serializer>(
                &self,
                serializer: S,
            ) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.id())
            }
        }

        /// The name of this deployment
        pub const NAME: &str = $name;

        /// The format every address in this deployment follows
        pub const ADDRESS_FORMAT: $crate::AddressFormat = $format;

        $(const _: () = assert!(ADDRESS_FORMAT.is_valid($address));)+

        /// The contract deployed on the given chain
        pub const fn resolve(chain: SupportedChain) -> $crate::ChainContract {
            match chain {
                $(
                    SupportedChain::$chain => $crate::ChainContract::new(
                        $address,
                        $crate::Provenance::$kind($created),
                    ),
                )+
            }
        }

        /// Marker type exposing this deployment through the `Registry` trait
        #[derive(Debug, Clone, Copy)]
        pub struct Deployment;

        impl $crate::Registry for Deployment {
            type Chain = SupportedChain;

            const NAME: &'static str = NAME;
            const FORMAT: $crate::AddressFormat = ADDRESS_FORMAT;
            const PROVENANCE: $crate::ProvenanceKind = $crate::Provenance::$kind(0).kind();

            fn chains() -> &'static [SupportedChain] {
                SupportedChain::ALL
            }

            fn resolve(chain: SupportedChain) -> $crate::ChainContract {
                resolve(chain)
            }
        }
    };
}
