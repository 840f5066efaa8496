use ethers::types::H256;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

macro_rules! hash_newtype {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(
            Eq, Hash, PartialEq, Debug, Serialize, Deserialize, Clone, Copy, Default, PartialOrd, Ord,
        )]
        pub struct $name(pub H256);

        impl From<H256> for $name {
            fn from(value: H256) -> Self {
                Self(value)
            }
        }

        impl From<$name> for H256 {
            fn from(value: $name) -> Self {
                value.0
            }
        }

        impl From<[u8; 32]> for $name {
            fn from(value: [u8; 32]) -> Self {
                Self(H256::from(value))
            }
        }

        impl FromStr for $name {
            type Err = rustc_hex::FromHexError;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                H256::from_str(s).map(|h| h.into())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{:?}", self.0)
            }
        }

        impl $name {
            #[inline]
            pub const fn as_fixed_bytes(&self) -> &[u8; 32] {
                &self.0 .0
            }
        }
    };
}

hash_newtype!(
    /// Hash of the user operation as computed by the entry point
    UserOperationHash
);

hash_newtype!(
    /// EIP-712 hash of a Safe operation, the digest owners sign
    SafeOperationHash
);
