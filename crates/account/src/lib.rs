//! Safe (ERC-4337) account
//!
//! Address derivation, call data codecs, EIP-712 hashing of Safe operations, signature assembly
//! and building of user operations for Safe accounts running the Safe 4337 module.

mod account;
pub mod address;
mod builder;
pub mod call_data;
pub mod config;
pub mod eip712;
mod error;
pub mod initializer;
pub mod multisend;
pub mod owners;
pub mod provider;
pub mod signature;
mod utils;

pub use account::SafeAccount;
pub use builder::{Collaborators, OperationBuilder, PendingWebAuthnOwner, UserOperationDraft};
pub use config::{
    EntryPointVersion, InitOverrides, SafeDeployment, UserOperationOverrides, WebAuthnBootstrapPolicy,
    WebAuthnDeployment,
};
pub use eip712::{SafeOperationContext, SafeOperationDomain};
pub use error::{SafeAccountError, SafeAccountResult};
pub use provider::{
    BundlerClient, CallProvider, CodeProvider, EthClient, FeeProvider, GasEstimator, NonceProvider,
};
pub use signature::{create_webauthn_signature, format_eip712_signatures, SignatureValidity};
pub use utils::encode_call;
