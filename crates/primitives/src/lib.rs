//! Safe account abstraction (ERC-4337) primitive types
//!
//! This crate contains the user operation shapes of both entry point versions, Safe owners and
//! meta transactions, deployment constants and packing helpers.

pub mod constants;
mod signer;
mod transaction;
mod user_operation;
mod utils;

pub use signer::{Signer, SignerSignaturePair, WebAuthnPublicKey};
pub use transaction::{ExecutorSelector, MetaTransaction, Operation};
pub use user_operation::{
    SafeOperationHash, UserOperation, UserOperationFieldsMut, UserOperationGasEstimation,
    UserOperationHash, UserOperationV6, UserOperationV7,
};
pub use utils::{
    as_checksum_addr, as_checksum_addr_opt, get_address, pack_factory_data, pack_paymaster_data,
    pack_uint128, unpack_factory_data, unpack_uint128,
};
