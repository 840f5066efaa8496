//! Entry point v0.7 user operation (split factory and paymaster fields)

use super::{entry_point_hash, UserOperationHash};
use crate::utils::{
    as_checksum_addr, as_checksum_addr_opt, pack_factory_data, pack_paymaster_data, pack_uint128,
};
use ethers::{
    abi::{encode, Token},
    types::{Address, Bytes, U256},
    utils::keccak256,
};
use serde::{Deserialize, Serialize};

/// User operation for entry point v0.7
///
/// Optional fields are left out of the JSON form when absent.
#[derive(Default, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperationV7 {
    #[serde(serialize_with = "as_checksum_addr")]
    pub sender: Address,
    pub nonce: U256,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "as_checksum_addr_opt"
    )]
    pub factory: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factory_data: Option<Bytes>,
    pub call_data: Bytes,
    pub call_gas_limit: U256,
    pub verification_gas_limit: U256,
    pub pre_verification_gas: U256,
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        serialize_with = "as_checksum_addr_opt"
    )]
    pub paymaster: Option<Address>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster_verification_gas_limit: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster_post_op_gas_limit: Option<U256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paymaster_data: Option<Bytes>,
    pub signature: Bytes,
}

impl UserOperationV7 {
    /// `factory ‖ factoryData`, empty without a factory
    pub fn init_code(&self) -> Bytes {
        pack_factory_data(self.factory, self.factory_data.as_deref()).into()
    }

    /// `paymaster ‖ uint128(verificationGas) ‖ uint128(postOpGas) ‖ paymasterData`,
    /// empty without a paymaster. Missing gas limits count as zero.
    pub fn paymaster_and_data(&self) -> Bytes {
        pack_paymaster_data(
            self.paymaster,
            Some(self.paymaster_verification_gas_limit.unwrap_or_default()),
            Some(self.paymaster_post_op_gas_limit.unwrap_or_default()),
            self.paymaster_data.as_deref(),
        )
        .into()
    }

    /// Packs the user operation without signature the way the v0.7 entry point does
    pub fn pack_without_signature(&self) -> Bytes {
        encode(&[
            Token::Address(self.sender),
            Token::Uint(self.nonce),
            Token::FixedBytes(keccak256(self.init_code()).to_vec()),
            Token::FixedBytes(keccak256(&self.call_data).to_vec()),
            Token::FixedBytes(
                pack_uint128(self.verification_gas_limit, self.call_gas_limit).to_vec(),
            ),
            Token::Uint(self.pre_verification_gas),
            Token::FixedBytes(
                pack_uint128(self.max_priority_fee_per_gas, self.max_fee_per_gas).to_vec(),
            ),
            Token::FixedBytes(keccak256(self.paymaster_and_data()).to_vec()),
        ])
        .into()
    }

    /// Calculates the hash of the user operation
    pub fn hash(&self, entry_point: &Address, chain_id: u64) -> UserOperationHash {
        entry_point_hash(&self.pack_without_signature(), entry_point, chain_id)
    }
}
