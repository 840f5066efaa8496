//! EIP-712 hash of Safe operations, the digest owners sign
//!
//! The Safe 4337 module verifies signatures over a `SafeOp` struct that mirrors the user operation
//! plus a validity window and the entry point. The domain binds the digest to a chain and to the
//! module as verifying contract.

use crate::error::{SafeAccountError, SafeAccountResult};
use ethers::{
    abi::AbiEncode,
    contract::{EthAbiCodec, EthAbiType},
    types::{Address, H256, U256},
    utils::keccak256,
};
use lazy_static::lazy_static;
use safe4337_primitives::{
    constants::{eip712, gas::UINT48_MAX},
    SafeOperationHash, UserOperation, UserOperationV6, UserOperationV7,
};

lazy_static! {
    static ref DOMAIN_TYPE_HASH: H256 = keccak256(eip712::DOMAIN_TYPE).into();
    static ref SAFE_OP_V6_TYPE_HASH: H256 = keccak256(eip712::SAFE_OP_V6_TYPE).into();
    static ref SAFE_OP_V7_TYPE_HASH: H256 = keccak256(eip712::SAFE_OP_V7_TYPE).into();
}

/// `EIP712Domain(uint256 chainId,address verifyingContract)`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SafeOperationDomain {
    pub chain_id: U256,
    pub verifying_contract: Address,
}

#[derive(EthAbiCodec, EthAbiType)]
struct DomainStruct {
    type_hash: H256,
    chain_id: U256,
    verifying_contract: Address,
}

impl SafeOperationDomain {
    pub fn new(chain_id: u64, verifying_contract: Address) -> Self {
        Self { chain_id: chain_id.into(), verifying_contract }
    }

    pub fn separator(&self) -> H256 {
        keccak256(
            DomainStruct {
                type_hash: *DOMAIN_TYPE_HASH,
                chain_id: self.chain_id,
                verifying_contract: self.verifying_contract,
            }
            .encode(),
        )
        .into()
    }
}

/// Fields hashed next to the user operation
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SafeOperationContext {
    pub valid_after: u64,
    pub valid_until: u64,
    pub entry_point: Address,
}

/// Both variants share the layout, only the type hash (and the width of some gas fields in the
/// type string) differs. Bytes fields are hashed.
#[derive(EthAbiCodec, EthAbiType)]
struct SafeOpStruct {
    type_hash: H256,
    safe: Address,
    nonce: U256,
    init_code: H256,
    call_data: H256,
    gas_0: U256,
    gas_1: U256,
    pre_verification_gas: U256,
    fee_0: U256,
    fee_1: U256,
    paymaster_and_data: H256,
    valid_after: U256,
    valid_until: U256,
    entry_point: Address,
}

fn check_uint48(name: &str, value: u64) -> SafeAccountResult<()> {
    if value > UINT48_MAX {
        return Err(SafeAccountError::validation(format!("{name} {value} doesn't fit in uint48")));
    }
    Ok(())
}

fn check_uint128(name: &str, value: U256) -> SafeAccountResult<()> {
    if value.bits() > 128 {
        return Err(SafeAccountError::validation(format!("{name} {value} doesn't fit in uint128")));
    }
    Ok(())
}

fn struct_hash_v6(uo: &UserOperationV6, ctx: &SafeOperationContext) -> H256 {
    let safe_op = SafeOpStruct {
        type_hash: *SAFE_OP_V6_TYPE_HASH,
        safe: uo.sender,
        nonce: uo.nonce,
        init_code: keccak256(&uo.init_code).into(),
        call_data: keccak256(&uo.call_data).into(),
        gas_0: uo.call_gas_limit,
        gas_1: uo.verification_gas_limit,
        pre_verification_gas: uo.pre_verification_gas,
        fee_0: uo.max_fee_per_gas,
        fee_1: uo.max_priority_fee_per_gas,
        paymaster_and_data: keccak256(&uo.paymaster_and_data).into(),
        valid_after: ctx.valid_after.into(),
        valid_until: ctx.valid_until.into(),
        entry_point: ctx.entry_point,
    };
    keccak256(safe_op.encode()).into()
}

fn struct_hash_v7(uo: &UserOperationV7, ctx: &SafeOperationContext) -> SafeAccountResult<H256> {
    check_uint128("verificationGasLimit", uo.verification_gas_limit)?;
    check_uint128("callGasLimit", uo.call_gas_limit)?;
    check_uint128("maxPriorityFeePerGas", uo.max_priority_fee_per_gas)?;
    check_uint128("maxFeePerGas", uo.max_fee_per_gas)?;
    if let Some(gas) = uo.paymaster_verification_gas_limit {
        check_uint128("paymasterVerificationGasLimit", gas)?;
    }
    if let Some(gas) = uo.paymaster_post_op_gas_limit {
        check_uint128("paymasterPostOpGasLimit", gas)?;
    }

    let init_code = safe4337_primitives::pack_factory_data(uo.factory, uo.factory_data.as_deref());
    let paymaster_and_data = safe4337_primitives::pack_paymaster_data(
        uo.paymaster,
        uo.paymaster_verification_gas_limit,
        uo.paymaster_post_op_gas_limit,
        uo.paymaster_data.as_deref(),
    );

    let safe_op = SafeOpStruct {
        type_hash: *SAFE_OP_V7_TYPE_HASH,
        safe: uo.sender,
        nonce: uo.nonce,
        init_code: keccak256(init_code).into(),
        call_data: keccak256(&uo.call_data).into(),
        gas_0: uo.verification_gas_limit,
        gas_1: uo.call_gas_limit,
        pre_verification_gas: uo.pre_verification_gas,
        fee_0: uo.max_priority_fee_per_gas,
        fee_1: uo.max_fee_per_gas,
        paymaster_and_data: keccak256(paymaster_and_data).into(),
        valid_after: ctx.valid_after.into(),
        valid_until: ctx.valid_until.into(),
        entry_point: ctx.entry_point,
    };
    Ok(keccak256(safe_op.encode()).into())
}

/// `keccak256(0x1901 ‖ domainSeparator ‖ structHash)` of the Safe operation
///
/// Absent v0.7 paymaster sub-fields are left out of the merged paymaster blob rather than
/// zero-filled.
pub fn hash(
    uo: &UserOperation,
    domain: &SafeOperationDomain,
    ctx: &SafeOperationContext,
) -> SafeAccountResult<SafeOperationHash> {
    check_uint48("validAfter", ctx.valid_after)?;
    check_uint48("validUntil", ctx.valid_until)?;

    let struct_hash = match uo {
        UserOperation::V6(uo) => struct_hash_v6(uo, ctx),
        UserOperation::V7(uo) => struct_hash_v7(uo, ctx)?,
    };

    Ok(H256::from(keccak256(
        [&[0x19, 0x01][..], domain.separator().as_bytes(), struct_hash.as_bytes()].concat(),
    ))
    .into())
}
