//! Deployment addresses and per-call options

use ethers::types::{spoof, Address, Bytes, H256, U256};
use safe4337_primitives::{
    constants::{entry_point, module, safe, webauthn},
    ExecutorSelector, SignerSignaturePair,
};
use crate::error::{SafeAccountError, SafeAccountResult};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Entry point release, decides the user operation wire shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntryPointVersion {
    /// v0.6, merged-blob user operations
    V6,
    /// v0.7, split-field user operations
    V7,
}

/// Contracts backing passkey (WebAuthn) owners
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebAuthnDeployment {
    /// Placeholder owner used until the per-key verifier is swapped in
    pub shared_signer: Address,
    pub signer_factory: Address,
    pub signer_singleton: Address,
    /// EIP-7212 precompile, must have the form `0x000…00XXXX`
    pub precompile_verifier: Address,
    /// Fallback P-256 verifier contract
    pub contract_verifier: Address,
    pub signer_proxy_creation_code: Bytes,
}

impl Default for WebAuthnDeployment {
    fn default() -> Self {
        Self {
            shared_signer: address(webauthn::SHARED_SIGNER),
            signer_factory: address(webauthn::SIGNER_FACTORY),
            signer_singleton: address(webauthn::SIGNER_SINGLETON),
            precompile_verifier: address(webauthn::PRECOMPILE),
            contract_verifier: address(webauthn::FCLP256_VERIFIER),
            signer_proxy_creation_code: Bytes::from_str(webauthn::SIGNER_PROXY_CREATION_CODE)
                .unwrap_or_default(),
        }
    }
}

/// Every address and hash a Safe account depends on
///
/// Alternate deployments (test networks, forks) are described by building or deserializing a
/// different value; nothing in the crate reads deployment addresses from anywhere else.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SafeDeployment {
    pub entry_point_version: EntryPointVersion,
    pub entry_point: Address,
    /// Safe 4337 module, also the EIP-712 verifying contract and the fallback handler
    pub safe_4337_module: Address,
    pub safe_module_setup: Address,
    pub multisend: Address,
    pub proxy_factory: Address,
    pub singleton: Address,
    /// keccak256(proxyCreationCode ‖ uint256(singleton))
    pub singleton_init_hash: H256,
    #[serde(default)]
    pub executor_selector: ExecutorSelector,
    #[serde(default)]
    pub webauthn: WebAuthnDeployment,
}

fn address(s: &str) -> Address {
    Address::from_str(s).unwrap_or_default()
}

impl SafeDeployment {
    fn base(
        entry_point_version: EntryPointVersion,
        entry_point: &str,
        safe_4337_module: &str,
        safe_module_setup: &str,
    ) -> Self {
        Self {
            entry_point_version,
            entry_point: address(entry_point),
            safe_4337_module: address(safe_4337_module),
            safe_module_setup: address(safe_module_setup),
            multisend: address(safe::MULTISEND),
            proxy_factory: address(safe::PROXY_FACTORY),
            singleton: address(safe::SINGLETON_L2_V1_4_1),
            singleton_init_hash: H256::from_str(safe::SINGLETON_L2_V1_4_1_INIT_HASH)
                .unwrap_or_default(),
            executor_selector: ExecutorSelector::default(),
            webauthn: WebAuthnDeployment::default(),
        }
    }

    /// Safe 4337 module v0.2.0 on entry point v0.6
    pub fn v0_2_0() -> Self {
        Self::base(
            EntryPointVersion::V6,
            entry_point::ADDRESS_V6,
            module::SAFE_4337_MODULE_V0_2_0,
            module::SAFE_MODULE_SETUP_V0_2_0,
        )
    }

    /// Safe 4337 module v0.3.0 on entry point v0.7
    pub fn v0_3_0() -> Self {
        Self::base(
            EntryPointVersion::V7,
            entry_point::ADDRESS_V7,
            module::SAFE_4337_MODULE_V0_3_0,
            module::SAFE_MODULE_SETUP_V0_3_0,
        )
    }

    pub fn is_v6(&self) -> bool {
        self.entry_point_version == EntryPointVersion::V6
    }
}

/// Options for creating a new account
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitOverrides {
    /// Number of required confirmations, defaults to 1
    pub threshold: Option<u64>,
    /// CREATE2 nonce, different values give different addresses for the same owners
    pub c2_nonce: Option<U256>,
}

impl InitOverrides {
    pub fn threshold(&self) -> u64 {
        self.threshold.unwrap_or(1)
    }

    pub fn c2_nonce(&self) -> U256 {
        self.c2_nonce.unwrap_or_default()
    }
}

/// How the nonce-0 passkey bootstrap treats the shared signer after the owner swap
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WebAuthnBootstrapPolicy {
    /// Append a `configure(0, 0, 0)` delegatecall to the shared signer, wiping the key it stored
    /// in the account's storage during setup
    pub clear_shared_signer: bool,
}

/// Per user operation overrides, every field independently optional
#[derive(Debug, Clone, Default)]
pub struct UserOperationOverrides {
    pub nonce: Option<U256>,
    pub call_data: Option<Bytes>,

    pub max_fee_per_gas: Option<U256>,
    pub max_priority_fee_per_gas: Option<U256>,
    pub pre_verification_gas: Option<U256>,
    pub verification_gas_limit: Option<U256>,
    pub call_gas_limit: Option<U256>,

    /// Added on top of fetched values, in percent
    pub max_fee_per_gas_percentage_multiplier: Option<u64>,
    pub max_priority_fee_per_gas_percentage_multiplier: Option<u64>,
    pub pre_verification_gas_percentage_multiplier: Option<u64>,
    pub verification_gas_limit_percentage_multiplier: Option<u64>,
    pub call_gas_limit_percentage_multiplier: Option<u64>,

    /// Signatures used while estimating gas, defaults to a single EOA dummy
    pub dummy_signatures: Option<Vec<SignerSignaturePair>>,
    pub state_override_set: Option<spoof::State>,
    pub webauthn_bootstrap: WebAuthnBootstrapPolicy,
}

/// `value * (100 + percentage) / 100`, computed in 256 bits
pub(crate) fn apply_percentage(value: U256, percentage: Option<u64>) -> SafeAccountResult<U256> {
    match percentage {
        Some(p) if p > 0 => value
            .checked_mul(U256::from(100) + U256::from(p))
            .map(|scaled| scaled / U256::from(100))
            .ok_or_else(|| {
                SafeAccountError::validation(format!(
                    "{value} with a {p}% multiplier overflows uint256"
                ))
            }),
        _ => Ok(value),
    }
}
