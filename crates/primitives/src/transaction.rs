//! Meta transactions executed by the Safe account

use crate::{constants::selectors, utils::as_checksum_addr};
use ethers::types::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};

/// How the account performs a meta transaction
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "kebab-case")]
pub enum Operation {
    #[default]
    Call,
    DelegateCall,
}

impl Operation {
    /// Numeric encoding used by the module executor and the multisend payload
    pub fn as_u8(&self) -> u8 {
        match self {
            Operation::Call => 0,
            Operation::DelegateCall => 1,
        }
    }

    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Operation::Call),
            1 => Some(Operation::DelegateCall),
            _ => None,
        }
    }
}

/// Module function that executes the user operation's meta transaction
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[strum(serialize_all = "kebab-case")]
#[serde(rename_all = "camelCase")]
pub enum ExecutorSelector {
    /// `executeUserOp`, reverts without data
    ExecuteUserOp,
    /// `executeUserOpWithErrorString`, bubbles up the revert reason
    #[default]
    ExecuteUserOpWithErrorString,
}

impl ExecutorSelector {
    pub fn selector(&self) -> [u8; 4] {
        match self {
            ExecutorSelector::ExecuteUserOp => selectors::EXECUTE_USER_OP,
            ExecutorSelector::ExecuteUserOpWithErrorString => {
                selectors::EXECUTE_USER_OP_WITH_ERROR_STRING
            }
        }
    }

    /// Matches the leading 4 bytes of call data against the known executors
    pub fn from_call_data(call_data: &[u8]) -> Option<Self> {
        if call_data.starts_with(&selectors::EXECUTE_USER_OP_WITH_ERROR_STRING) {
            Some(ExecutorSelector::ExecuteUserOpWithErrorString)
        } else if call_data.starts_with(&selectors::EXECUTE_USER_OP) {
            Some(ExecutorSelector::ExecuteUserOp)
        } else {
            None
        }
    }
}

/// A single call the Safe account executes (atomic unit of a batch)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetaTransaction {
    /// Target of the call
    #[serde(serialize_with = "as_checksum_addr")]
    pub to: Address,
    /// Amount of native token sent with the call
    #[serde(default)]
    pub value: U256,
    /// Calldata
    #[serde(default)]
    pub data: Bytes,
    /// Call or delegatecall
    #[serde(default)]
    pub operation: Operation,
}

impl MetaTransaction {
    pub fn new(to: Address, value: U256, data: Bytes, operation: Operation) -> Self {
        Self { to, value, data, operation }
    }

    /// A plain call without value
    pub fn call(to: Address, data: Bytes) -> Self {
        Self::new(to, U256::zero(), data, Operation::Call)
    }

    /// A delegatecall without value
    pub fn delegate_call(to: Address, data: Bytes) -> Self {
        Self::new(to, U256::zero(), data, Operation::DelegateCall)
    }
}
