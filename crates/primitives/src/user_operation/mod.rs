//! User operations of the two entry point versions the Safe 4337 module supports

mod hash;
mod packed;

use crate::utils::{as_checksum_addr, get_address};
use ethers::{
    abi::AbiEncode,
    contract::{EthAbiCodec, EthAbiType},
    types::{Address, Bytes, H256, U256},
    utils::keccak256,
};
pub use hash::{SafeOperationHash, UserOperationHash};
pub use packed::UserOperationV7;
use serde::{Deserialize, Serialize};
use std::ops::Deref;

/// User operation for entry point v0.6 (init code and paymaster data as merged blobs)
#[derive(
    Default,
    Clone,
    Debug,
    Ord,
    PartialOrd,
    PartialEq,
    Eq,
    EthAbiCodec,
    EthAbiType,
    Serialize,
    Deserialize,
)]
#[serde(rename_all = "camelCase")]
pub struct UserOperationV6 {
    /// Sender of the user operation
    #[serde(serialize_with = "as_checksum_addr")]
    pub sender: Address,

    /// Nonce (anti replay protection)
    pub nonce: U256,

    /// Init code for the account (needed if account not yet deployed and needs to be created)
    pub init_code: Bytes,

    /// The data that is passed to the sender during the main execution call
    pub call_data: Bytes,

    /// The amount of gas to allocate for the main execution call
    pub call_gas_limit: U256,

    /// The amount of gas to allocate for the verification step
    pub verification_gas_limit: U256,

    /// The amount of gas to pay bundler to compensate for the pre-verification execution and
    /// calldata
    pub pre_verification_gas: U256,

    /// Maximum fee per gas (similar to EIP-1559)
    pub max_fee_per_gas: U256,

    /// Maximum priority fee per gas (similar to EIP-1559)
    pub max_priority_fee_per_gas: U256,

    /// Address of paymaster sponsoring the user operation, followed by extra data to send to the
    /// paymaster (can be empty)
    pub paymaster_and_data: Bytes,

    /// Data passed to the account along with the nonce during the verification step
    pub signature: Bytes,
}

/// User operation without signature (helper for packing user operation)
#[derive(EthAbiCodec, EthAbiType)]
struct UserOperationNoSignature {
    pub sender: Address,
    pub nonce: U256,
    pub init_code: H256,
    pub call_data: H256,
    pub call_gas_limit: U256,
    pub verification_gas_limit: U256,
    pub pre_verification_gas: U256,
    pub max_fee_per_gas: U256,
    pub max_priority_fee_per_gas: U256,
    pub paymaster_and_data: H256,
}

impl From<UserOperationV6> for UserOperationNoSignature {
    fn from(value: UserOperationV6) -> Self {
        Self {
            sender: value.sender,
            nonce: value.nonce,
            init_code: keccak256(value.init_code.deref()).into(),
            call_data: keccak256(value.call_data.deref()).into(),
            call_gas_limit: value.call_gas_limit,
            verification_gas_limit: value.verification_gas_limit,
            pre_verification_gas: value.pre_verification_gas,
            max_fee_per_gas: value.max_fee_per_gas,
            max_priority_fee_per_gas: value.max_priority_fee_per_gas,
            paymaster_and_data: keccak256(value.paymaster_and_data.deref()).into(),
        }
    }
}

/// Final entry point hash over the packed operation, the entry point and the chain
pub(crate) fn entry_point_hash(
    packed: &[u8],
    entry_point: &Address,
    chain_id: u64,
) -> UserOperationHash {
    H256::from(keccak256(
        [keccak256(packed).to_vec(), entry_point.encode(), U256::from(chain_id).encode()].concat(),
    ))
    .into()
}

impl UserOperationV6 {
    /// Packs the user operation without signature to bytes (used for calculating the hash)
    pub fn pack_without_signature(&self) -> Bytes {
        let user_operation_packed = UserOperationNoSignature::from(self.clone());
        user_operation_packed.encode().into()
    }

    /// Calculates the hash of the user operation
    pub fn hash(&self, entry_point: &Address, chain_id: u64) -> UserOperationHash {
        entry_point_hash(&self.pack_without_signature(), entry_point, chain_id)
    }

    /// Factory address encoded in the init code (if any)
    pub fn factory(&self) -> Option<Address> {
        get_address(&self.init_code)
    }

    // Builder pattern helpers

    /// Sets the sender of the user operation
    pub fn sender(mut self, sender: Address) -> Self {
        self.sender = sender;
        self
    }

    /// Sets the nonce of the user operation
    pub fn nonce(mut self, nonce: U256) -> Self {
        self.nonce = nonce;
        self
    }

    /// Sets the init code of the user operation
    pub fn init_code(mut self, init_code: Bytes) -> Self {
        self.init_code = init_code;
        self
    }

    /// Sets the call data of the user operation
    pub fn call_data(mut self, call_data: Bytes) -> Self {
        self.call_data = call_data;
        self
    }

    /// Sets the call gas limit of the user operation
    pub fn call_gas_limit(mut self, call_gas_limit: U256) -> Self {
        self.call_gas_limit = call_gas_limit;
        self
    }

    /// Sets the verification gas limit of the user operation
    pub fn verification_gas_limit(mut self, verification_gas_limit: U256) -> Self {
        self.verification_gas_limit = verification_gas_limit;
        self
    }

    /// Sets the pre-verification gas of the user operation
    pub fn pre_verification_gas(mut self, pre_verification_gas: U256) -> Self {
        self.pre_verification_gas = pre_verification_gas;
        self
    }

    /// Sets the max fee per gas of the user operation
    pub fn max_fee_per_gas(mut self, max_fee_per_gas: U256) -> Self {
        self.max_fee_per_gas = max_fee_per_gas;
        self
    }

    /// Sets the max priority fee per gas of the user operation
    pub fn max_priority_fee_per_gas(mut self, max_priority_fee_per_gas: U256) -> Self {
        self.max_priority_fee_per_gas = max_priority_fee_per_gas;
        self
    }

    /// Sets the paymaster and data of the user operation
    pub fn paymaster_and_data(mut self, paymaster_and_data: Bytes) -> Self {
        self.paymaster_and_data = paymaster_and_data;
        self
    }

    /// Sets the signature of the user operation
    pub fn signature(mut self, signature: Bytes) -> Self {
        self.signature = signature;
        self
    }
}

/// User operation of either wire shape
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserOperation {
    /// Entry point v0.6, merged-blob shape
    V6(UserOperationV6),
    /// Entry point v0.7, split-field shape
    V7(UserOperationV7),
}

/// Fields shared by both shapes, borrowed mutably
pub struct UserOperationFieldsMut<'a> {
    pub call_gas_limit: &'a mut U256,
    pub verification_gas_limit: &'a mut U256,
    pub pre_verification_gas: &'a mut U256,
    pub max_fee_per_gas: &'a mut U256,
    pub max_priority_fee_per_gas: &'a mut U256,
    pub signature: &'a mut Bytes,
}

impl UserOperation {
    pub fn sender(&self) -> Address {
        match self {
            UserOperation::V6(uo) => uo.sender,
            UserOperation::V7(uo) => uo.sender,
        }
    }

    pub fn nonce(&self) -> U256 {
        match self {
            UserOperation::V6(uo) => uo.nonce,
            UserOperation::V7(uo) => uo.nonce,
        }
    }

    pub fn call_data(&self) -> &Bytes {
        match self {
            UserOperation::V6(uo) => &uo.call_data,
            UserOperation::V7(uo) => &uo.call_data,
        }
    }

    pub fn signature(&self) -> &Bytes {
        match self {
            UserOperation::V6(uo) => &uo.signature,
            UserOperation::V7(uo) => &uo.signature,
        }
    }

    pub fn max_fee_per_gas(&self) -> U256 {
        match self {
            UserOperation::V6(uo) => uo.max_fee_per_gas,
            UserOperation::V7(uo) => uo.max_fee_per_gas,
        }
    }

    pub fn max_priority_fee_per_gas(&self) -> U256 {
        match self {
            UserOperation::V6(uo) => uo.max_priority_fee_per_gas,
            UserOperation::V7(uo) => uo.max_priority_fee_per_gas,
        }
    }

    /// Gas limits as (pre verification gas, verification gas limit, call gas limit)
    pub fn gas_limits(&self) -> (U256, U256, U256) {
        match self {
            UserOperation::V6(uo) => {
                (uo.pre_verification_gas, uo.verification_gas_limit, uo.call_gas_limit)
            }
            UserOperation::V7(uo) => {
                (uo.pre_verification_gas, uo.verification_gas_limit, uo.call_gas_limit)
            }
        }
    }

    /// Mutable access to the fields the builder fills in after construction
    pub fn fields_mut(&mut self) -> UserOperationFieldsMut<'_> {
        match self {
            UserOperation::V6(uo) => UserOperationFieldsMut {
                call_gas_limit: &mut uo.call_gas_limit,
                verification_gas_limit: &mut uo.verification_gas_limit,
                pre_verification_gas: &mut uo.pre_verification_gas,
                max_fee_per_gas: &mut uo.max_fee_per_gas,
                max_priority_fee_per_gas: &mut uo.max_priority_fee_per_gas,
                signature: &mut uo.signature,
            },
            UserOperation::V7(uo) => UserOperationFieldsMut {
                call_gas_limit: &mut uo.call_gas_limit,
                verification_gas_limit: &mut uo.verification_gas_limit,
                pre_verification_gas: &mut uo.pre_verification_gas,
                max_fee_per_gas: &mut uo.max_fee_per_gas,
                max_priority_fee_per_gas: &mut uo.max_priority_fee_per_gas,
                signature: &mut uo.signature,
            },
        }
    }

    pub fn set_signature(&mut self, signature: Bytes) {
        *self.fields_mut().signature = signature;
    }

    /// Init code as a single blob (`factory ‖ factoryData` for v0.7)
    pub fn init_code(&self) -> Bytes {
        match self {
            UserOperation::V6(uo) => uo.init_code.clone(),
            UserOperation::V7(uo) => uo.init_code(),
        }
    }

    /// Paymaster fields as a single blob
    pub fn paymaster_and_data(&self) -> Bytes {
        match self {
            UserOperation::V6(uo) => uo.paymaster_and_data.clone(),
            UserOperation::V7(uo) => uo.paymaster_and_data(),
        }
    }

    /// Calculates the entry point hash of the user operation
    pub fn hash(&self, entry_point: &Address, chain_id: u64) -> UserOperationHash {
        match self {
            UserOperation::V6(uo) => uo.hash(entry_point, chain_id),
            UserOperation::V7(uo) => uo.hash(entry_point, chain_id),
        }
    }

    pub fn is_v6(&self) -> bool {
        matches!(self, UserOperation::V6(_))
    }
}

impl From<UserOperationV6> for UserOperation {
    fn from(value: UserOperationV6) -> Self {
        UserOperation::V6(value)
    }
}

impl From<UserOperationV7> for UserOperation {
    fn from(value: UserOperationV7) -> Self {
        UserOperation::V7(value)
    }
}

/// Gas estimations for user operation (returned from the RPC endpoint eth_estimateUserOperationGas)
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserOperationGasEstimation {
    pub pre_verification_gas: U256,
    pub verification_gas_limit: U256,
    pub call_gas_limit: U256,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn user_operation_pack_without_signature() {
        let uos =  vec![
            UserOperationV6::default().verification_gas_limit(100_000.into()).pre_verification_gas(21_000.into()).max_priority_fee_per_gas(1_000_000_000.into()),
            UserOperationV6 {
                sender: "0x9c5754De1443984659E1b3a8d1931D83475ba29C".parse().unwrap(),
                nonce: 1.into(),
                init_code: Bytes::default(),
                call_data: "0xb61d27f60000000000000000000000009c5754de1443984659e1b3a8d1931d83475ba29c00000000000000000000000000000000000000000000000000005af3107a400000000000000000000000000000000000000000000000000000000000000000600000000000000000000000000000000000000000000000000000000000000000".parse().unwrap(),
                call_gas_limit: 33_100.into(),
                verification_gas_limit: 60_624.into(),
                pre_verification_gas: 44_056.into(),
                max_fee_per_gas: 1_695_000_030_u64.into(),
                max_priority_fee_per_gas: 1_695_000_000.into(),
                paymaster_and_data: Bytes::default(),
                signature: "0x37540ca4f91a9f08993ba4ebd4b7473902f69864c98951f9db8cb47b78764c1a13ad46894a96dc0cad68f9207e49b4dbb897f25f47f040cec2a636a8201c1cd71b".parse().unwrap(),
            },
        ];
        assert_eq!(uos[0].pack_without_signature(), "0x00000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000186a000000000000000000000000000000000000000000000000000000000000052080000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000003b9aca00c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470".parse::<Bytes>().unwrap());
        assert_eq!(uos[1].pack_without_signature(), "0x0000000000000000000000009c5754de1443984659e1b3a8d1931d83475ba29c0000000000000000000000000000000000000000000000000000000000000001c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470f7def7aeb687d6992b466243b713223689982cefca0f91a1f5c5f60adb532b93000000000000000000000000000000000000000000000000000000000000814c000000000000000000000000000000000000000000000000000000000000ecd0000000000000000000000000000000000000000000000000000000000000ac18000000000000000000000000000000000000000000000000000000006507a5de000000000000000000000000000000000000000000000000000000006507a5c0c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470".parse::<Bytes>().unwrap());
    }

    #[test]
    fn user_operation_hash() {
        let uos =  vec![
            UserOperationV6::default().verification_gas_limit(100_000.into()).pre_verification_gas(21_000.into()).max_priority_fee_per_gas(1_000_000_000.into()),
            UserOperationV6 {
                sender: "0x9c5754De1443984659E1b3a8d1931D83475ba29C".parse().unwrap(),
                nonce: U256::zero(),
                init_code: "0x9406cc6185a346906296840746125a0e449764545fbfb9cf000000000000000000000000ce0fefa6f7979c4c9b5373e0f5105b7259092c6d0000000000000000000000000000000000000000000000000000000000000000".parse().unwrap(),
                call_data: "0xb61d27f60000000000000000000000009c5754de1443984659e1b3a8d1931d83475ba29c00000000000000000000000000000000000000000000000000005af3107a400000000000000000000000000000000000000000000000000000000000000000600000000000000000000000000000000000000000000000000000000000000000".parse().unwrap(),
                call_gas_limit: 33_100.into(),
                verification_gas_limit: 361_460.into(),
                pre_verification_gas: 44_980.into(),
                max_fee_per_gas: 1_695_000_030_u64.into(),
                max_priority_fee_per_gas: 1_695_000_000.into(),
                paymaster_and_data: Bytes::default(),
                signature: "0xebfd4657afe1f1c05c1ec65f3f9cc992a3ac083c424454ba61eab93152195e1400d74df01fc9fa53caadcb83a891d478b713016bcc0c64307c1ad3d7ea2e2d921b".parse().unwrap(),
            },
        ];
        assert_eq!(
            uos[0].hash(&"0x5FF137D4b0FDCD49DcA30c7CF57E578a026d2789".parse().unwrap(), 80_001),
            "0x95418c07086df02ff6bc9e8bdc150b380cb761beecc098630440bcec6e862702"
                .parse::<H256>()
                .unwrap()
                .into()
        );
        assert_eq!(
            uos[1].hash(&"0x5FF137D4b0FDCD49DcA30c7CF57E578a026d2789".parse().unwrap(), 80_001),
            "0x7c1b8c9df49a9e09ecef0f0fe6841d895850d29820f9a4b494097764085dcd7e"
                .parse::<H256>()
                .unwrap()
                .into()
        );
    }

    #[test]
    fn user_operation_json_selects_shape() {
        let v6 = UserOperation::V6(UserOperationV6::default());
        let json = serde_json::to_string(&v6).unwrap();
        assert!(json.contains("initCode"));
        let back: UserOperation = serde_json::from_str(&json).unwrap();
        assert!(back.is_v6());

        let v7 = UserOperation::V7(UserOperationV7::default());
        let json = serde_json::to_string(&v7).unwrap();
        assert!(!json.contains("initCode"));
        assert!(!json.contains("paymaster"));
        let back: UserOperation = serde_json::from_str(&json).unwrap();
        assert!(!back.is_v6());
    }

    #[test]
    fn fields_mut_updates_both_shapes() {
        for mut uo in
            [UserOperation::V6(Default::default()), UserOperation::V7(Default::default())]
        {
            {
                let fields = uo.fields_mut();
                *fields.call_gas_limit = 3.into();
                *fields.verification_gas_limit = 2.into();
                *fields.pre_verification_gas = 1.into();
            }
            uo.set_signature(Bytes::from(vec![1u8]));
            assert_eq!(uo.gas_limits(), (1.into(), 2.into(), 3.into()));
            assert_eq!(uo.signature().len(), 1);
        }
    }
}
