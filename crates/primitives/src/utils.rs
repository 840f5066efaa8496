//! Misc utils

use ethers::{
    types::{Address, U128, U256},
    utils::to_checksum,
};

/// Converts address to checksum address
pub fn as_checksum_addr<S>(val: &Address, s: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    s.serialize_str(&to_checksum(val, None))
}

/// Converts Option address to checksum
pub fn as_checksum_addr_opt<S>(val: &Option<Address>, s: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    if let Some(addr) = val {
        s.serialize_str(&to_checksum(addr, None))
    } else {
        s.serialize_none()
    }
}

/// If possible, parses address from the first 20 bytes
pub fn get_address(buf: &[u8]) -> Option<Address> {
    if buf.len() >= 20 {
        Some(Address::from_slice(&buf[0..20]))
    } else {
        None
    }
}

/// Truncates a U256 to its low 128 bits, big-endian
fn low_uint128(value: U256) -> [u8; 16] {
    let mut word = [0u8; 32];
    value.to_big_endian(&mut word);
    let mut res = [0u8; 16];
    res.copy_from_slice(&word[16..32]);
    res
}

/// Packs two uint128 into a single word (`a` in the high half)
pub fn pack_uint128(a: U256, b: U256) -> [u8; 32] {
    let mut res = [0u8; 32];
    res[0..16].copy_from_slice(&low_uint128(a));
    res[16..32].copy_from_slice(&low_uint128(b));
    res
}

/// If possible, unpacks two uint128 from the first 32 bytes
pub fn unpack_uint128(buf: &[u8]) -> Option<(U256, U256)> {
    if buf.len() < 32 {
        return None;
    }
    let a = U128::from_big_endian(&buf[0..16]);
    let b = U128::from_big_endian(&buf[16..32]);
    Some((U256::from(a.as_u128()), U256::from(b.as_u128())))
}

/// Merges the split factory fields into an init code blob (`factory ‖ factoryData`).
/// An absent or zero factory yields an empty blob.
pub fn pack_factory_data(factory: Option<Address>, factory_data: Option<&[u8]>) -> Vec<u8> {
    match factory {
        Some(factory) if !factory.is_zero() => {
            [factory.as_bytes(), factory_data.unwrap_or_default()].concat()
        }
        _ => vec![],
    }
}

/// Splits an init code blob back into the factory and its calldata
pub fn unpack_factory_data(init_code: &[u8]) -> Option<(Address, Vec<u8>)> {
    get_address(init_code).map(|factory| (factory, init_code[20..].to_vec()))
}

/// Merges the split paymaster fields into a paymaster-and-data blob:
/// `paymaster ‖ uint128(verificationGas) ‖ uint128(postOpGas) ‖ paymasterData`.
/// Each optional sub-field is omitted when absent; an absent paymaster yields an empty blob.
pub fn pack_paymaster_data(
    paymaster: Option<Address>,
    paymaster_verification_gas_limit: Option<U256>,
    paymaster_post_op_gas_limit: Option<U256>,
    paymaster_data: Option<&[u8]>,
) -> Vec<u8> {
    let Some(paymaster) = paymaster else {
        return vec![];
    };
    let mut res = paymaster.as_bytes().to_vec();
    if let Some(gas) = paymaster_verification_gas_limit {
        res.extend_from_slice(&low_uint128(gas));
    }
    if let Some(gas) = paymaster_post_op_gas_limit {
        res.extend_from_slice(&low_uint128(gas));
    }
    if let Some(data) = paymaster_data {
        res.extend_from_slice(data);
    }
    res
}
