//! MultiSend payload codec
//!
//! Each record is packed as `operation (1) ‖ to (20) ‖ value (32) ‖ len(data) (32) ‖ data`.

use crate::{
    error::{SafeAccountError, SafeAccountResult},
    utils::encode_call,
};
use ethers::{
    abi::{decode as abi_decode, ParamType, Token},
    types::{Address, Bytes, U256},
};
use safe4337_primitives::{constants::selectors, MetaTransaction, Operation};

const HEADER_LEN: usize = 1 + 20 + 32 + 32;

/// Packs transactions into a MultiSend payload
pub fn encode(txs: &[MetaTransaction]) -> Bytes {
    let mut res = Vec::with_capacity(txs.iter().map(|tx| HEADER_LEN + tx.data.len()).sum());
    for tx in txs {
        let mut value = [0u8; 32];
        tx.value.to_big_endian(&mut value);
        let mut len = [0u8; 32];
        U256::from(tx.data.len()).to_big_endian(&mut len);

        res.push(tx.operation.as_u8());
        res.extend_from_slice(tx.to.as_bytes());
        res.extend_from_slice(&value);
        res.extend_from_slice(&len);
        res.extend_from_slice(&tx.data);
    }
    res.into()
}

/// `multiSend(bytes)` call data wrapping the packed transactions
pub fn encode_call_data(txs: &[MetaTransaction]) -> Bytes {
    encode_call(selectors::MULTISEND, &[Token::Bytes(encode(txs).to_vec())])
}

/// Extracts the packed payload from `multiSend(bytes)` call data
pub fn decode(call_data: &[u8]) -> SafeAccountResult<Bytes> {
    if !is_multisend(call_data) {
        return Err(SafeAccountError::bad_data(
            "call data is not a multiSend(bytes) call",
            call_data.to_vec(),
        ));
    }
    abi_decode(&[ParamType::Bytes], &call_data[4..])
        .ok()
        .and_then(|tokens| tokens.into_iter().next())
        .and_then(Token::into_bytes)
        .map(Bytes::from)
        .ok_or_else(|| {
            SafeAccountError::bad_data("invalid multiSend(bytes) arguments", call_data.to_vec())
        })
}

/// Unpacks a MultiSend payload back into transactions
pub fn decode_list(blob: &[u8]) -> SafeAccountResult<Vec<MetaTransaction>> {
    let mut txs = vec![];
    let mut rest = blob;
    while !rest.is_empty() {
        if rest.len() < HEADER_LEN {
            return Err(SafeAccountError::bad_data(
                format!("truncated multisend record header at offset {}", blob.len() - rest.len()),
                blob.to_vec(),
            ));
        }
        let operation = Operation::from_u8(rest[0]).ok_or_else(|| {
            SafeAccountError::bad_data(format!("unknown operation {}", rest[0]), blob.to_vec())
        })?;
        let to = Address::from_slice(&rest[1..21]);
        let value = U256::from_big_endian(&rest[21..53]);
        let len = U256::from_big_endian(&rest[53..HEADER_LEN]);
        let body = &rest[HEADER_LEN..];
        if len > U256::from(body.len()) {
            return Err(SafeAccountError::bad_data(
                format!("multisend record data length {len} exceeds the remaining {} bytes", body.len()),
                blob.to_vec(),
            ));
        }
        let len = len.as_usize();
        txs.push(MetaTransaction::new(to, value, body[..len].to_vec().into(), operation));
        rest = &body[len..];
    }
    Ok(txs)
}

pub fn is_multisend(call_data: &[u8]) -> bool {
    call_data.starts_with(&selectors::MULTISEND)
}
