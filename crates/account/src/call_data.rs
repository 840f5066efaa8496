//! Call data of the Safe 4337 module executor (`executeUserOp` and `executeUserOpWithErrorString`)

use crate::{
    error::{SafeAccountError, SafeAccountResult},
    multisend,
    utils::encode_call,
};
use ethers::{
    abi::{decode as abi_decode, ParamType, Token},
    types::{Address, Bytes, U256},
    utils::hex,
};
use safe4337_primitives::{constants::selectors, ExecutorSelector, MetaTransaction, Operation};

/// Executor call for a single transaction: `selector(to, value, data, operation)`
pub fn encode_single(tx: &MetaTransaction, selector: ExecutorSelector) -> Bytes {
    encode_call(
        selector.selector(),
        &[
            Token::Address(tx.to),
            Token::Uint(tx.value),
            Token::Bytes(tx.data.to_vec()),
            Token::Uint(tx.operation.as_u8().into()),
        ],
    )
}

/// Executor call delegating to MultiSend with all transactions packed
pub fn encode_batch(
    txs: &[MetaTransaction],
    selector: ExecutorSelector,
    multisend: Address,
) -> SafeAccountResult<Bytes> {
    if txs.is_empty() {
        return Err(SafeAccountError::validation("there should be at least one meta transaction"));
    }
    Ok(encode_single(
        &MetaTransaction::delegate_call(multisend, multisend::encode_call_data(txs)),
        selector,
    ))
}

/// Single transaction as is, more than one as a MultiSend batch
pub fn encode(
    txs: &[MetaTransaction],
    selector: ExecutorSelector,
    multisend: Address,
) -> SafeAccountResult<Bytes> {
    match txs {
        [tx] => Ok(encode_single(tx, selector)),
        _ => encode_batch(txs, selector, multisend),
    }
}

/// Decodes executor call data into the transaction it executes
pub fn decode(call_data: &[u8]) -> SafeAccountResult<(MetaTransaction, ExecutorSelector)> {
    let selector = ExecutorSelector::from_call_data(call_data).ok_or_else(|| {
        SafeAccountError::bad_data(
            format!(
                "invalid call data, should start with 0x{} or 0x{}",
                hex::encode(selectors::EXECUTE_USER_OP_WITH_ERROR_STRING),
                hex::encode(selectors::EXECUTE_USER_OP)
            ),
            call_data.to_vec(),
        )
    })?;

    let invalid = || SafeAccountError::bad_data("invalid executor arguments", call_data.to_vec());
    let tokens = abi_decode(
        &[ParamType::Address, ParamType::Uint(256), ParamType::Bytes, ParamType::Uint(8)],
        &call_data[4..],
    )
    .map_err(|_| invalid())?;
    let [to, value, data, operation]: [Token; 4] = tokens.try_into().map_err(|_| invalid())?;

    let to = to.into_address().ok_or_else(invalid)?;
    let value = value.into_uint().ok_or_else(invalid)?;
    let data = data.into_bytes().ok_or_else(invalid)?;
    let operation = operation
        .into_uint()
        .filter(|op| *op <= U256::from(u8::MAX))
        .and_then(|op| Operation::from_u8(op.as_u32() as u8))
        .ok_or_else(invalid)?;

    Ok((MetaTransaction::new(to, value, data.into(), operation), selector))
}

/// Appends `token.approve(spender, amount)` to the transactions of `call_data`
///
/// Call data already delegating to MultiSend gets the approve appended to its batch; single
/// transaction call data is turned into a two transaction batch. The executor selector is kept.
pub fn prepend_approve(
    call_data: &[u8],
    token: Address,
    spender: Address,
    amount: U256,
    multisend: Address,
) -> SafeAccountResult<Bytes> {
    let (tx, selector) = decode(call_data)?;

    let approve = MetaTransaction::call(
        token,
        encode_call(selectors::APPROVE, &[Token::Address(spender), Token::Uint(amount)]),
    );
    let approve = multisend::encode(&[approve]);

    let payload = if multisend::is_multisend(&tx.data) {
        multisend::decode(&tx.data)?
    } else {
        multisend::encode(&[tx])
    };
    let payload = [&payload[..], &approve[..]].concat();

    Ok(encode_single(
        &MetaTransaction::delegate_call(
            multisend,
            encode_call(selectors::MULTISEND, &[Token::Bytes(payload)]),
        ),
        selector,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tx() -> MetaTransaction {
        MetaTransaction::new(
            "0xbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb2".parse().unwrap(),
            U256::zero(),
            Bytes::default(),
            Operation::Call,
        )
    }

    #[test]
    fn single_layout() {
        let call_data = encode_single(&tx(), ExecutorSelector::ExecuteUserOpWithErrorString);
        assert_eq!(&call_data[..4], &[0x54, 0x1d, 0x63, 0xc8]);
        // to, value, offset, operation, len(data)
        assert_eq!(call_data.len(), 4 + 5 * 32);
        assert_eq!(call_data[4 + 3 * 32 - 1], 0x80);
    }

    #[test]
    fn decode_single_for_both_selectors() {
        let tx = MetaTransaction::new(
            Address::repeat_byte(0x42),
            1_000.into(),
            vec![0xca, 0xfe, 0xba, 0xbe, 0x01].into(),
            Operation::DelegateCall,
        );
        for selector in [ExecutorSelector::ExecuteUserOp, ExecutorSelector::ExecuteUserOpWithErrorString]
        {
            assert_eq!(decode(&encode_single(&tx, selector)).unwrap(), (tx.clone(), selector));
        }
    }

    #[test]
    fn decode_unknown_selector() {
        let err = decode(&[0xde, 0xad, 0xbe, 0xef]).unwrap_err();
        match err {
            SafeAccountError::BadData { inner, data } => {
                assert!(inner.contains("0x541d63c8"));
                assert!(inner.contains("0x7bb37428"));
                assert_eq!(data.to_vec(), vec![0xde, 0xad, 0xbe, 0xef]);
            }
            _ => panic!("unexpected error {err:?}"),
        }
    }

    #[test]
    fn batch_delegates_to_multisend() {
        let multisend_addr = Address::repeat_byte(0x38);
        let txs = vec![tx(), tx()];
        let call_data =
            encode_batch(&txs, ExecutorSelector::ExecuteUserOp, multisend_addr).unwrap();

        let (inner, selector) = decode(&call_data).unwrap();
        assert_eq!(selector, ExecutorSelector::ExecuteUserOp);
        assert_eq!(inner.to, multisend_addr);
        assert_eq!(inner.operation, Operation::DelegateCall);
        assert_eq!(multisend::decode_list(&multisend::decode(&inner.data).unwrap()).unwrap(), txs);

        assert!(matches!(
            encode_batch(&[], ExecutorSelector::ExecuteUserOp, multisend_addr),
            Err(SafeAccountError::Validation { .. })
        ));
    }

    #[test]
    fn encode_picks_single_or_batch() {
        let multisend_addr = Address::repeat_byte(0x38);
        let selector = ExecutorSelector::default();
        assert_eq!(
            encode(&[tx()], selector, multisend_addr).unwrap(),
            encode_single(&tx(), selector)
        );
        assert_eq!(
            encode(&[tx(), tx()], selector, multisend_addr).unwrap(),
            encode_batch(&[tx(), tx()], selector, multisend_addr).unwrap()
        );
    }

    #[test]
    fn prepend_approve_upgrades_single_to_batch() {
        let multisend_addr = Address::repeat_byte(0x38);
        let token = Address::repeat_byte(0x70);
        let paymaster = Address::repeat_byte(0x50);
        let call_data = encode_single(&tx(), ExecutorSelector::ExecuteUserOp);

        let res = prepend_approve(&call_data, token, paymaster, 5.into(), multisend_addr).unwrap();
        let (inner, selector) = decode(&res).unwrap();
        assert_eq!(selector, ExecutorSelector::ExecuteUserOp);
        assert_eq!(inner.to, multisend_addr);

        let txs = multisend::decode_list(&multisend::decode(&inner.data).unwrap()).unwrap();
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0], tx());
        assert_eq!(txs[1].to, token);
        assert_eq!(&txs[1].data[..4], &selectors::APPROVE);
    }

    #[test]
    fn prepend_approve_extends_batch() {
        let multisend_addr = Address::repeat_byte(0x38);
        let call_data =
            encode_batch(&[tx(), tx()], ExecutorSelector::default(), multisend_addr).unwrap();

        let res = prepend_approve(
            &call_data,
            Address::repeat_byte(0x70),
            Address::repeat_byte(0x50),
            U256::MAX,
            multisend_addr,
        )
        .unwrap();
        let (inner, _) = decode(&res).unwrap();
        let txs = multisend::decode_list(&multisend::decode(&inner.data).unwrap()).unwrap();
        assert_eq!(txs.len(), 3);
        assert_eq!(txs[2].to, Address::repeat_byte(0x70));
    }
}
