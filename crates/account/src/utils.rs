use ethers::{
    abi::{encode, Token},
    types::Bytes,
};

/// ABI-encodes `tokens` behind a 4-byte function selector
pub fn encode_call(selector: [u8; 4], tokens: &[Token]) -> Bytes {
    [selector.as_slice(), encode(tokens).as_slice()].concat().into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::types::Address;

    #[test]
    fn selector_then_arguments() {
        let call = encode_call([0xa0, 0xe6, 0x7e, 0x2b], &[]);
        assert_eq!(call.to_vec(), vec![0xa0, 0xe6, 0x7e, 0x2b]);

        let call = encode_call([1, 2, 3, 4], &[Token::Address(Address::repeat_byte(0xff))]);
        assert_eq!(call.len(), 36);
        assert_eq!(&call[4..16], &[0u8; 12]);
    }
}
