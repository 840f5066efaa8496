//! Safe `setup` call data used as the proxy initializer

use crate::{
    address::pack_verifiers,
    config::SafeDeployment,
    error::{SafeAccountError, SafeAccountResult},
    multisend,
    utils::encode_call,
};
use ethers::{
    abi::Token,
    types::{Address, Bytes, U256},
};
use safe4337_primitives::{constants::selectors, MetaTransaction, Signer, WebAuthnPublicKey};

/// `configure((x, y, verifiers))` on the shared signer
pub(crate) fn configure_shared_signer(x: U256, y: U256, verifiers: U256) -> Bytes {
    encode_call(
        selectors::CONFIGURE_SHARED_SIGNER,
        &[Token::Tuple(vec![Token::Uint(x), Token::Uint(y), Token::Uint(verifiers)])],
    )
}

/// Checks the owner list and threshold, returning the passkey owner if there is one
pub fn validate_owners(
    owners: &[Signer],
    threshold: u64,
) -> SafeAccountResult<Option<WebAuthnPublicKey>> {
    if owners.is_empty() {
        return Err(SafeAccountError::validation("there should be at least one owner"));
    }
    if threshold < 1 {
        return Err(SafeAccountError::validation("threshold should be at least one"));
    }
    if threshold > owners.len() as u64 {
        return Err(SafeAccountError::validation(
            "threshold can't be larger than number of owners",
        ));
    }

    let mut webauthn = owners.iter().filter_map(|owner| match owner {
        Signer::WebAuthn(key) => Some(*key),
        Signer::Address(_) => None,
    });
    let key = webauthn.next();
    if webauthn.next().is_some() {
        return Err(SafeAccountError::validation(
            "only one WebAuthn owner can be set during initialization",
        ));
    }
    Ok(key)
}

/// Encodes `setup(owners, threshold, to, data, fallbackHandler, 0, 0, 0)`
///
/// Without a passkey owner the setup delegatecalls `enableModules([module])` on the module setup
/// contract. A passkey owner is replaced by the shared signer and the setup delegatecalls a
/// MultiSend batch that enables the module and configures the shared signer with the key.
pub fn encode(
    owners: &[Signer],
    threshold: u64,
    deployment: &SafeDeployment,
) -> SafeAccountResult<Bytes> {
    let webauthn_owner = validate_owners(owners, threshold)?;

    let enable_modules = encode_call(
        selectors::ENABLE_MODULES,
        &[Token::Array(vec![Token::Address(deployment.safe_4337_module)])],
    );

    let (to, data) = match webauthn_owner {
        None => (deployment.safe_module_setup, enable_modules),
        Some(key) => {
            let webauthn = &deployment.webauthn;
            let verifiers =
                pack_verifiers(webauthn.precompile_verifier, webauthn.contract_verifier)?;
            let txs = [
                MetaTransaction::delegate_call(deployment.safe_module_setup, enable_modules),
                MetaTransaction::delegate_call(
                    webauthn.shared_signer,
                    configure_shared_signer(key.x, key.y, verifiers),
                ),
            ];
            (deployment.multisend, multisend::encode_call_data(&txs))
        }
    };

    let owners = owners
        .iter()
        .map(|owner| match owner {
            Signer::Address(addr) => Token::Address(*addr),
            Signer::WebAuthn(_) => Token::Address(deployment.webauthn.shared_signer),
        })
        .collect();

    Ok(encode_call(
        selectors::SETUP,
        &[
            Token::Array(owners),
            Token::Uint(threshold.into()),
            Token::Address(to),
            Token::Bytes(data.to_vec()),
            Token::Address(deployment.safe_4337_module),
            Token::Address(Address::zero()),
            Token::Uint(U256::zero()),
            Token::Address(Address::zero()),
        ],
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use ethers::abi::{decode, ParamType};

    fn decode_setup(call_data: &[u8]) -> Vec<Token> {
        decode(
            &[
                ParamType::Array(Box::new(ParamType::Address)),
                ParamType::Uint(256),
                ParamType::Address,
                ParamType::Bytes,
                ParamType::Address,
                ParamType::Address,
                ParamType::Uint(256),
                ParamType::Address,
            ],
            &call_data[4..],
        )
        .unwrap()
    }

    fn addr(b: u8) -> Signer {
        Signer::Address(Address::repeat_byte(b))
    }

    fn passkey(x: u64) -> Signer {
        Signer::WebAuthn(WebAuthnPublicKey { x: x.into(), y: (x + 1).into() })
    }

    #[test]
    fn single_owner_vector() {
        let owner: Address = "0xaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa1".parse().unwrap();
        let call_data = encode(&[owner.into()], 1, &SafeDeployment::v0_2_0()).unwrap();
        assert_eq!(call_data, "0xb63e800d000000000000000000000000000000000000000000000000000000000000010000000000000000000000000000000000000000000000000000000000000000010000000000000000000000008ecd4ec46d4d2a6b64fe960b3d64e8b94b2234eb0000000000000000000000000000000000000000000000000000000000000140000000000000000000000000a581c4a4db7175302464ff3c06380bc3270b40370000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000000001000000000000000000000000aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa100000000000000000000000000000000000000000000000000000000000000648d0dc49f00000000000000000000000000000000000000000000000000000000000000200000000000000000000000000000000000000000000000000000000000000001000000000000000000000000a581c4a4db7175302464ff3c06380bc3270b403700000000000000000000000000000000000000000000000000000000".parse::<Bytes>().unwrap());
    }

    #[test]
    fn threshold_bounds() {
        let deployment = SafeDeployment::v0_3_0();
        let owners = [addr(1), addr(2), addr(3)];
        assert!(encode(&owners, 1, &deployment).is_ok());
        assert!(encode(&owners, 3, &deployment).is_ok());
        assert!(matches!(encode(&owners, 0, &deployment), Err(SafeAccountError::Validation { .. })));
        assert!(matches!(encode(&owners, 4, &deployment), Err(SafeAccountError::Validation { .. })));
        assert!(matches!(encode(&[], 1, &deployment), Err(SafeAccountError::Validation { .. })));
    }

    #[test]
    fn at_most_one_passkey_owner() {
        let deployment = SafeDeployment::v0_3_0();
        assert!(encode(&[addr(1), passkey(7)], 1, &deployment).is_ok());
        assert!(matches!(
            encode(&[passkey(7), passkey(9)], 1, &deployment),
            Err(SafeAccountError::Validation { .. })
        ));
    }

    #[test]
    fn passkey_owner_goes_through_shared_signer() {
        let deployment = SafeDeployment::v0_3_0();
        let call_data = encode(&[addr(1), passkey(7)], 2, &deployment).unwrap();
        let tokens = decode_setup(&call_data);

        assert_eq!(
            tokens[0],
            Token::Array(vec![
                Token::Address(Address::repeat_byte(1)),
                Token::Address(deployment.webauthn.shared_signer)
            ])
        );
        assert_eq!(tokens[1], Token::Uint(2.into()));
        assert_eq!(tokens[2], Token::Address(deployment.multisend));
        assert_eq!(tokens[4], Token::Address(deployment.safe_4337_module));

        let data = tokens[3].clone().into_bytes().unwrap();
        let txs = multisend::decode_list(&multisend::decode(&data).unwrap()).unwrap();
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].to, deployment.safe_module_setup);
        assert_eq!(&txs[0].data[..4], &selectors::ENABLE_MODULES);
        assert_eq!(txs[1].to, deployment.webauthn.shared_signer);
        assert_eq!(&txs[1].data[..4], &selectors::CONFIGURE_SHARED_SIGNER);
        assert_eq!(txs[1].data[4 + 31], 7);
        assert_eq!(txs[1].data[4 + 63], 8);
        assert!(txs.iter().all(|tx| tx.operation == safe4337_primitives::Operation::DelegateCall));
    }

    #[test]
    fn address_owners_enable_module_directly() {
        let deployment = SafeDeployment::v0_2_0();
        let tokens = decode_setup(&encode(&[addr(1), addr(2)], 1, &deployment).unwrap());
        assert_eq!(tokens[2], Token::Address(deployment.safe_module_setup));
        let data = tokens[3].clone().into_bytes().unwrap();
        assert_eq!(&data[..4], &selectors::ENABLE_MODULES);
    }
}
