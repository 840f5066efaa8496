//! Packing of owner signatures into the layout the Safe 4337 module verifies
//!
//! The result is `validAfter (6) ‖ validUntil (6) ‖ signatures`. Signatures are sorted by owner
//! address. ECDSA signatures take their 65 bytes in place; contract signatures (passkeys
//! included) take a 65 byte `owner ‖ offset ‖ 0` slot pointing into a trailing dynamic area
//! holding `len ‖ signature`.

use crate::{
    address::derive_webauthn_verifier_address,
    config::WebAuthnDeployment,
    error::{SafeAccountError, SafeAccountResult},
};
use ethers::{
    abi::{encode, Token},
    types::{Address, Bytes, U256},
};
use safe4337_primitives::{
    constants::gas::{DUMMY_SIGNATURE_VALIDITY, UINT48_MAX},
    Signer, SignerSignaturePair,
};
use std::collections::BTreeMap;

const STATIC_PART_LEN: usize = 65;

/// Validity window of a signature (0 means unbounded)
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SignatureValidity {
    pub valid_after: u64,
    pub valid_until: u64,
}

impl SignatureValidity {
    pub fn new(valid_after: u64, valid_until: u64) -> Self {
        Self { valid_after, valid_until }
    }

    /// Widest window, used for dummy signatures during gas estimation
    pub fn max() -> Self {
        Self::new(DUMMY_SIGNATURE_VALIDITY, DUMMY_SIGNATURE_VALIDITY)
    }

    fn packed(&self) -> SafeAccountResult<[u8; 12]> {
        if self.valid_after > UINT48_MAX || self.valid_until > UINT48_MAX {
            return Err(SafeAccountError::validation(format!(
                "validity window {}..{} doesn't fit in uint48",
                self.valid_after, self.valid_until
            )));
        }
        let mut res = [0u8; 12];
        res[..6].copy_from_slice(&self.valid_after.to_be_bytes()[2..]);
        res[6..].copy_from_slice(&self.valid_until.to_be_bytes()[2..]);
        Ok(res)
    }
}

/// Owner address a signer is registered under
///
/// Passkeys map to the shared signer while the account is being bootstrapped (`is_init`) and
/// to their own verifier proxy afterwards.
pub fn signer_address(
    signer: &Signer,
    is_init: Option<bool>,
    webauthn: &WebAuthnDeployment,
) -> SafeAccountResult<Address> {
    match signer {
        Signer::Address(addr) => Ok(*addr),
        Signer::WebAuthn(key) => match is_init {
            None => {
                Err(SafeAccountError::validation("must define is_init when using WebAuthn signers"))
            }
            Some(true) => Ok(webauthn.shared_signer),
            Some(false) => derive_webauthn_verifier_address(key, webauthn),
        },
    }
}

/// Sorted and packed signatures without the validity window
pub fn build_signatures(
    pairs: &[SignerSignaturePair],
    is_init: Option<bool>,
    webauthn: &WebAuthnDeployment,
) -> SafeAccountResult<Bytes> {
    let mut resolved = pairs
        .iter()
        .map(|pair| {
            let owner = signer_address(&pair.signer, pair.is_init.or(is_init), webauthn)?;
            let is_contract_signature =
                pair.is_contract_signature.unwrap_or(false) || pair.signer.is_webauthn();
            Ok((owner, is_contract_signature, &pair.signature))
        })
        .collect::<SafeAccountResult<Vec<_>>>()?;
    resolved.sort_by_key(|(owner, _, _)| *owner);

    let mut static_part = Vec::with_capacity(STATIC_PART_LEN * resolved.len());
    let mut dynamic_part = vec![];
    let dynamic_start = STATIC_PART_LEN * resolved.len();

    for (owner, is_contract_signature, signature) in resolved {
        if is_contract_signature {
            let offset = dynamic_start + dynamic_part.len();
            static_part.extend(encode(&[Token::Address(owner), Token::Uint(offset.into())]));
            static_part.push(0);
            dynamic_part.extend(encode(&[Token::Uint(U256::from(signature.len()))]));
            dynamic_part.extend_from_slice(signature);
        } else {
            static_part.extend_from_slice(signature);
        }
    }

    Ok([static_part, dynamic_part].concat().into())
}

/// `validAfter ‖ validUntil ‖ signatures`
pub fn assemble(
    pairs: &[SignerSignaturePair],
    validity: SignatureValidity,
    is_init: Option<bool>,
    webauthn: &WebAuthnDeployment,
) -> SafeAccountResult<Bytes> {
    let validity = validity.packed()?;
    let signatures = build_signatures(pairs, is_init, webauthn)?;
    Ok([&validity[..], &signatures[..]].concat().into())
}

/// Prefixes an already packed signature with the validity window
pub fn format_single_signature(
    signature: &[u8],
    validity: SignatureValidity,
) -> SafeAccountResult<Bytes> {
    Ok([&validity.packed()?[..], signature].concat().into())
}

/// Address only path: ECDSA signatures sorted by signer address
///
/// A signer listed twice keeps its last signature.
pub fn format_eip712_signatures(
    signers: &[Address],
    signatures: &[Bytes],
    validity: SignatureValidity,
) -> SafeAccountResult<Bytes> {
    if signers.len() != signatures.len() {
        return Err(SafeAccountError::validation(
            "signers and signatures should have the same length",
        ));
    }
    let sorted: BTreeMap<Address, &Bytes> = signers.iter().copied().zip(signatures).collect();
    let packed: Vec<u8> = sorted.into_values().flat_map(|sig| sig.to_vec()).collect();
    format_single_signature(&packed, validity)
}

/// `abi.encode(bytes authenticatorData, bytes clientDataFields, uint256[2] rs)`
pub fn create_webauthn_signature(
    authenticator_data: &[u8],
    client_data_fields: &[u8],
    rs: [U256; 2],
) -> Bytes {
    encode(&[
        Token::Bytes(authenticator_data.to_vec()),
        Token::Bytes(client_data_fields.to_vec()),
        Token::FixedArray(vec![Token::Uint(rs[0]), Token::Uint(rs[1])]),
    ])
    .into()
}

#[cfg(test)]
mod tests {
    use super::*;
    use safe4337_primitives::WebAuthnPublicKey;

    fn ecdsa(owner: u8, fill: u8) -> SignerSignaturePair {
        SignerSignaturePair::new(Address::repeat_byte(owner), vec![fill; 65].into())
    }

    fn passkey() -> Signer {
        Signer::WebAuthn(WebAuthnPublicKey { x: 1.into(), y: 2.into() })
    }

    #[test]
    fn validity_prefix() {
        let res = assemble(
            &[ecdsa(1, 0xaa)],
            SignatureValidity::new(0x0102, 0xffff_ffff_ffff),
            None,
            &WebAuthnDeployment::default(),
        )
        .unwrap();
        assert_eq!(res.len(), 12 + 65);
        assert_eq!(&res[..6], &[0, 0, 0, 0, 1, 2]);
        assert_eq!(&res[6..12], &[0xff; 6]);

        assert!(matches!(
            assemble(
                &[ecdsa(1, 0xaa)],
                SignatureValidity::new(1 << 48, 0),
                None,
                &WebAuthnDeployment::default()
            ),
            Err(SafeAccountError::Validation { .. })
        ));
    }

    #[test]
    fn dummy_validity_is_widest_window() {
        let max = SignatureValidity::max();
        assert_eq!(max, SignatureValidity::new(DUMMY_SIGNATURE_VALIDITY, DUMMY_SIGNATURE_VALIDITY));
        let res =
            assemble(&[ecdsa(1, 0xaa)], max, None, &WebAuthnDeployment::default()).unwrap();
        assert_eq!(&res[..12], &[0xff; 12]);
    }

    #[test]
    fn sorted_regardless_of_input_order() {
        let webauthn = WebAuthnDeployment::default();
        let pairs = [ecdsa(0x20, 0xbb), ecdsa(0x10, 0xaa), ecdsa(0x30, 0xcc).contract_signature(true)];
        let expected = build_signatures(&pairs, None, &webauthn).unwrap();

        let reversed: Vec<_> = pairs.iter().rev().cloned().collect();
        assert_eq!(build_signatures(&reversed, None, &webauthn).unwrap(), expected);

        // lower address first
        assert_eq!(&expected[..65], &[0xaa; 65]);
        assert_eq!(&expected[65..130], &[0xbb; 65]);
    }

    #[test]
    fn contract_signature_layout() {
        let webauthn = WebAuthnDeployment::default();
        let contract = SignerSignaturePair::new(Address::repeat_byte(0x10), vec![0xcc; 3].into())
            .contract_signature(true);
        let pairs = [contract, ecdsa(0x20, 0xbb)];
        let res = build_signatures(&pairs, None, &webauthn).unwrap();

        // two static slots, then len ‖ data
        assert_eq!(res.len(), 130 + 32 + 3);
        assert_eq!(&res[12..32], Address::repeat_byte(0x10).as_bytes());
        assert_eq!(U256::from_big_endian(&res[32..64]), 130.into());
        assert_eq!(res[64], 0);
        assert_eq!(&res[65..130], &[0xbb; 65]);
        assert_eq!(U256::from_big_endian(&res[130..162]), 3.into());
        assert_eq!(&res[162..], &[0xcc; 3]);
    }

    #[test]
    fn offsets_accumulate_across_contract_signatures() {
        let webauthn = WebAuthnDeployment::default();
        let pairs = [
            SignerSignaturePair::new(Address::repeat_byte(0x10), vec![1; 10].into())
                .contract_signature(true),
            ecdsa(0x20, 0xbb),
            SignerSignaturePair::new(Address::repeat_byte(0x30), vec![2; 4].into())
                .contract_signature(true),
        ];
        let res = build_signatures(&pairs, None, &webauthn).unwrap();
        let start = 3 * 65;
        assert_eq!(U256::from_big_endian(&res[32..64]), start.into());
        assert_eq!(U256::from_big_endian(&res[130 + 32..130 + 64]), (start + 32 + 10).into());
        assert_eq!(res.len(), start + 32 + 10 + 32 + 4);
    }

    #[test]
    fn passkey_signer_needs_init_flag() {
        let webauthn = WebAuthnDeployment::default();
        let pair = SignerSignaturePair::new(passkey(), vec![0xdd; 40].into());
        assert!(matches!(
            build_signatures(&[pair.clone()], None, &webauthn),
            Err(SafeAccountError::Validation { .. })
        ));

        let init = build_signatures(&[pair.clone()], Some(true), &webauthn).unwrap();
        assert_eq!(&init[12..32], webauthn.shared_signer.as_bytes());

        let deployed = build_signatures(&[pair.clone()], Some(false), &webauthn).unwrap();
        let verifier =
            derive_webauthn_verifier_address(&WebAuthnPublicKey { x: 1.into(), y: 2.into() }, &webauthn)
                .unwrap();
        assert_eq!(&deployed[12..32], verifier.as_bytes());

        // per pair flag wins over the context
        let overridden = build_signatures(&[pair.init(true)], Some(false), &webauthn).unwrap();
        assert_eq!(overridden, init);
    }

    #[test]
    fn eip712_signatures_sorted_by_signer() {
        let signers = [Address::repeat_byte(0xf0), Address::repeat_byte(0x0f)];
        let signatures = [Bytes::from(vec![0xaa; 65]), Bytes::from(vec![0xbb; 65])];
        let res =
            format_eip712_signatures(&signers, &signatures, SignatureValidity::default()).unwrap();
        assert_eq!(&res[..12], &[0u8; 12]);
        assert_eq!(&res[12..77], &[0xbb; 65]);
        assert_eq!(&res[77..], &[0xaa; 65]);

        assert!(matches!(
            format_eip712_signatures(&signers, &signatures[..1], SignatureValidity::default()),
            Err(SafeAccountError::Validation { .. })
        ));
    }

    #[test]
    fn webauthn_signature_encoding() {
        let sig = create_webauthn_signature(&[1, 2, 3], b"\"origin\":\"x\"", [5.into(), 6.into()]);
        // offsets (2) + rs (2) + two length-prefixed, padded byte strings
        assert_eq!(sig.len(), 4 * 32 + 2 * 64);
        assert_eq!(U256::from_big_endian(&sig[0..32]), 128.into());
        assert_eq!(U256::from_big_endian(&sig[64..96]), 5.into());
        assert_eq!(U256::from_big_endian(&sig[96..128]), 6.into());
    }
}
