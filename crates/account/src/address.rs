//! Deterministic (CREATE2) addresses of Safe accounts and passkey verifiers

use crate::{
    config::{SafeDeployment, WebAuthnDeployment},
    error::{SafeAccountError, SafeAccountResult},
};
use ethers::{
    abi::{encode, Token},
    types::{Address, H256, U256},
    utils::{get_create2_address_from_hash, keccak256},
};
use safe4337_primitives::WebAuthnPublicKey;

/// CREATE2 address of a Safe proxy
///
/// `salt = keccak256(initHash ‖ uint256(creationNonce))`, the proxy factory being the deployer and
/// `singleton_init_hash` the hash of the proxy creation code with the singleton appended.
pub fn derive_address(
    init_hash: H256,
    creation_nonce: U256,
    factory: Address,
    singleton_init_hash: H256,
) -> Address {
    let salt = keccak256(
        [init_hash.as_bytes(), encode(&[Token::Uint(creation_nonce)]).as_slice()].concat(),
    );
    get_create2_address_from_hash(factory, salt, singleton_init_hash)
}

/// Address of the account created from `initializer` by the deployment's proxy factory
pub fn derive_account_address(
    initializer: &[u8],
    creation_nonce: U256,
    deployment: &SafeDeployment,
) -> Address {
    derive_address(
        keccak256(initializer).into(),
        creation_nonce,
        deployment.proxy_factory,
        deployment.singleton_init_hash,
    )
}

/// Packs the verifier selection into a uint176: the last two bytes of the precompile address
/// followed by the contract verifier address.
pub fn pack_verifiers(precompile: Address, contract: Address) -> SafeAccountResult<U256> {
    let precompile = precompile.as_bytes();
    if precompile[..18].iter().any(|b| *b != 0) {
        return Err(SafeAccountError::validation(format!(
            "invalid precompile address {:?}, it should have the format 0x000000000000000000000000000000000000____",
            Address::from_slice(precompile)
        )));
    }
    Ok(U256::from_big_endian(&[&precompile[18..], contract.as_bytes()].concat()))
}

/// Address of the per-key signer proxy the signer factory deploys for a passkey
pub fn derive_webauthn_verifier_address(
    key: &WebAuthnPublicKey,
    webauthn: &WebAuthnDeployment,
) -> SafeAccountResult<Address> {
    let verifiers = pack_verifiers(webauthn.precompile_verifier, webauthn.contract_verifier)?;
    let args = encode(&[
        Token::Address(webauthn.signer_singleton),
        Token::Uint(key.x),
        Token::Uint(key.y),
        Token::Uint(verifiers),
    ]);
    let init_hash = keccak256([&webauthn.signer_proxy_creation_code[..], args.as_slice()].concat());
    Ok(get_create2_address_from_hash(webauthn.signer_factory, H256::zero(), init_hash))
}
