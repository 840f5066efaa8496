//! Owner management transactions executed by the account on itself

use crate::{
    address::{derive_webauthn_verifier_address, pack_verifiers},
    config::{WebAuthnBootstrapPolicy, WebAuthnDeployment},
    error::{SafeAccountError, SafeAccountResult},
    initializer::configure_shared_signer,
    provider::{CallProvider, CodeProvider},
    utils::encode_call,
};
use ethers::{
    abi::{decode, ParamType, Token},
    types::{Address, U256},
};
use safe4337_primitives::{
    constants::{safe::SENTINEL_OWNERS, selectors},
    MetaTransaction, Signer, WebAuthnPublicKey,
};
use tracing::debug;

fn sentinel() -> Address {
    SENTINEL_OWNERS.parse().unwrap_or_default()
}

/// `addOwnerWithThreshold(owner, threshold)`
pub fn add_owner_with_threshold(account: Address, owner: Address, threshold: u64) -> MetaTransaction {
    MetaTransaction::call(
        account,
        encode_call(
            selectors::ADD_OWNER_WITH_THRESHOLD,
            &[Token::Address(owner), Token::Uint(threshold.into())],
        ),
    )
}

/// `swapOwner(prevOwner, oldOwner, newOwner)`
pub fn swap_owner(
    account: Address,
    prev_owner: Address,
    old_owner: Address,
    new_owner: Address,
) -> MetaTransaction {
    MetaTransaction::call(
        account,
        encode_call(
            selectors::SWAP_OWNER,
            &[Token::Address(prev_owner), Token::Address(old_owner), Token::Address(new_owner)],
        ),
    )
}

/// `removeOwner(prevOwner, owner, threshold)`
pub fn remove_owner(
    account: Address,
    prev_owner: Address,
    owner: Address,
    threshold: u64,
) -> MetaTransaction {
    MetaTransaction::call(
        account,
        encode_call(
            selectors::REMOVE_OWNER,
            &[Token::Address(prev_owner), Token::Address(owner), Token::Uint(threshold.into())],
        ),
    )
}

/// `createSigner(x, y, verifiers)` on the signer factory, deploys the passkey's verifier proxy
pub fn deploy_webauthn_verifier(
    key: &WebAuthnPublicKey,
    webauthn: &WebAuthnDeployment,
) -> SafeAccountResult<MetaTransaction> {
    let verifiers = pack_verifiers(webauthn.precompile_verifier, webauthn.contract_verifier)?;
    Ok(MetaTransaction::call(
        webauthn.signer_factory,
        encode_call(
            selectors::CREATE_SIGNER,
            &[Token::Uint(key.x), Token::Uint(key.y), Token::Uint(verifiers)],
        ),
    ))
}

/// Transactions that replace the shared signer by the passkey's own verifier on the first
/// operation of an account set up with a passkey owner
///
/// `prev_owner` is the owner preceding the shared signer in the owners list.
pub fn webauthn_bootstrap(
    account: Address,
    prev_owner: Address,
    key: &WebAuthnPublicKey,
    webauthn: &WebAuthnDeployment,
    policy: WebAuthnBootstrapPolicy,
) -> SafeAccountResult<Vec<MetaTransaction>> {
    let verifier = derive_webauthn_verifier_address(key, webauthn)?;
    let mut txs = vec![
        deploy_webauthn_verifier(key, webauthn)?,
        swap_owner(account, prev_owner, webauthn.shared_signer, verifier),
    ];
    if policy.clear_shared_signer {
        txs.push(MetaTransaction::delegate_call(
            webauthn.shared_signer,
            configure_shared_signer(U256::zero(), U256::zero(), U256::zero()),
        ));
    }
    Ok(txs)
}

/// Owner preceding `owner` in the linked list, the sentinel for the first one
pub fn prev_owner(owners: &[Address], owner: Address) -> SafeAccountResult<Address> {
    match owners.iter().position(|o| *o == owner) {
        Some(0) => Ok(sentinel()),
        Some(idx) => Ok(owners[idx - 1]),
        None => Err(SafeAccountError::validation(format!("{owner:?} is not an owner"))),
    }
}

/// `getOwners()` of the account
pub async fn get_owners(reader: &dyn CallProvider, account: Address) -> SafeAccountResult<Vec<Address>> {
    let res = reader.call(account, encode_call(selectors::GET_OWNERS, &[])).await?;
    match decode(&[ParamType::Array(Box::new(ParamType::Address))], &res)?.pop() {
        Some(Token::Array(owners)) => Ok(owners.into_iter().filter_map(Token::into_address).collect()),
        _ => Err(SafeAccountError::bad_data("getOwners didn't return address[]", res)),
    }
}

/// On-chain owner address of a signer (passkeys are represented by their verifier)
pub fn owner_address(signer: &Signer, webauthn: &WebAuthnDeployment) -> SafeAccountResult<Address> {
    match signer {
        Signer::Address(addr) => Ok(*addr),
        Signer::WebAuthn(key) => derive_webauthn_verifier_address(key, webauthn),
    }
}

/// Swaps `old_owner` for `new_owner`, deploying the new passkey verifier first when needed
///
/// Without `prev_owner` the owners list is read from the account.
pub async fn swap_owner_transactions(
    account: Address,
    provider: &(impl CallProvider + CodeProvider),
    new_owner: &Signer,
    old_owner: &Signer,
    prev: Option<Address>,
    webauthn: &WebAuthnDeployment,
) -> SafeAccountResult<Vec<MetaTransaction>> {
    let new_address = owner_address(new_owner, webauthn)?;
    let old_address = owner_address(old_owner, webauthn)?;

    let mut txs = vec![];
    if let Signer::WebAuthn(key) = new_owner {
        if provider.get_code(new_address).await?.is_empty() {
            debug!("Verifier {new_address:?} isn't deployed yet, adding deployment");
            txs.push(deploy_webauthn_verifier(key, webauthn)?);
        }
    }

    let prev = match prev {
        Some(prev) => prev,
        None => prev_owner(&get_owners(provider, account).await?, old_address)?,
    };
    txs.push(swap_owner(account, prev, old_address, new_address));
    Ok(txs)
}

/// Removes `owner` and sets the new threshold
pub async fn remove_owner_transaction(
    account: Address,
    reader: &dyn CallProvider,
    owner: &Signer,
    threshold: u64,
    prev: Option<Address>,
    webauthn: &WebAuthnDeployment,
) -> SafeAccountResult<MetaTransaction> {
    let owner = owner_address(owner, webauthn)?;
    let prev = match prev {
        Some(prev) => prev,
        None => prev_owner(&get_owners(reader, account).await?, owner)?,
    };
    Ok(remove_owner(account, prev, owner, threshold))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use ethers::{abi::encode, types::Bytes};

    struct Chain {
        owners: Vec<Address>,
        code: Bytes,
    }

    #[async_trait]
    impl CallProvider for Chain {
        async fn call(&self, _to: Address, data: Bytes) -> SafeAccountResult<Bytes> {
            assert_eq!(&data[..], &selectors::GET_OWNERS);
            Ok(encode(&[Token::Array(self.owners.iter().copied().map(Token::Address).collect())])
                .into())
        }
    }

    #[async_trait]
    impl CodeProvider for Chain {
        async fn get_code(&self, _address: Address) -> SafeAccountResult<Bytes> {
            Ok(self.code.clone())
        }
    }

    fn account() -> Address {
        Address::repeat_byte(0xac)
    }

    fn key() -> WebAuthnPublicKey {
        WebAuthnPublicKey { x: 1.into(), y: 2.into() }
    }

    #[test]
    fn owner_calls() {
        let tx = add_owner_with_threshold(account(), Address::repeat_byte(1), 2);
        assert_eq!(tx.to, account());
        assert_eq!(&tx.data[..4], &selectors::ADD_OWNER_WITH_THRESHOLD);
        assert_eq!(tx.data.len(), 4 + 64);

        let tx = swap_owner(account(), sentinel(), Address::repeat_byte(1), Address::repeat_byte(2));
        assert_eq!(&tx.data[..4], &selectors::SWAP_OWNER);
        assert_eq!(&tx.data[4 + 12..36], sentinel().as_bytes());
        assert_eq!(&tx.data[36 + 12..68], Address::repeat_byte(1).as_bytes());
        assert_eq!(&tx.data[68 + 12..100], Address::repeat_byte(2).as_bytes());
    }

    #[test]
    fn prev_owner_lookup() {
        let owners = [Address::repeat_byte(1), Address::repeat_byte(2)];
        assert_eq!(prev_owner(&owners, owners[0]), Ok(sentinel()));
        assert_eq!(prev_owner(&owners, owners[1]), Ok(owners[0]));
        assert!(matches!(
            prev_owner(&owners, Address::repeat_byte(3)),
            Err(SafeAccountError::Validation { .. })
        ));
    }

    #[test]
    fn bootstrap_with_and_without_clearing() {
        let webauthn = WebAuthnDeployment::default();
        let verifier = derive_webauthn_verifier_address(&key(), &webauthn).unwrap();

        let txs = webauthn_bootstrap(
            account(),
            sentinel(),
            &key(),
            &webauthn,
            WebAuthnBootstrapPolicy::default(),
        )
        .unwrap();
        assert_eq!(txs.len(), 2);
        assert_eq!(txs[0].to, webauthn.signer_factory);
        assert_eq!(&txs[0].data[..4], &selectors::CREATE_SIGNER);
        assert_eq!(txs[1], swap_owner(account(), sentinel(), webauthn.shared_signer, verifier));

        let txs = webauthn_bootstrap(
            account(),
            sentinel(),
            &key(),
            &webauthn,
            WebAuthnBootstrapPolicy { clear_shared_signer: true },
        )
        .unwrap();
        assert_eq!(txs.len(), 3);
        assert_eq!(
            txs[2],
            MetaTransaction::delegate_call(
                webauthn.shared_signer,
                configure_shared_signer(U256::zero(), U256::zero(), U256::zero())
            )
        );
    }

    #[tokio::test]
    async fn swap_to_undeployed_passkey() {
        let webauthn = WebAuthnDeployment::default();
        let old = Address::repeat_byte(1);
        let chain = Chain { owners: vec![Address::repeat_byte(9), old], code: Bytes::new() };

        let txs = swap_owner_transactions(
            account(),
            &chain,
            &Signer::WebAuthn(key()),
            &Signer::Address(old),
            None,
            &webauthn,
        )
        .await
        .unwrap();
        let verifier = derive_webauthn_verifier_address(&key(), &webauthn).unwrap();
        assert_eq!(
            txs,
            vec![
                deploy_webauthn_verifier(&key(), &webauthn).unwrap(),
                swap_owner(account(), Address::repeat_byte(9), old, verifier)
            ]
        );

        // already deployed verifier
        let chain = Chain { code: vec![0x60].into(), ..chain };
        let txs = swap_owner_transactions(
            account(),
            &chain,
            &Signer::WebAuthn(key()),
            &Signer::Address(old),
            None,
            &webauthn,
        )
        .await
        .unwrap();
        assert_eq!(txs.len(), 1);
    }

    #[tokio::test]
    async fn remove_unknown_owner() {
        let chain = Chain { owners: vec![Address::repeat_byte(1)], code: Bytes::new() };
        let res = remove_owner_transaction(
            account(),
            &chain,
            &Signer::Address(Address::repeat_byte(2)),
            1,
            None,
            &WebAuthnDeployment::default(),
        )
        .await;
        assert!(matches!(res, Err(SafeAccountError::Validation { .. })));

        let tx = remove_owner_transaction(
            account(),
            &chain,
            &Signer::Address(Address::repeat_byte(1)),
            1,
            None,
            &WebAuthnDeployment::default(),
        )
        .await
        .unwrap();
        assert_eq!(tx, remove_owner(account(), sentinel(), Address::repeat_byte(1), 1));
    }
}
