//! Safe account facade tying the deployment, its owners and the builder together

use crate::{
    address::derive_account_address,
    builder::{
        dummy_signatures, estimate_gas, Collaborators, OperationBuilder, PendingWebAuthnOwner,
        UserOperationDraft,
    },
    call_data,
    config::{InitOverrides, SafeDeployment, UserOperationOverrides},
    eip712::{self, SafeOperationContext, SafeOperationDomain},
    error::{SafeAccountError, SafeAccountResult},
    initializer, owners,
    provider::{BundlerClient, CallProvider, CodeProvider, GasEstimator},
    signature::{assemble, SignatureValidity},
    utils::encode_call,
};
use ethers::{
    abi::Token,
    providers::JsonRpcClient,
    signers::{LocalWallet, Signer as _},
    types::{Address, Bytes, H256, U256},
};
use safe4337_primitives::{
    constants::selectors, MetaTransaction, SafeOperationHash, Signer, SignerSignaturePair,
    UserOperation, UserOperationGasEstimation, UserOperationHash, WebAuthnPublicKey,
};
use tracing::{debug, info};

/// A Safe account driven through the Safe 4337 module
#[derive(Debug, Clone)]
pub struct SafeAccount {
    address: Address,
    deployment: SafeDeployment,
    factory_data: Option<Bytes>,
    webauthn_owner: Option<PendingWebAuthnOwner>,
}

/// Initializer and address of a new account
struct NewAccount {
    address: Address,
    factory_data: Bytes,
    webauthn_owner: Option<PendingWebAuthnOwner>,
}

fn new_account(
    owners: &[Signer],
    overrides: &InitOverrides,
    deployment: &SafeDeployment,
) -> SafeAccountResult<NewAccount> {
    let initializer = initializer::encode(owners, overrides.threshold(), deployment)?;
    let address = derive_account_address(&initializer, overrides.c2_nonce(), deployment);

    let factory_data = encode_call(
        selectors::CREATE_PROXY_WITH_NONCE,
        &[
            Token::Address(deployment.singleton),
            Token::Bytes(initializer.to_vec()),
            Token::Uint(overrides.c2_nonce()),
        ],
    );

    let setup_owners: Vec<Address> = owners
        .iter()
        .map(|owner| owner.address().unwrap_or(deployment.webauthn.shared_signer))
        .collect();
    let webauthn_owner = owners
        .iter()
        .find_map(|owner| match owner {
            Signer::WebAuthn(key) => Some(*key),
            Signer::Address(_) => None,
        })
        .map(|key| -> SafeAccountResult<PendingWebAuthnOwner> {
            Ok(PendingWebAuthnOwner {
                key,
                prev_owner: owners::prev_owner(&setup_owners, deployment.webauthn.shared_signer)?,
            })
        })
        .transpose()?;

    Ok(NewAccount { address, factory_data, webauthn_owner })
}

impl SafeAccount {
    /// An account that is already deployed
    pub fn new(address: Address, deployment: SafeDeployment) -> Self {
        Self { address, deployment, factory_data: None, webauthn_owner: None }
    }

    /// An account that is deployed by its first user operation
    pub fn initialize_new_account(
        owners: &[Signer],
        overrides: InitOverrides,
        deployment: SafeDeployment,
    ) -> SafeAccountResult<Self> {
        let account = new_account(owners, &overrides, &deployment)?;
        info!("New Safe account {:?} with {} owners", account.address, owners.len());
        Ok(Self {
            address: account.address,
            deployment,
            factory_data: Some(account.factory_data),
            webauthn_owner: account.webauthn_owner,
        })
    }

    pub fn create_account_address(
        owners: &[Signer],
        overrides: InitOverrides,
        deployment: &SafeDeployment,
    ) -> SafeAccountResult<Address> {
        Ok(new_account(owners, &overrides, deployment)?.address)
    }

    /// Proxy factory and its `createProxyWithNonce` call data
    pub fn create_factory_address_and_data(
        owners: &[Signer],
        overrides: InitOverrides,
        deployment: &SafeDeployment,
    ) -> SafeAccountResult<(Address, Bytes)> {
        Ok((deployment.proxy_factory, new_account(owners, &overrides, deployment)?.factory_data))
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn deployment(&self) -> &SafeDeployment {
        &self.deployment
    }

    pub fn factory_data(&self) -> Option<&Bytes> {
        self.factory_data.as_ref()
    }

    pub fn webauthn_owner(&self) -> Option<WebAuthnPublicKey> {
        self.webauthn_owner.map(|owner| owner.key)
    }

    pub fn builder(&self) -> OperationBuilder<'_> {
        OperationBuilder::new(self.address, &self.deployment)
            .factory_data(self.factory_data.as_ref())
            .webauthn_owner(self.webauthn_owner)
    }

    pub async fn create_user_operation(
        &self,
        txs: Vec<MetaTransaction>,
        collaborators: Collaborators<'_>,
        overrides: &UserOperationOverrides,
    ) -> SafeAccountResult<UserOperationDraft> {
        self.builder().build(txs, collaborators, overrides).await
    }

    /// EIP-712 digest the owners sign
    pub fn get_user_operation_eip712_hash(
        &self,
        uo: &UserOperation,
        chain_id: u64,
        validity: SignatureValidity,
    ) -> SafeAccountResult<SafeOperationHash> {
        eip712::hash(
            uo,
            &SafeOperationDomain::new(chain_id, self.deployment.safe_4337_module),
            &SafeOperationContext {
                valid_after: validity.valid_after,
                valid_until: validity.valid_until,
                entry_point: self.deployment.entry_point,
            },
        )
    }

    /// Hash the entry point reports for the operation
    pub fn get_user_operation_hash(&self, uo: &UserOperation, chain_id: u64) -> UserOperationHash {
        uo.hash(&self.deployment.entry_point, chain_id)
    }

    /// Packs signer signature pairs of an operation with the given nonce
    pub fn build_signature(
        &self,
        pairs: &[SignerSignaturePair],
        validity: SignatureValidity,
        nonce: U256,
    ) -> SafeAccountResult<Bytes> {
        assemble(pairs, validity, Some(self.builder().is_init(nonce)), &self.deployment.webauthn)
    }

    /// Signs the EIP-712 digest with every wallet and returns the packed signature
    pub fn sign_user_operation(
        &self,
        uo: &UserOperation,
        wallets: &[LocalWallet],
        chain_id: u64,
        validity: SignatureValidity,
    ) -> SafeAccountResult<Bytes> {
        if wallets.is_empty() {
            return Err(SafeAccountError::validation("there should be at least one signer"));
        }

        let hash: H256 = self.get_user_operation_eip712_hash(uo, chain_id, validity)?.into();
        let pairs = wallets
            .iter()
            .map(|wallet| {
                let signature = wallet.sign_hash(hash).map_err(SafeAccountError::provider)?;
                Ok(SignerSignaturePair::new(wallet.address(), signature.to_vec().into()))
            })
            .collect::<SafeAccountResult<Vec<_>>>()?;
        debug!("Signed {hash:?} with {} wallets", pairs.len());

        self.build_signature(&pairs, validity, uo.nonce())
    }

    /// Appends `token.approve(spender, amount)` to the call data, batching through MultiSend
    pub fn prepend_token_paymaster_approve_to_call_data(
        &self,
        call_data: &[u8],
        token: Address,
        spender: Address,
        amount: U256,
    ) -> SafeAccountResult<Bytes> {
        call_data::prepend_approve(call_data, token, spender, amount, self.deployment.multisend)
    }

    /// Gas limits of `uo` as the builder would estimate them (zero fees and the per-signer
    /// verification buffer)
    ///
    /// A signature already on `uo` is kept unless dummy signatures are overridden.
    pub async fn estimate_user_operation_gas(
        &self,
        uo: &UserOperation,
        estimator: &dyn GasEstimator,
        overrides: &UserOperationOverrides,
    ) -> SafeAccountResult<UserOperationGasEstimation> {
        let pairs = dummy_signatures(overrides)?;
        let mut uo = uo.clone();
        if uo.signature().is_empty() || overrides.dummy_signatures.is_some() {
            uo.set_signature(self.build_signature(&pairs, SignatureValidity::max(), uo.nonce())?);
        }
        estimate_gas(&uo, pairs.len(), estimator, self.deployment.entry_point, overrides).await
    }

    pub async fn send_user_operation<P: JsonRpcClient>(
        &self,
        bundler: &BundlerClient<P>,
        uo: &UserOperation,
    ) -> SafeAccountResult<UserOperationHash> {
        let hash = bundler.send_user_operation(uo, self.deployment.entry_point).await?;
        info!("Sent user operation {hash} of {:?}", self.address);
        Ok(hash)
    }

    pub fn create_add_owner_with_threshold_meta_transaction(
        &self,
        owner: Address,
        threshold: u64,
    ) -> MetaTransaction {
        owners::add_owner_with_threshold(self.address, owner, threshold)
    }

    pub fn create_standard_swap_owner_meta_transaction(
        &self,
        prev_owner: Address,
        old_owner: Address,
        new_owner: Address,
    ) -> MetaTransaction {
        owners::swap_owner(self.address, prev_owner, old_owner, new_owner)
    }

    pub fn create_standard_remove_owner_meta_transaction(
        &self,
        prev_owner: Address,
        owner: Address,
        threshold: u64,
    ) -> MetaTransaction {
        owners::remove_owner(self.address, prev_owner, owner, threshold)
    }

    pub fn create_deploy_webauthn_verifier_meta_transaction(
        &self,
        key: &WebAuthnPublicKey,
    ) -> SafeAccountResult<MetaTransaction> {
        owners::deploy_webauthn_verifier(key, &self.deployment.webauthn)
    }

    pub async fn get_owners(&self, reader: &dyn CallProvider) -> SafeAccountResult<Vec<Address>> {
        owners::get_owners(reader, self.address).await
    }

    pub async fn create_swap_owner_meta_transactions(
        &self,
        provider: &(impl CallProvider + CodeProvider),
        new_owner: &Signer,
        old_owner: &Signer,
        prev_owner: Option<Address>,
    ) -> SafeAccountResult<Vec<MetaTransaction>> {
        owners::swap_owner_transactions(
            self.address,
            provider,
            new_owner,
            old_owner,
            prev_owner,
            &self.deployment.webauthn,
        )
        .await
    }

    pub async fn create_remove_owner_meta_transaction(
        &self,
        reader: &dyn CallProvider,
        owner: &Signer,
        threshold: u64,
        prev_owner: Option<Address>,
    ) -> SafeAccountResult<MetaTransaction> {
        owners::remove_owner_transaction(
            self.address,
            reader,
            owner,
            threshold,
            prev_owner,
            &self.deployment.webauthn,
        )
        .await
    }
}
