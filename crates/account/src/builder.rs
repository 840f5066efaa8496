//! Assembly of ready-to-sign user operations
//!
//! The builder resolves the nonce, prepends the passkey bootstrap on the very first operation,
//! encodes the executor call data, resolves fees and finally runs the gas estimation round trip.
//! Every value can be overridden, the collaborators are only asked for what is missing.

use crate::{
    call_data,
    config::{apply_percentage, SafeDeployment, UserOperationOverrides},
    error::{SafeAccountError, SafeAccountResult},
    owners::webauthn_bootstrap,
    provider::{FeeProvider, GasEstimator, NonceProvider},
    signature::{assemble, SignatureValidity},
};
use ethers::types::{Address, Bytes, U256};
use safe4337_primitives::{
    constants::gas::VERIFICATION_GAS_PER_SIGNER, MetaTransaction, SignerSignaturePair,
    UserOperation, UserOperationGasEstimation, UserOperationV6, UserOperationV7,
    WebAuthnPublicKey,
};
use tracing::{debug, info, trace};

/// External collaborators of a build, each one optional
#[derive(Clone, Copy, Default)]
pub struct Collaborators<'a> {
    pub nonce: Option<&'a dyn NonceProvider>,
    pub fees: Option<&'a dyn FeeProvider>,
    pub gas: Option<&'a dyn GasEstimator>,
}

/// Passkey owner whose verifier still has to replace the shared signer
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingWebAuthnOwner {
    pub key: WebAuthnPublicKey,
    /// Owner preceding the shared signer in the owners list
    pub prev_owner: Address,
}

/// Built user operation with the deployment payload of the account
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UserOperationDraft {
    pub user_operation: UserOperation,
    /// Set only for the first operation (nonce 0) of an account with a known deployment payload
    pub factory: Option<Address>,
    pub factory_data: Option<Bytes>,
}

/// Builds user operations for one account
#[derive(Clone, Debug)]
pub struct OperationBuilder<'a> {
    pub account: Address,
    pub deployment: &'a SafeDeployment,
    /// `createProxyWithNonce` call data of the proxy factory
    pub factory_data: Option<&'a Bytes>,
    pub webauthn_owner: Option<PendingWebAuthnOwner>,
}

impl<'a> OperationBuilder<'a> {
    pub fn new(account: Address, deployment: &'a SafeDeployment) -> Self {
        Self { account, deployment, factory_data: None, webauthn_owner: None }
    }

    pub fn factory_data(mut self, factory_data: Option<&'a Bytes>) -> Self {
        self.factory_data = factory_data;
        self
    }

    pub fn webauthn_owner(mut self, webauthn_owner: Option<PendingWebAuthnOwner>) -> Self {
        self.webauthn_owner = webauthn_owner;
        self
    }

    /// Passkey signatures at this nonce are made by the shared signer
    pub fn is_init(&self, nonce: U256) -> bool {
        nonce.is_zero() && self.webauthn_owner.is_some()
    }

    async fn resolve_nonce(
        &self,
        provider: Option<&dyn NonceProvider>,
        overrides: &UserOperationOverrides,
    ) -> SafeAccountResult<U256> {
        if let Some(nonce) = overrides.nonce {
            return Ok(nonce);
        }
        let provider = provider.ok_or_else(|| SafeAccountError::missing_provider("nonce"))?;
        let nonce = provider.get_nonce(self.deployment.entry_point, self.account).await?;
        trace!("Nonce of {:?} is {nonce}", self.account);
        Ok(nonce)
    }

    /// (max fee per gas, max priority fee per gas)
    async fn resolve_fees(
        &self,
        provider: Option<&dyn FeeProvider>,
        overrides: &UserOperationOverrides,
    ) -> SafeAccountResult<(U256, U256)> {
        if let (Some(max_fee), Some(max_priority_fee)) =
            (overrides.max_fee_per_gas, overrides.max_priority_fee_per_gas)
        {
            return Ok((max_fee, max_priority_fee));
        }

        let provider = provider.ok_or_else(|| SafeAccountError::missing_provider("fees"))?;
        let (max_fee, max_priority_fee) = provider.estimate_fees().await?;
        debug!("Estimated fees: max fee {max_fee}, max priority fee {max_priority_fee}");

        let max_fee = match overrides.max_fee_per_gas {
            Some(max_fee) => max_fee,
            None => apply_percentage(
                max_fee.max(U256::one()),
                overrides.max_fee_per_gas_percentage_multiplier,
            )?,
        };
        let max_priority_fee = match overrides.max_priority_fee_per_gas {
            Some(max_priority_fee) => max_priority_fee,
            None => apply_percentage(
                max_priority_fee.max(U256::one()),
                overrides.max_priority_fee_per_gas_percentage_multiplier,
            )?,
        };
        Ok((max_fee, max_priority_fee))
    }

    pub async fn build(
        &self,
        txs: Vec<MetaTransaction>,
        collaborators: Collaborators<'_>,
        overrides: &UserOperationOverrides,
    ) -> SafeAccountResult<UserOperationDraft> {
        if txs.is_empty() {
            return Err(SafeAccountError::validation("there should be at least one meta transaction"));
        }

        let nonce = self.resolve_nonce(collaborators.nonce, overrides).await?;

        let mut txs = txs;
        if let Some(owner) = self.webauthn_owner.filter(|_| nonce.is_zero()) {
            let bootstrap = webauthn_bootstrap(
                self.account,
                owner.prev_owner,
                &owner.key,
                &self.deployment.webauthn,
                overrides.webauthn_bootstrap,
            )?;
            info!(
                "Prepending {} passkey bootstrap transactions to the first operation of {:?}",
                bootstrap.len(),
                self.account
            );
            txs = bootstrap.into_iter().chain(txs).collect();
        }

        let call_data = match &overrides.call_data {
            Some(call_data) => call_data.clone(),
            None => call_data::encode(
                &txs,
                self.deployment.executor_selector,
                self.deployment.multisend,
            )?,
        };

        let (max_fee_per_gas, max_priority_fee_per_gas) =
            self.resolve_fees(collaborators.fees, overrides).await?;

        let (factory, factory_data) = match (nonce.is_zero(), self.factory_data) {
            (true, Some(data)) => (Some(self.deployment.proxy_factory), Some(data.clone())),
            _ => (None, None),
        };

        let pre_verification_gas = overrides.pre_verification_gas.unwrap_or_default();
        let verification_gas_limit = overrides.verification_gas_limit.unwrap_or_default();
        let call_gas_limit = overrides.call_gas_limit.unwrap_or_default();

        let mut uo = if self.deployment.is_v6() {
            UserOperation::V6(
                UserOperationV6::default()
                    .sender(self.account)
                    .nonce(nonce)
                    .init_code(
                        factory
                            .zip(factory_data.as_ref())
                            .map(|(f, d)| [f.as_bytes(), &d[..]].concat().into())
                            .unwrap_or_default(),
                    )
                    .call_data(call_data)
                    .call_gas_limit(call_gas_limit)
                    .verification_gas_limit(verification_gas_limit)
                    .pre_verification_gas(pre_verification_gas)
                    .max_fee_per_gas(max_fee_per_gas)
                    .max_priority_fee_per_gas(max_priority_fee_per_gas),
            )
        } else {
            UserOperation::V7(UserOperationV7 {
                sender: self.account,
                nonce,
                factory,
                factory_data: factory_data.clone(),
                call_data,
                call_gas_limit,
                verification_gas_limit,
                pre_verification_gas,
                max_fee_per_gas,
                max_priority_fee_per_gas,
                ..Default::default()
            })
        };

        if overrides.pre_verification_gas.is_none()
            || overrides.verification_gas_limit.is_none()
            || overrides.call_gas_limit.is_none()
        {
            let estimator =
                collaborators.gas.ok_or_else(|| SafeAccountError::missing_provider("gas limits"))?;
            let pairs = dummy_signatures(overrides)?;
            let signature = assemble(
                &pairs,
                SignatureValidity::max(),
                Some(self.is_init(nonce)),
                &self.deployment.webauthn,
            )?;
            uo.set_signature(signature);

            let estimation =
                estimate_gas(&uo, pairs.len(), estimator, self.deployment.entry_point, overrides)
                    .await?;

            let pre_verification_gas = match overrides.pre_verification_gas {
                Some(gas) => gas,
                None => apply_percentage(
                    estimation.pre_verification_gas,
                    overrides.pre_verification_gas_percentage_multiplier,
                )?,
            };
            let verification_gas_limit = match overrides.verification_gas_limit {
                Some(gas) => gas,
                None => apply_percentage(
                    estimation.verification_gas_limit,
                    overrides.verification_gas_limit_percentage_multiplier,
                )?,
            };
            let call_gas_limit = match overrides.call_gas_limit {
                Some(gas) => gas,
                None => apply_percentage(
                    estimation.call_gas_limit,
                    overrides.call_gas_limit_percentage_multiplier,
                )?,
            };

            let fields = uo.fields_mut();
            *fields.pre_verification_gas = pre_verification_gas;
            *fields.verification_gas_limit = verification_gas_limit;
            *fields.call_gas_limit = call_gas_limit;
        }

        Ok(UserOperationDraft { user_operation: uo, factory, factory_data })
    }
}

/// Dummy pairs used to size the signature, a single EOA dummy by default
pub(crate) fn dummy_signatures(
    overrides: &UserOperationOverrides,
) -> SafeAccountResult<Vec<SignerSignaturePair>> {
    match &overrides.dummy_signatures {
        Some(pairs) if pairs.is_empty() => {
            Err(SafeAccountError::validation("dummy signatures can't be empty"))
        }
        Some(pairs) => Ok(pairs.clone()),
        None => Ok(vec![SignerSignaturePair::eoa_dummy()]),
    }
}

/// Gas estimation round trip of an operation already carrying its dummy signature
///
/// Fees and gas limits are zeroed for the estimator and the verification gas limit is raised by
/// a fixed amount per signer.
pub(crate) async fn estimate_gas(
    uo: &UserOperation,
    signers: usize,
    estimator: &dyn GasEstimator,
    entry_point: Address,
    overrides: &UserOperationOverrides,
) -> SafeAccountResult<UserOperationGasEstimation> {
    let mut uo = uo.clone();
    let fields = uo.fields_mut();
    *fields.pre_verification_gas = U256::zero();
    *fields.verification_gas_limit = U256::zero();
    *fields.call_gas_limit = U256::zero();
    *fields.max_fee_per_gas = U256::zero();
    *fields.max_priority_fee_per_gas = U256::zero();

    let mut estimation = estimator
        .estimate_user_operation_gas(&uo, entry_point, overrides.state_override_set.as_ref())
        .await?;
    debug!("Gas estimation of {:?}: {estimation:?}", uo.sender());

    estimation.verification_gas_limit = estimation
        .verification_gas_limit
        .saturating_add(U256::from(VERIFICATION_GAS_PER_SIGNER).saturating_mul(U256::from(signers)));
    Ok(estimation)
}
