//! External collaborators: node and bundler access behind async traits

use crate::{
    error::{SafeAccountError, SafeAccountResult},
    utils::encode_call,
};
use async_trait::async_trait;
use ethers::{
    abi::{decode, ParamType, Token},
    providers::{Http, JsonRpcClient, Middleware, Provider},
    types::{
        spoof, transaction::eip2718::TypedTransaction, Address, Bytes, Chain, TransactionRequest,
        U256,
    },
};
use safe4337_primitives::{
    constants::selectors, UserOperation, UserOperationGasEstimation, UserOperationHash,
};
use std::{sync::Arc, time::Duration};

/// Source of the account's entry point nonce
#[async_trait]
pub trait NonceProvider: Send + Sync {
    async fn get_nonce(&self, entry_point: Address, account: Address) -> SafeAccountResult<U256>;
}

/// Source of EIP-1559 fees as (max fee per gas, max priority fee per gas)
#[async_trait]
pub trait FeeProvider: Send + Sync {
    async fn estimate_fees(&self) -> SafeAccountResult<(U256, U256)>;
}

/// Gas limits estimation of a user operation (usually a bundler)
#[async_trait]
pub trait GasEstimator: Send + Sync {
    async fn estimate_user_operation_gas(
        &self,
        uo: &UserOperation,
        entry_point: Address,
        state_override: Option<&spoof::State>,
    ) -> SafeAccountResult<UserOperationGasEstimation>;
}

/// Deployed code lookup
#[async_trait]
pub trait CodeProvider: Send + Sync {
    async fn get_code(&self, address: Address) -> SafeAccountResult<Bytes>;
}

/// Read-only contract calls
#[async_trait]
pub trait CallProvider: Send + Sync {
    async fn call(&self, to: Address, data: Bytes) -> SafeAccountResult<Bytes>;
}

/// Node backed collaborators
#[derive(Debug)]
pub struct EthClient<M: Middleware> {
    pub client: Arc<M>,
}

impl<M: Middleware> Clone for EthClient<M> {
    fn clone(&self) -> Self {
        Self { client: self.client.clone() }
    }
}

impl<M: Middleware> EthClient<M> {
    pub fn new(client: Arc<M>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl<M: Middleware + 'static> CallProvider for EthClient<M> {
    async fn call(&self, to: Address, data: Bytes) -> SafeAccountResult<Bytes> {
        let tx: TypedTransaction = TransactionRequest::new().to(to).data(data).into();
        self.client.call(&tx, None).await.map_err(SafeAccountError::provider)
    }
}

#[async_trait]
impl<M: Middleware + 'static> NonceProvider for EthClient<M> {
    /// `getNonce(account, 0)` on the entry point
    async fn get_nonce(&self, entry_point: Address, account: Address) -> SafeAccountResult<U256> {
        let data = encode_call(
            selectors::GET_NONCE,
            &[Token::Address(account), Token::Uint(U256::zero())],
        );
        let res = CallProvider::call(self, entry_point, data).await?;
        match decode(&[ParamType::Uint(256)], &res)?.pop() {
            Some(Token::Uint(nonce)) => Ok(nonce),
            _ => Err(SafeAccountError::bad_data("getNonce didn't return a uint256", res)),
        }
    }
}

#[async_trait]
impl<M: Middleware + 'static> FeeProvider for EthClient<M> {
    async fn estimate_fees(&self) -> SafeAccountResult<(U256, U256)> {
        self.client.estimate_eip1559_fees(None).await.map_err(SafeAccountError::provider)
    }
}

#[async_trait]
impl<M: Middleware + 'static> CodeProvider for EthClient<M> {
    async fn get_code(&self, address: Address) -> SafeAccountResult<Bytes> {
        self.client.get_code(address, None).await.map_err(SafeAccountError::provider)
    }
}

/// ERC-4337 bundler JSON-RPC client
#[derive(Debug, Clone)]
pub struct BundlerClient<P: JsonRpcClient> {
    pub provider: Provider<P>,
}

impl<P: JsonRpcClient> BundlerClient<P> {
    pub fn new(provider: Provider<P>) -> Self {
        Self { provider }
    }

    /// `eth_sendUserOperation`
    pub async fn send_user_operation(
        &self,
        uo: &UserOperation,
        entry_point: Address,
    ) -> SafeAccountResult<UserOperationHash> {
        self.provider
            .request("eth_sendUserOperation", (uo, entry_point))
            .await
            .map_err(SafeAccountError::provider)
    }
}

#[async_trait]
impl<P: JsonRpcClient + 'static> GasEstimator for BundlerClient<P> {
    async fn estimate_user_operation_gas(
        &self,
        uo: &UserOperation,
        entry_point: Address,
        state_override: Option<&spoof::State>,
    ) -> SafeAccountResult<UserOperationGasEstimation> {
        let mut params = vec![
            serde_json::to_value(uo).map_err(SafeAccountError::provider)?,
            serde_json::to_value(entry_point).map_err(SafeAccountError::provider)?,
        ];
        if let Some(state) = state_override {
            params.push(serde_json::to_value(state).map_err(SafeAccountError::provider)?);
        }
        self.provider
            .request("eth_estimateUserOperationGas", params)
            .await
            .map_err(SafeAccountError::provider)
    }
}

/// Creates ethers provider with HTTP connection
pub async fn create_http_provider(addr: &str) -> SafeAccountResult<Provider<Http>> {
    let provider = Provider::<Http>::try_from(addr).map_err(SafeAccountError::provider)?;

    let chain_id = provider.get_chainid().await.map_err(SafeAccountError::provider)?;

    Ok(provider.interval(if chain_id == Chain::Dev.into() {
        Duration::from_millis(5u64)
    } else {
        Duration::from_millis(500u64)
    }))
}
