use async_trait::async_trait;
use ethers::types::{spoof, Address, U256};
use safe4337_account::{FeeProvider, GasEstimator, NonceProvider, SafeAccountResult};
use safe4337_primitives::{UserOperation, UserOperationGasEstimation};
use std::sync::Mutex;

/// In-memory node and bundler
#[derive(Debug, Default)]
pub struct MockChain {
    pub nonce: U256,
    pub fees: (U256, U256),
    pub estimation: UserOperationGasEstimation,
    /// Operations handed to the gas estimator
    pub estimated: Mutex<Vec<UserOperation>>,
    pub fee_requests: Mutex<usize>,
}

impl MockChain {
    pub fn new(nonce: u64) -> Self {
        Self {
            nonce: nonce.into(),
            fees: (30_000_000_000u64.into(), 1_000_000_000u64.into()),
            estimation: UserOperationGasEstimation {
                pre_verification_gas: 50_000.into(),
                verification_gas_limit: 100_000.into(),
                call_gas_limit: 70_000.into(),
            },
            ..Default::default()
        }
    }

    pub fn fees(mut self, max_fee: u64, max_priority_fee: u64) -> Self {
        self.fees = (max_fee.into(), max_priority_fee.into());
        self
    }

    pub fn last_estimated(&self) -> Option<UserOperation> {
        self.estimated.lock().ok().and_then(|ops| ops.last().cloned())
    }
}

#[async_trait]
impl NonceProvider for MockChain {
    async fn get_nonce(&self, _entry_point: Address, _account: Address) -> SafeAccountResult<U256> {
        Ok(self.nonce)
    }
}

#[async_trait]
impl FeeProvider for MockChain {
    async fn estimate_fees(&self) -> SafeAccountResult<(U256, U256)> {
        if let Ok(mut requests) = self.fee_requests.lock() {
            *requests += 1;
        }
        Ok(self.fees)
    }
}

#[async_trait]
impl GasEstimator for MockChain {
    async fn estimate_user_operation_gas(
        &self,
        uo: &UserOperation,
        _entry_point: Address,
        _state_override: Option<&spoof::State>,
    ) -> SafeAccountResult<UserOperationGasEstimation> {
        if let Ok(mut ops) = self.estimated.lock() {
            ops.push(uo.clone());
        }
        Ok(self.estimation.clone())
    }
}
