use crate::{
    cli::args::{DeploymentArgs, OwnersArgs, ValidityArgs},
    utils::{parse_address, parse_bytes, parse_u256, read_json, validate_private_key},
};
use clap::Parser;
use ethers::{
    signers::LocalWallet,
    types::{Address, Bytes, U256},
};
use expanded_pathbuf::ExpandedPathBuf;
use safe4337_account::{
    address::derive_webauthn_verifier_address, call_data, multisend, provider::create_http_provider,
    EthClient, NonceProvider, SafeAccount, SignatureValidity,
};
use safe4337_primitives::{MetaTransaction, UserOperation, WebAuthnPublicKey};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

fn print_json(value: &serde_json::Value) -> eyre::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

/// Address and deployment payload of a new account
#[derive(Debug, Parser)]
pub struct AccountAddressCommand {
    #[clap(flatten)]
    owners: OwnersArgs,

    #[clap(flatten)]
    deployment: DeploymentArgs,
}

impl AccountAddressCommand {
    /// Execute the command
    pub fn execute(self) -> eyre::Result<()> {
        let deployment = self.deployment.deployment()?;
        let signers = self.owners.signers();
        let account =
            SafeAccount::initialize_new_account(&signers, self.owners.overrides(), deployment)?;

        print_json(&json!({
            "address": account.address(),
            "factory": account.deployment().proxy_factory,
            "factoryData": account.factory_data(),
        }))
    }
}

/// Address of the verifier proxy of a passkey
#[derive(Debug, Parser)]
pub struct WebAuthnVerifierAddressCommand {
    /// X coordinate of the public key.
    #[clap(long, value_parser=parse_u256)]
    x: U256,

    /// Y coordinate of the public key.
    #[clap(long, value_parser=parse_u256)]
    y: U256,

    #[clap(flatten)]
    deployment: DeploymentArgs,
}

impl WebAuthnVerifierAddressCommand {
    /// Execute the command
    pub fn execute(self) -> eyre::Result<()> {
        let deployment = self.deployment.deployment()?;
        let address = derive_webauthn_verifier_address(
            &WebAuthnPublicKey { x: self.x, y: self.y },
            &deployment.webauthn,
        )?;
        print_json(&json!({ "address": address }))
    }
}

/// Executor call data for a list of transactions
#[derive(Debug, Parser)]
pub struct EncodeCallDataCommand {
    /// JSON file with the transactions (`[{ "to", "value", "data", "operation" }]`).
    #[clap(long)]
    transactions: ExpandedPathBuf,

    #[clap(flatten)]
    deployment: DeploymentArgs,
}

impl EncodeCallDataCommand {
    /// Execute the command
    pub fn execute(self) -> eyre::Result<()> {
        let deployment = self.deployment.deployment()?;
        let txs: Vec<MetaTransaction> = read_json(&self.transactions)?;
        info!("Encoding {} transactions", txs.len());

        let call_data =
            call_data::encode(&txs, deployment.executor_selector, deployment.multisend)?;
        print_json(&json!({ "callData": call_data }))
    }
}

/// Transactions executed by executor call data
#[derive(Debug, Parser)]
pub struct DecodeCallDataCommand {
    /// Hex encoded call data.
    #[clap(value_parser=parse_bytes)]
    call_data: Bytes,
}

impl DecodeCallDataCommand {
    /// Execute the command
    pub fn execute(self) -> eyre::Result<()> {
        let (tx, executor) = call_data::decode(&self.call_data)?;
        let txs = if multisend::is_multisend(&tx.data) {
            multisend::decode_list(&multisend::decode(&tx.data)?)?
        } else {
            vec![tx]
        };
        print_json(&json!({ "executor": executor, "transactions": txs }))
    }
}

/// EIP-712 (Safe operation) and entry point hashes of a user operation
#[derive(Debug, Parser)]
pub struct HashCommand {
    /// JSON file with the user operation.
    #[clap(long)]
    user_operation: ExpandedPathBuf,

    #[clap(flatten)]
    validity: ValidityArgs,

    #[clap(flatten)]
    deployment: DeploymentArgs,
}

impl HashCommand {
    /// Execute the command
    pub fn execute(self) -> eyre::Result<()> {
        let uo: UserOperation = read_json(&self.user_operation)?;
        let account = SafeAccount::new(uo.sender(), self.deployment.deployment()?);
        let validity = SignatureValidity::new(self.validity.valid_after, self.validity.valid_until);

        print_json(&json!({
            "safeOperationHash": account.get_user_operation_eip712_hash(&uo, self.validity.chain_id, validity)?,
            "userOperationHash": account.get_user_operation_hash(&uo, self.validity.chain_id),
        }))
    }
}

/// Signs a user operation with one or more owner keys
#[derive(Debug, Parser)]
pub struct SignCommand {
    /// JSON file with the user operation.
    #[clap(long)]
    user_operation: ExpandedPathBuf,

    /// Hex encoded private key of an owner.
    #[clap(long = "private-key", required = true, value_parser=validate_private_key)]
    private_keys: Vec<String>,

    #[clap(flatten)]
    validity: ValidityArgs,

    #[clap(flatten)]
    deployment: DeploymentArgs,
}

impl SignCommand {
    /// Execute the command
    pub fn execute(self) -> eyre::Result<()> {
        let mut uo: UserOperation = read_json(&self.user_operation)?;
        let account = SafeAccount::new(uo.sender(), self.deployment.deployment()?);
        let wallets = self
            .private_keys
            .iter()
            .map(|key| key.parse::<LocalWallet>())
            .collect::<Result<Vec<_>, _>>()?;
        let validity = SignatureValidity::new(self.validity.valid_after, self.validity.valid_until);

        let signature =
            account.sign_user_operation(&uo, &wallets, self.validity.chain_id, validity)?;
        uo.set_signature(signature);
        print_json(&serde_json::to_value(&uo)?)
    }
}

/// Owners and nonce of a deployed account
#[derive(Debug, Parser)]
pub struct OwnersCommand {
    /// Ethereum execution client RPC endpoint.
    #[clap(long, default_value = "http://127.0.0.1:8545")]
    rpc_url: String,

    /// Address of the account.
    #[clap(long, value_parser=parse_address)]
    account: Address,

    #[clap(flatten)]
    deployment: DeploymentArgs,
}

impl OwnersCommand {
    /// Execute the command
    pub async fn execute(self) -> eyre::Result<()> {
        let deployment = self.deployment.deployment()?;
        let provider = create_http_provider(&self.rpc_url).await?;
        info!("Connected to the Ethereum execution client at {}", self.rpc_url);
        let client = EthClient::new(Arc::new(provider));

        let account = SafeAccount::new(self.account, deployment);
        let owners = account.get_owners(&client).await?;
        let nonce = client.get_nonce(account.deployment().entry_point, account.address()).await?;
        print_json(&json!({ "owners": owners, "nonce": nonce }))
    }
}
