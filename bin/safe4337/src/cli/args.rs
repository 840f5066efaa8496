use crate::utils::{parse_address, parse_deployment, parse_u256, read_json};
use clap::Parser;
use ethers::types::{Address, U256};
use expanded_pathbuf::ExpandedPathBuf;
use safe4337_account::{InitOverrides, SafeDeployment};
use safe4337_primitives::{Signer, WebAuthnPublicKey};

/// Deployment CLI args
#[derive(Debug, Clone, Parser)]
pub struct DeploymentArgs {
    /// Safe 4337 module release: `v0.2.0` (entry point v0.6) or `v0.3.0` (entry point v0.7).
    ///
    /// By default, this option is set to `v0.3.0`.
    #[clap(long, default_value = "v0.3.0", value_parser=parse_deployment)]
    pub deployment: SafeDeployment,

    /// JSON file with custom deployment addresses, takes precedence over `--deployment`.
    #[clap(long)]
    pub deployment_file: Option<ExpandedPathBuf>,
}

impl DeploymentArgs {
    pub fn deployment(&self) -> eyre::Result<SafeDeployment> {
        match &self.deployment_file {
            Some(path) => read_json(path),
            None => Ok(self.deployment.clone()),
        }
    }
}

/// Account owners CLI args
#[derive(Debug, Clone, Parser, PartialEq)]
pub struct OwnersArgs {
    /// Owner addresses.
    #[clap(long = "owner", value_parser=parse_address)]
    pub owners: Vec<Address>,

    /// X coordinate of a passkey owner.
    #[clap(long, requires = "passkey_y", value_parser=parse_u256)]
    pub passkey_x: Option<U256>,

    /// Y coordinate of a passkey owner.
    #[clap(long, requires = "passkey_x", value_parser=parse_u256)]
    pub passkey_y: Option<U256>,

    /// Number of required confirmations.
    ///
    /// By default, this option is set to `1`.
    #[clap(long)]
    pub threshold: Option<u64>,

    /// CREATE2 nonce of the proxy.
    #[clap(long, value_parser=parse_u256)]
    pub c2_nonce: Option<U256>,
}

impl OwnersArgs {
    pub fn signers(&self) -> Vec<Signer> {
        let mut signers: Vec<Signer> = self.owners.iter().copied().map(Signer::from).collect();
        if let (Some(x), Some(y)) = (self.passkey_x, self.passkey_y) {
            signers.push(WebAuthnPublicKey { x, y }.into());
        }
        signers
    }

    pub fn overrides(&self) -> InitOverrides {
        InitOverrides { threshold: self.threshold, c2_nonce: self.c2_nonce }
    }
}

/// Signature validity window CLI args
#[derive(Debug, Clone, Parser, PartialEq)]
pub struct ValidityArgs {
    /// Chain ID of the network.
    #[clap(long)]
    pub chain_id: u64,

    /// Timestamp after which the operation is valid (0 for no bound).
    #[clap(long, default_value_t = 0)]
    pub valid_after: u64,

    /// Timestamp until which the operation is valid (0 for no bound).
    #[clap(long, default_value_t = 0)]
    pub valid_until: u64,
}
