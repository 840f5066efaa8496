//! Account owners and the signatures they produce

use crate::constants::dummy;
use ethers::types::{Address, Bytes, U256};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Public key coordinates of a passkey (secp256r1)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WebAuthnPublicKey {
    pub x: U256,
    pub y: U256,
}

/// An owner of the Safe account
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Signer {
    /// Externally owned account (or any contract owner) identified by its address
    Address(Address),
    /// Passkey owner, represented on-chain by a verifier contract
    WebAuthn(WebAuthnPublicKey),
}

impl Signer {
    pub fn is_webauthn(&self) -> bool {
        matches!(self, Signer::WebAuthn(_))
    }

    pub fn address(&self) -> Option<Address> {
        match self {
            Signer::Address(addr) => Some(*addr),
            Signer::WebAuthn(_) => None,
        }
    }
}

impl From<Address> for Signer {
    fn from(value: Address) -> Self {
        Signer::Address(value)
    }
}

impl From<WebAuthnPublicKey> for Signer {
    fn from(value: WebAuthnPublicKey) -> Self {
        Signer::WebAuthn(value)
    }
}

/// A signer together with the signature it produced over the Safe operation hash
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignerSignaturePair {
    pub signer: Signer,
    pub signature: Bytes,
    /// Forces the contract-signature layout for an address signer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_contract_signature: Option<bool>,
    /// Bootstrap phase marker for passkey signers (shared signer not yet swapped)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_init: Option<bool>,
}

impl SignerSignaturePair {
    pub fn new(signer: impl Into<Signer>, signature: Bytes) -> Self {
        Self { signer: signer.into(), signature, is_contract_signature: None, is_init: None }
    }

    pub fn contract_signature(mut self, is_contract_signature: bool) -> Self {
        self.is_contract_signature = Some(is_contract_signature);
        self
    }

    pub fn init(mut self, is_init: bool) -> Self {
        self.is_init = Some(is_init);
        self
    }

    /// Dummy ECDSA pair used to size signatures during gas estimation
    pub fn eoa_dummy() -> Self {
        let signer = Address::from_str(dummy::EOA_SIGNER).unwrap_or_default();
        let signature = Bytes::from_str(dummy::EOA_SIGNATURE).unwrap_or_default();
        Self::new(signer, signature).contract_signature(false)
    }
}
