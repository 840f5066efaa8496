//! Safe and account abstraction (ERC-4337) related constants

/// Entry point smart contracts
pub mod entry_point {
    /// Address of the v0.6 entry point
    pub const ADDRESS_V6: &str = "0x5FF137D4b0FDCD49DcA30c7CF57E578a026d2789";
    /// Address of the v0.7 entry point
    pub const ADDRESS_V7: &str = "0x0000000071727De22E5E9d8BAf0edAc6f37da032";
}

/// Safe core contracts (v1.4.1)
pub mod safe {
    /// Safe L2 singleton
    pub const SINGLETON_L2_V1_4_1: &str = "0x29fcB43b46531BcA003ddC8FCB67FFE91900C762";
    /// keccak256(proxyCreationCode ‖ uint256(singleton))
    pub const SINGLETON_L2_V1_4_1_INIT_HASH: &str =
        "0xe298282cefe913ab5d282047161268a8222e4bd4ed106300c547894bbefd31ee";
    /// Safe proxy factory
    pub const PROXY_FACTORY: &str = "0x4e1DCf7AD4e460CfD30791CCC4F9c8a4f820ec67";
    /// MultiSend 1.4.1 contract used for batching, supports delegatecall entries
    pub const MULTISEND: &str = "0x38869bf66a61cF6bDB996A6aE40D5853Fd43B526";
    /// Head of the owners linked list
    pub const SENTINEL_OWNERS: &str = "0x0000000000000000000000000000000000000001";
}

/// Safe 4337 module releases
pub mod module {
    /// Safe4337Module v0.2.0 (entry point v0.6)
    pub const SAFE_4337_MODULE_V0_2_0: &str = "0xa581c4A4DB7175302464fF3C06380BC3270b4037";
    /// SafeModuleSetup v0.2.0
    pub const SAFE_MODULE_SETUP_V0_2_0: &str = "0x8EcD4ec46D4D2a6B64fE960B3D64e8B94B2234eb";
    /// Safe4337Module v0.3.0 (entry point v0.7)
    pub const SAFE_4337_MODULE_V0_3_0: &str = "0x75cf11467937ce3F2f357CE24ffc3DBF8fD5c226";
    /// SafeModuleSetup v0.3.0
    pub const SAFE_MODULE_SETUP_V0_3_0: &str = "0x2dd68b007B46fBe91B9A7c3EDa5A7a1063cB5b47";
}

/// Passkey (WebAuthn) signer contracts
pub mod webauthn {
    pub const SHARED_SIGNER: &str = "0xfD90FAd33ee8b58f32c00aceEad1358e4AFC23f9";
    pub const SIGNER_SINGLETON: &str = "0x270D7E4a57E6322f336261f3EaE2BADe72E68d72";
    pub const SIGNER_FACTORY: &str = "0xF7488fFbe67327ac9f37D5F722d83Fc900852Fbf";
    pub const FCLP256_VERIFIER: &str = "0x445a0683e494ea0c5AF3E83c5159fBE47Cf9e765";
    /// Zero address means no EIP-7212 precompile
    pub const PRECOMPILE: &str = "0x0000000000000000000000000000000000000000";
    /// Creation code of the per-key signer proxy
    pub const SIGNER_PROXY_CREATION_CODE: &str =
        "0x61010060405234801561001157600080fd5b506040516101ee3803806101ee83398101604081905261003091610058565b6001600160a01b0390931660805260a09190915260c0526001600160b01b031660e0526100bc565b6000806000806080858703121561006e57600080fd5b84516001600160a01b038116811461008557600080fd5b60208601516040870151606088015192965090945092506001600160b01b03811681146100b157600080fd5b939692955090935050565b60805160a05160c05160e05160ff6100ef60003960006008015260006031015260006059015260006080015260ff6000f3fe608060408190527f00000000000000000000000000000000000000000000000000000000000000003660b681018290527f000000000000000000000000000000000000000000000000000000000000000060a082018190527f00000000000000000000000000000000000000000000000000000000000000008285018190527f00000000000000000000000000000000000000000000000000000000000000009490939192600082376000806056360183885af490503d6000803e8060c3573d6000fd5b503d6000f3fea2646970667358221220ddd9bb059ba7a6497d560ca97aadf4dbf0476f578378554a50d41c6bb654beae64736f6c63430008180033";
}

/// 4-byte function selectors of the contracts the account talks to
pub mod selectors {
    /// `setup(address[],uint256,address,bytes,address,address,uint256,address)`
    pub const SETUP: [u8; 4] = [0xb6, 0x3e, 0x80, 0x0d];
    /// `multiSend(bytes)`
    pub const MULTISEND: [u8; 4] = [0x8d, 0x80, 0xff, 0x0a];
    /// `enableModules(address[])`
    pub const ENABLE_MODULES: [u8; 4] = [0x8d, 0x0d, 0xc4, 0x9f];
    /// `configure((uint256,uint256,uint176))` on the shared signer
    pub const CONFIGURE_SHARED_SIGNER: [u8; 4] = [0x0d, 0xd9, 0x69, 0x2f];
    /// `createSigner(uint256,uint256,uint176)` on the signer factory
    pub const CREATE_SIGNER: [u8; 4] = [0x0d, 0x2f, 0x04, 0x89];
    /// `swapOwner(address,address,address)`
    pub const SWAP_OWNER: [u8; 4] = [0xe3, 0x18, 0xb5, 0x2b];
    /// `removeOwner(address,address,uint256)`
    pub const REMOVE_OWNER: [u8; 4] = [0xf8, 0xdc, 0x5d, 0xd9];
    /// `addOwnerWithThreshold(address,uint256)`
    pub const ADD_OWNER_WITH_THRESHOLD: [u8; 4] = [0x0d, 0x58, 0x2f, 0x13];
    /// `getOwners()`
    pub const GET_OWNERS: [u8; 4] = [0xa0, 0xe6, 0x7e, 0x2b];
    /// `createProxyWithNonce(address,bytes,uint256)`
    pub const CREATE_PROXY_WITH_NONCE: [u8; 4] = [0x16, 0x88, 0xf0, 0xb9];
    /// `executeUserOp(address,uint256,bytes,uint8)`
    pub const EXECUTE_USER_OP: [u8; 4] = [0x7b, 0xb3, 0x74, 0x28];
    /// `executeUserOpWithErrorString(address,uint256,bytes,uint8)`
    pub const EXECUTE_USER_OP_WITH_ERROR_STRING: [u8; 4] = [0x54, 0x1d, 0x63, 0xc8];
    /// `approve(address,uint256)`
    pub const APPROVE: [u8; 4] = [0x09, 0x5e, 0xa7, 0xb3];
    /// `getNonce(address,uint192)` on the entry point
    pub const GET_NONCE: [u8; 4] = [0x35, 0x56, 0x7e, 0x1a];
}

/// EIP-712 type strings of the Safe 4337 module
pub mod eip712 {
    pub const DOMAIN_TYPE: &str = "EIP712Domain(uint256 chainId,address verifyingContract)";
    pub const SAFE_OP_V6_TYPE: &str = "SafeOp(address safe,uint256 nonce,bytes initCode,bytes callData,uint256 callGasLimit,uint256 verificationGasLimit,uint256 preVerificationGas,uint256 maxFeePerGas,uint256 maxPriorityFeePerGas,bytes paymasterAndData,uint48 validAfter,uint48 validUntil,address entryPoint)";
    pub const SAFE_OP_V7_TYPE: &str = "SafeOp(address safe,uint256 nonce,bytes initCode,bytes callData,uint128 verificationGasLimit,uint128 callGasLimit,uint256 preVerificationGas,uint128 maxPriorityFeePerGas,uint128 maxFeePerGas,bytes paymasterAndData,uint48 validAfter,uint48 validUntil,address entryPoint)";
}

/// Gas estimation
pub mod gas {
    /// Extra verification gas per signer not covered by bundler estimates
    pub const VERIFICATION_GAS_PER_SIGNER: u64 = 55_000;
    /// validAfter/validUntil used by dummy signatures during estimation
    pub const DUMMY_SIGNATURE_VALIDITY: u64 = 0xffff_ffff_ffff;
    /// Largest value a uint48 timestamp can hold
    pub const UINT48_MAX: u64 = 0xffff_ffff_ffff;
}

/// Dummy signatures used when estimating gas
pub mod dummy {
    pub const EOA_SIGNER: &str = "0xfD90FAd33ee8b58f32c00aceEad1358e4AFC23f9";
    pub const EOA_SIGNATURE: &str = "0x47003599ffa7e9198f321afa774e34a12a959844efd6363b88896e9c24ed33cf4e1be876ef123a3c4467e7d451511434039539699f2baa2f44955fa3d1c1c6d81c";
}
