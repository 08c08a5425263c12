//! Transaction signing for `issue`.
//!
//! Two modes:
//!
//! - **RPC-managed**: the node signs for an unlocked or KMS-backed account
//!   (`eth_sendTransaction`). The client never sees key material.
//! - **Local**: a secp256k1 key held in process as an `ethers` wallet. The
//!   client builds an EIP-155 legacy transaction, signs it, and submits the
//!   raw bytes (`eth_sendRawTransaction`).

use credchain_core::Address;
use ethers_core::types::transaction::eip2718::TypedTransaction;
use ethers_core::types::{Bytes, NameOrAddress, TransactionRequest, H160, U256};
use ethers_signers::{LocalWallet, Signer as _, WalletError};
use k256::ecdsa::SigningKey;
use zeroize::Zeroizing;

use crate::config::{ConfigError, SignerConfig};

/// A configured signing identity.
#[derive(Debug)]
pub enum Signer {
    /// Sign in process.
    Local(LocalSigner),
    /// Delegate signing to the node.
    RpcManaged {
        /// Account the node signs for.
        from: Address,
    },
}

impl Signer {
    /// Build a signer from configuration.
    pub fn from_config(config: &SignerConfig) -> Result<Self, ConfigError> {
        match config {
            SignerConfig::Local(key) => Ok(Self::Local(LocalSigner::from_hex(key)?)),
            SignerConfig::RpcManaged { from } => Ok(Self::RpcManaged { from: *from }),
        }
    }

    /// The account transactions are sent from.
    pub fn address(&self) -> Address {
        match self {
            Self::Local(local) => local.address(),
            Self::RpcManaged { from } => *from,
        }
    }
}

/// An in-process secp256k1 wallet and its derived address.
pub struct LocalSigner {
    wallet: LocalWallet,
    address: Address,
}

impl std::fmt::Debug for LocalSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalSigner")
            .field("address", &self.address)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

impl LocalSigner {
    /// Parse a 32-byte private key given as hex, with or without `0x`.
    pub fn from_hex(private_key: &str) -> Result<Self, ConfigError> {
        let trimmed = private_key.trim();
        let body = trimmed.strip_prefix("0x").unwrap_or(trimmed);
        if body.len() != 64 {
            return Err(ConfigError::InvalidPrivateKey("expected 64 hex characters"));
        }
        let mut bytes = Zeroizing::new([0u8; 32]);
        hex::decode_to_slice(body, &mut bytes[..])
            .map_err(|_| ConfigError::InvalidPrivateKey("not hex"))?;
        let key = SigningKey::from_slice(&bytes[..])
            .map_err(|_| ConfigError::InvalidPrivateKey("not a valid secp256k1 scalar"))?;
        let wallet = LocalWallet::from(key);
        let address = Address::from_bytes(wallet.address().0);
        Ok(Self { wallet, address })
    }

    /// The account address derived from the public key.
    pub fn address(&self) -> Address {
        self.address
    }

    /// Sign a legacy transaction with EIP-155 replay protection and return
    /// the raw RLP bytes ready for `eth_sendRawTransaction`.
    pub fn sign_transaction(
        &self,
        tx: &LegacyTransaction,
        chain_id: u64,
    ) -> Result<Vec<u8>, WalletError> {
        let typed = tx.to_typed(chain_id);
        let signature = self.wallet.sign_transaction_sync(&typed)?;
        Ok(typed.rlp_signed(&signature).to_vec())
    }
}

/// A pre-EIP-1559 transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LegacyTransaction {
    pub nonce: u64,
    pub gas_price: u128,
    pub gas_limit: u64,
    pub to: Address,
    pub value: u128,
    pub data: Vec<u8>,
}

impl LegacyTransaction {
    /// The `ethers` request this transaction signs as, bound to `chain_id`.
    pub fn to_typed(&self, chain_id: u64) -> TypedTransaction {
        let request = TransactionRequest::new()
            .nonce(self.nonce)
            .gas_price(U256::from(self.gas_price))
            .gas(self.gas_limit)
            .to(NameOrAddress::Address(H160::from_slice(self.to.as_bytes())))
            .value(U256::from(self.value))
            .data(Bytes::from(self.data.clone()))
            .chain_id(chain_id);
        TypedTransaction::Legacy(request)
    }
}
