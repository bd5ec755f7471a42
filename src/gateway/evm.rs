//! alloy-backed Chain Gateway
//!
//! Read calls use one plain HTTP provider per configured chain. Write calls
//! use a provider with the wallet's signer attached; nonce, gas price and
//! chain id are filled explicitly before the wallet signs.

use alloy::{
    network::{Ethereum, EthereumWallet, TransactionBuilder},
    primitives::{Address, TxHash, U256},
    providers::{
        fillers::{FillProvider, JoinFill, WalletFiller},
        Identity, Provider, ProviderBuilder, RootProvider,
    },
    rpc::types::TransactionRequest,
    signers::local::PrivateKeySigner,
    transports::http::{Client, Http},
};
use async_trait::async_trait;
use eyre::eyre;
use std::collections::HashMap;
use tracing::{debug, info};

use super::contracts::ERC20;
use super::{classify_rpc_error, write_error, ChainGateway, RpcErrorClass, TxReceipt, WriteCall};
use crate::chains::ChainRegistry;
use crate::error::{BridgeError, Result};

type ReadProvider = RootProvider<Http<Client>>;

type WalletProvider = FillProvider<
    JoinFill<Identity, WalletFiller<EthereumWallet>>,
    RootProvider<Http<Client>>,
    Http<Client>,
    Ethereum,
>;

/// Gateway over the configured EVM chains
pub struct EvmGateway {
    readers: HashMap<u64, ReadProvider>,
    writers: HashMap<u64, WalletProvider>,
    signer_address: Option<Address>,
}

impl EvmGateway {
    /// Read-only gateway; every write call fails
    pub fn read_only(chains: &ChainRegistry) -> eyre::Result<Self> {
        let mut readers = HashMap::new();
        for chain in chains.all() {
            let url = chain
                .rpc_url
                .parse()
                .map_err(|e| eyre!("Invalid RPC URL for {}: {}", chain.name, e))?;
            readers.insert(chain.chain_id, ProviderBuilder::new().on_http(url));
        }

        info!(chains = ?chains.chain_ids(), "Created read-only chain gateway");

        Ok(Self {
            readers,
            writers: HashMap::new(),
            signer_address: None,
        })
    }

    /// Gateway whose writes are signed with `private_key`
    pub fn with_signer(chains: &ChainRegistry, private_key: &str) -> eyre::Result<Self> {
        let signer: PrivateKeySigner = private_key
            .parse()
            .map_err(|e| eyre!("Invalid private key: {}", e))?;
        let address = signer.address();
        let wallet = EthereumWallet::from(signer);

        let mut gateway = Self::read_only(chains)?;
        for chain in chains.all() {
            let url = chain
                .rpc_url
                .parse()
                .map_err(|e| eyre!("Invalid RPC URL for {}: {}", chain.name, e))?;
            let provider = ProviderBuilder::new().wallet(wallet.clone()).on_http(url);
            gateway.writers.insert(chain.chain_id, provider);
        }
        gateway.signer_address = Some(address);

        info!(address = %address, "Chain gateway signer attached");

        Ok(gateway)
    }

    /// Address of the attached signer, if any
    pub fn signer_address(&self) -> Option<Address> {
        self.signer_address
    }

    fn reader(&self, chain_id: u64) -> Result<&ReadProvider> {
        self.readers
            .get(&chain_id)
            .ok_or(BridgeError::UnsupportedChain(chain_id))
    }

    fn writer(&self, chain_id: u64, from: Address) -> Result<&WalletProvider> {
        match self.signer_address {
            None => {
                return Err(BridgeError::SubmissionFailure(
                    "no wallet signer attached".to_string(),
                ))
            }
            Some(signer) if signer != from => {
                return Err(BridgeError::SubmissionFailure(format!(
                    "sender {} does not match wallet signer {}",
                    from, signer
                )))
            }
            Some(_) => {}
        }
        self.writers
            .get(&chain_id)
            .ok_or(BridgeError::UnsupportedChain(chain_id))
    }

    fn request(chain_id: u64, from: Address, call: &WriteCall) -> TransactionRequest {
        TransactionRequest::default()
            .with_from(from)
            .with_to(call.to())
            .with_input(call.calldata())
            .with_value(call.value())
            .with_chain_id(chain_id)
    }
}

#[async_trait]
impl ChainGateway for EvmGateway {
    async fn native_balance(&self, chain_id: u64, owner: Address) -> Result<U256> {
        self.reader(chain_id)?
            .get_balance(owner)
            .await
            .map_err(|e| BridgeError::Rpc(format!("Failed to get balance: {}", e)))
    }

    async fn token_balance(&self, chain_id: u64, token: Address, owner: Address) -> Result<U256> {
        let contract = ERC20::new(token, self.reader(chain_id)?);
        let balance = contract
            .balanceOf(owner)
            .call()
            .await
            .map_err(|e| BridgeError::Rpc(format!("Failed to get token balance: {}", e)))?;
        Ok(balance._0)
    }

    async fn allowance(
        &self,
        chain_id: u64,
        token: Address,
        owner: Address,
        spender: Address,
    ) -> Result<U256> {
        let contract = ERC20::new(token, self.reader(chain_id)?);
        let allowance = contract
            .allowance(owner, spender)
            .call()
            .await
            .map_err(|e| BridgeError::Rpc(format!("Failed to get allowance: {}", e)))?;
        Ok(allowance._0)
    }

    async fn estimate_gas(&self, chain_id: u64, from: Address, call: &WriteCall) -> Result<u64> {
        let tx = Self::request(chain_id, from, call);
        self.reader(chain_id)?
            .estimate_gas(&tx)
            .await
            .map_err(|e| BridgeError::Rpc(format!("Failed to estimate gas: {}", e)))
    }

    async fn send(
        &self,
        chain_id: u64,
        from: Address,
        call: &WriteCall,
        gas_limit: u64,
    ) -> Result<TxHash> {
        let provider = self.writer(chain_id, from)?;

        let nonce = provider
            .get_transaction_count(from)
            .await
            .map_err(|e| BridgeError::Rpc(format!("Failed to get nonce: {}", e)))?;
        let gas_price = provider
            .get_gas_price()
            .await
            .map_err(|e| BridgeError::Rpc(format!("Failed to get gas price: {}", e)))?;

        let tx = Self::request(chain_id, from, call)
            .with_nonce(nonce)
            .with_gas_limit(gas_limit)
            .with_gas_price(gas_price);

        debug!(
            method = call.method(),
            chain_id,
            nonce,
            gas_limit,
            gas_price,
            "Sending transaction"
        );

        let pending = provider
            .send_transaction(tx)
            .await
            .map_err(|e| write_error(&e.to_string()))?;

        Ok(*pending.tx_hash())
    }

    async fn transaction_receipt(
        &self,
        chain_id: u64,
        tx_hash: TxHash,
    ) -> Result<Option<TxReceipt>> {
        match self.reader(chain_id)?.get_transaction_receipt(tx_hash).await {
            Ok(Some(receipt)) => Ok(Some(TxReceipt {
                tx_hash,
                block_number: receipt.block_number,
                success: receipt.status(),
            })),
            Ok(None) => Ok(None),
            Err(e) => {
                let msg = e.to_string();
                if classify_rpc_error(&msg) == RpcErrorClass::NotFound {
                    debug!(tx_hash = %tx_hash, chain_id, "Transaction not indexed yet");
                    Ok(None)
                } else {
                    Err(BridgeError::Rpc(format!("Failed to get receipt: {}", msg)))
                }
            }
        }
    }
}
