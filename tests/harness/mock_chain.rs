use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use alloy_primitives::{Address, Bytes, B256, U256};
use async_trait::async_trait;
use dexbot::error::{ChainError, Result};
use dexbot::port::outbound::chain::{ChainClient, GasFees, TxReceipt, TxRequest};
use parking_lot::Mutex;

/// Balance changes applied when the next swap is mined.
#[derive(Debug, Clone)]
pub struct SwapEffect {
    pub debit: (Address, U256),
    pub credit: (Address, U256),
}

/// How the next swap transaction behaves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SwapMode {
    #[default]
    Succeed,
    Revert,
    Timeout,
    /// Broadcast, then the receipt fetch fails.
    ReceiptError,
}

#[derive(Default)]
struct State {
    native: U256,
    tokens: HashMap<Address, U256>,
    next_swap: Option<SwapEffect>,
    swap_mode: SwapMode,
    sent: Vec<TxRequest>,
}

/// In-memory chain: balances, scripted swaps and a record of sent transactions.
///
/// Transactions to a registered router are swaps; transactions to the WETH
/// address are deposits; everything else (approvals) just succeeds.
#[derive(Clone)]
pub struct MockChain {
    wallet: Address,
    weth: Address,
    routers: Arc<HashSet<Address>>,
    state: Arc<Mutex<State>>,
}

impl MockChain {
    pub fn new(weth: Address, routers: impl IntoIterator<Item = Address>) -> Self {
        Self {
            wallet: Address::repeat_byte(0xaa),
            weth,
            routers: Arc::new(routers.into_iter().collect()),
            state: Arc::default(),
        }
    }

    pub fn set_native(&self, balance: U256) {
        self.state.lock().native = balance;
    }

    pub fn set_token(&self, token: Address, balance: U256) {
        self.state.lock().tokens.insert(token, balance);
    }

    pub fn token(&self, token: Address) -> U256 {
        self.state.lock().tokens.get(&token).copied().unwrap_or_default()
    }

    pub fn native(&self) -> U256 {
        self.state.lock().native
    }

    pub fn script_swap(&self, effect: SwapEffect) {
        self.state.lock().next_swap = Some(effect);
    }

    pub fn set_swap_mode(&self, mode: SwapMode) {
        self.state.lock().swap_mode = mode;
    }

    pub fn sent(&self) -> Vec<TxRequest> {
        self.state.lock().sent.clone()
    }
}

#[async_trait]
impl ChainClient for MockChain {
    fn wallet(&self) -> Address {
        self.wallet
    }

    fn chain_id(&self) -> u64 {
        8453
    }

    async fn native_balance(&self, _owner: Address) -> Result<U256> {
        Ok(self.native())
    }

    async fn token_balance(&self, token: Address, _owner: Address) -> Result<U256> {
        Ok(self.token(token))
    }

    async fn call(&self, _to: Address, _data: Bytes) -> Result<Bytes> {
        Ok(Bytes::new())
    }

    async fn estimate_fees(&self) -> Result<GasFees> {
        Ok(GasFees {
            base_fee: 1_000_000,
            priority_fee: 1_000,
        })
    }

    async fn estimate_gas(&self, _tx: &TxRequest) -> Result<u64> {
        Ok(46_000)
    }

    async fn send_transaction(&self, tx: TxRequest) -> Result<TxReceipt> {
        let mut state = self.state.lock();
        state.sent.push(tx.clone());
        let tx_hash = B256::with_last_byte(u8::try_from(state.sent.len()).unwrap_or(u8::MAX));
        let mut success = true;

        if self.routers.contains(&tx.to) {
            match state.swap_mode {
                SwapMode::Timeout => {
                    return Err(ChainError::Timeout {
                        tx_hash: tx_hash.to_string(),
                    }
                    .into());
                }
                SwapMode::ReceiptError => {
                    return Err(ChainError::Receipt {
                        tx_hash: tx_hash.to_string(),
                        reason: "connection reset by peer".to_string(),
                    }
                    .into());
                }
                SwapMode::Revert => success = false,
                SwapMode::Succeed => {
                    if let Some(effect) = state.next_swap.take() {
                        let (token, amount) = effect.debit;
                        let balance = state.tokens.entry(token).or_default();
                        *balance = balance.saturating_sub(amount);
                        let (token, amount) = effect.credit;
                        let balance = state.tokens.entry(token).or_default();
                        *balance = balance.saturating_add(amount);
                    }
                }
            }
        } else if tx.to == self.weth && !tx.value.is_zero() {
            state.native = state.native.saturating_sub(tx.value);
            let weth = self.weth;
            let balance = state.tokens.entry(weth).or_default();
            *balance = balance.saturating_add(tx.value);
        }

        Ok(TxReceipt {
            tx_hash,
            block_number: Some(100 + state.sent.len() as u64),
            success,
        })
    }

    fn sign_hash(&self, _hash: B256) -> Result<Bytes> {
        Ok(Bytes::from(vec![0u8; 65]))
    }
}
