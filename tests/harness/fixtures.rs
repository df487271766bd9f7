use std::sync::Arc;
use std::time::Duration;

use alloy_primitives::{address, Address, U256};
use chrono::Utc;
use dexbot::adapter::outbound::sqlite::{
    SqliteJobQueue, SqliteLedger, SqliteSettingsStore, SqliteStrategyStateStore,
    SqliteTransactionLog,
};
use dexbot::app::config::{ChainConfig, ContractsConfig};
use dexbot::application::dispatcher::{Dispatcher, JobHandler};
use dexbot::application::handler::EventHandlers;
use dexbot::application::settings::TradeSettings;
use dexbot::application::strategy::StrategyServices;
use dexbot::application::trade::TradeExecutor;
use dexbot::domain::job::{NewJob, Queue};
use dexbot::domain::money::pow10;
use dexbot::domain::pair::{DexId, Pair, PairQuote, Token, NATIVE_TOKEN};
use dexbot::domain::position::Position;
use rust_decimal::Decimal;
use serde_json::json;

use super::mock_chain::MockChain;
use super::quotes::FixedQuotes;
use super::temp_db::TempDb;

pub const PAIR: Address = address!("5000000000000000000000000000000000000050");
pub const TOKEN: Address = address!("7000000000000000000000000000000000000070");

/// `n × 10^18`.
pub fn ether(n: u64) -> U256 {
    U256::from(n) * pow10(18)
}

/// `n × 10^exp`.
pub fn units(n: u64, exp: u32) -> U256 {
    U256::from(n) * pow10(exp)
}

pub fn token(address: Address, symbol: &str, balance: U256) -> Token {
    Token {
        address,
        symbol: symbol.to_string(),
        name: symbol.to_string(),
        decimals: 18,
        balance,
        latest_price_usd: None,
    }
}

/// A database with ETH, WETH and TKN, one SushiSwap TKN/WETH pair, and a
/// mock chain holding 1 ETH and 0.01 WETH.
pub struct World {
    pub db: TempDb,
    pub chain: MockChain,
    pub quotes: FixedQuotes,
    pub ledger: SqliteLedger,
    pub jobs: SqliteJobQueue,
    pub settings: Arc<TradeSettings>,
    pub contracts: ContractsConfig,
}

impl World {
    pub fn new(name: &str) -> Self {
        let db = TempDb::create(name);
        let contracts = ContractsConfig::default();
        let chain = MockChain::new(
            contracts.weth,
            [
                contracts.sushiswap_router,
                contracts.aerodrome_router,
                contracts.universal_router,
            ],
        );
        chain.set_native(ether(1));
        chain.set_token(contracts.weth, units(1, 16));

        let ledger = SqliteLedger::new(db.pool());
        ledger
            .upsert_token(&token(NATIVE_TOKEN, "ETH", ether(1)))
            .unwrap();
        ledger
            .upsert_token(&token(contracts.weth, "WETH", units(1, 16)))
            .unwrap();
        ledger.upsert_token(&token(TOKEN, "TKN", U256::ZERO)).unwrap();
        ledger
            .upsert_pair(&Pair {
                address: PAIR,
                base_address: TOKEN,
                quote_address: contracts.weth,
                dex: DexId::new("sushiswap", "v2"),
                chain: "base".into(),
                strategy: None,
                message_id: None,
            })
            .unwrap();

        Self {
            jobs: SqliteJobQueue::new(db.pool()),
            settings: Arc::new(TradeSettings::new(SqliteSettingsStore::new(db.pool()))),
            quotes: FixedQuotes::new(),
            ledger,
            chain,
            contracts,
            db,
        }
    }

    pub fn weth(&self) -> Address {
        self.contracts.weth
    }

    pub fn handlers(&self) -> EventHandlers {
        let chain = Arc::new(self.chain.clone());
        let executor = TradeExecutor::new(
            chain.clone(),
            SqliteTransactionLog::new(self.db.pool()),
            self.contracts.clone(),
        );
        EventHandlers::new(
            self.ledger.clone(),
            self.settings.clone(),
            chain,
            Arc::new(self.quotes.clone()),
            executor,
            ChainConfig::default(),
            self.contracts.weth,
        )
    }

    pub fn dispatcher(&self, queue: Queue, handler: Arc<dyn JobHandler>) -> Dispatcher {
        Dispatcher::new(queue, self.jobs.clone(), handler, Duration::from_millis(10))
    }

    pub fn trade_dispatcher(&self) -> Dispatcher {
        self.dispatcher(Queue::Trade, Arc::new(self.handlers()))
    }

    pub fn strategy_services(&self, sell_wait: Duration) -> Arc<StrategyServices> {
        Arc::new(StrategyServices {
            ledger: self.ledger.clone(),
            jobs: self.jobs.clone(),
            states: SqliteStrategyStateStore::new(self.db.pool()),
            settings: self.settings.clone(),
            sell_wait,
        })
    }

    pub fn enqueue(&self, job_type: &str, payload: serde_json::Value) -> i64 {
        self.jobs
            .enqueue(&NewJob::new(Queue::Trade, job_type, payload))
            .unwrap()
    }

    pub fn enqueue_buy(&self, value: U256) -> i64 {
        self.enqueue(
            "buy",
            json!({"pair": PAIR.to_string(), "value": value.to_string()}),
        )
    }

    pub fn enqueue_sell(&self, value: U256) -> i64 {
        self.enqueue(
            "sell",
            json!({"pair": PAIR.to_string(), "value": value.to_string()}),
        )
    }

    pub fn set_strategy(&self, strategy: Option<&str>) {
        self.ledger.set_pair_strategy(&PAIR, strategy).unwrap();
    }

    /// Stores a position with the given cost basis and a matching stored
    /// TKN balance.
    pub fn open_position(&self, book_value: U256, bought: U256) {
        let now = Utc::now();
        let mut position = Position::open(PAIR, now);
        position.record_buy(book_value, bought, now);
        self.ledger.save_position(&position).unwrap();
        self.ledger.set_token_balance(&TOKEN, bought).unwrap();
        self.chain.set_token(TOKEN, bought);
    }

    /// Stores a quote with `price` WETH units per whole TKN.
    pub fn store_quote(&self, price: U256) {
        let quote = PairQuote::new(
            PAIR,
            price,
            json!({"price": price.to_string(), "at": Utc::now().to_rfc3339()}),
            Utc::now(),
        )
        .unwrap();
        self.ledger.insert_quote(&quote).unwrap();
    }

    pub fn set_market_price(&self, price_native: Decimal) {
        self.quotes.set_price(PAIR, price_native);
    }
}
