//! Runtime wiring: builds the stores and adapters, then runs every loop
//! until shutdown.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinSet;
use tracing::{error, info};

use crate::adapter::outbound::coinbase::CoinbaseClient;
use crate::adapter::outbound::dexscreener::DexScreenerClient;
use crate::adapter::outbound::evm::AlloyChainClient;
use crate::adapter::outbound::notifier::{LogNotifier, NotifierRegistry};
use crate::adapter::outbound::sqlite::{
    create_pool, run_migrations, DbPool, SqliteJobQueue, SqliteLedger, SqliteSettingsStore,
    SqliteStrategyStateStore, SqliteTransactionLog,
};
use crate::app::config::Config;
use crate::application::chat::ChatRelay;
use crate::application::dispatcher::Dispatcher;
use crate::application::ether_price::EtherPriceUpdater;
use crate::application::handler::EventHandlers;
use crate::application::quotes::QuoteIngestor;
use crate::application::settings::TradeSettings;
use crate::application::strategy::{StrategyScheduler, StrategyServices};
use crate::application::trade::TradeExecutor;
use crate::domain::job::Queue;
use crate::error::Result;
use crate::port::outbound::chain::ChainClient;
use crate::port::outbound::market::{QuoteSource, UsdPriceSource};
use crate::port::outbound::notifier::Notifier;

/// The assembled engine.
pub struct App {
    trade: Dispatcher,
    chat: Dispatcher,
    scheduler: StrategyScheduler,
    ingestor: QuoteIngestor,
    ether_price: EtherPriceUpdater,
}

impl App {
    /// Opens the database, connects the chain client and builds every loop.
    ///
    /// # Errors
    /// Fails on an unreachable database, a failed migration or an invalid
    /// wallet key or RPC URL.
    pub fn build(config: &Config) -> Result<Self> {
        let pool = create_pool(&config.database.url)?;
        run_migrations(&pool)?;
        info!(database = %config.database.url, "Database ready");

        let chain: Arc<dyn ChainClient> = Arc::new(AlloyChainClient::new(
            &config.chain.rpc_url,
            config.chain.private_key.as_deref().unwrap_or_default(),
            config.chain.chain_id,
            config.chain.receipt_timeout(),
        )?);
        let quotes: Arc<dyn QuoteSource> = Arc::new(DexScreenerClient::from_config(
            &config.market_data,
            &config.chain.name,
        ));
        let usd_prices: Arc<dyn UsdPriceSource> =
            Arc::new(CoinbaseClient::from_config(&config.market_data));

        Ok(Self::assemble(
            config,
            pool,
            chain,
            quotes,
            usd_prices,
            build_notifier(),
        ))
    }

    /// Builds the engine on top of already-constructed collaborators.
    pub fn assemble(
        config: &Config,
        pool: DbPool,
        chain: Arc<dyn ChainClient>,
        quotes: Arc<dyn QuoteSource>,
        usd_prices: Arc<dyn UsdPriceSource>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let ledger = SqliteLedger::new(pool.clone());
        let jobs = SqliteJobQueue::new(pool.clone());
        let settings = Arc::new(TradeSettings::new(SqliteSettingsStore::new(pool.clone())));

        let executor = TradeExecutor::new(
            chain.clone(),
            SqliteTransactionLog::new(pool.clone()),
            config.contracts.clone(),
        );
        let handlers = EventHandlers::new(
            ledger.clone(),
            settings.clone(),
            chain,
            quotes.clone(),
            executor,
            config.chain.clone(),
            config.contracts.weth,
        );

        let trade = Dispatcher::new(
            Queue::Trade,
            jobs.clone(),
            Arc::new(handlers),
            config.intervals.trade_poll(),
        );
        let chat = Dispatcher::new(
            Queue::Chat,
            jobs.clone(),
            Arc::new(ChatRelay::new(notifier)),
            config.intervals.chat_poll(),
        );

        let services = Arc::new(StrategyServices {
            ledger: ledger.clone(),
            jobs: jobs.clone(),
            states: SqliteStrategyStateStore::new(pool),
            settings,
            sell_wait: config.strategy.sell_wait_timeout(),
        });
        let scheduler = StrategyScheduler::new(
            services,
            config.intervals.scheduler(),
            config.intervals.worker(),
        );
        let ether_price = EtherPriceUpdater::new(
            ledger.clone(),
            usd_prices,
            config.contracts.weth,
            config.intervals.ether_price(),
        );
        let ingestor = QuoteIngestor::new(
            ledger,
            jobs,
            quotes,
            config.market_data.clone(),
            config.intervals.quote_ingest(),
        );

        Self {
            trade,
            chat,
            scheduler,
            ingestor,
            ether_price,
        }
    }

    /// Runs every loop until `shutdown` turns true, then waits for them to
    /// stop.
    pub async fn run(self, shutdown: watch::Receiver<bool>) {
        let Self {
            trade,
            chat,
            scheduler,
            ingestor,
            ether_price,
        } = self;

        let mut tasks = JoinSet::new();
        let rx = shutdown.clone();
        tasks.spawn(async move { trade.run(rx).await });
        let rx = shutdown.clone();
        tasks.spawn(async move { chat.run(rx).await });
        let rx = shutdown.clone();
        tasks.spawn(async move { ingestor.run(rx).await });
        let rx = shutdown.clone();
        tasks.spawn(async move { ether_price.run(rx).await });
        tasks.spawn(scheduler.run(shutdown));
        info!(tasks = tasks.len(), "Engine running");

        while let Some(result) = tasks.join_next().await {
            if let Err(err) = result {
                error!(error = %err, "Engine task panicked");
            }
        }
        info!("Engine stopped");
    }
}

fn build_notifier() -> Arc<dyn Notifier> {
    let mut registry = NotifierRegistry::new();
    registry.register(Box::new(LogNotifier));
    info!(notifiers = registry.len(), "Notifiers initialized");
    Arc::new(registry)
}
