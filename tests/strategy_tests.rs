//! Strategy workers evaluating pairs against stored quotes and positions.
//!
//! Sells requested by a strategy are resolved by a trade dispatcher running
//! a scripted handler, so these tests never touch the chain.

mod harness;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dexbot::application::dispatcher::JobHandler;
use dexbot::application::strategy::{PairWorker, WorkerStep};
use dexbot::domain::job::{job_type, Event, Job, JobStatus, Queue};
use dexbot::domain::settlement::Settlement;
use dexbot::domain::strategy::{PrudentPumpState, StrategyKind, StrategyState};
use dexbot::error::{Result, TradeError};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use harness::fixtures::{ether, units, World, PAIR};

/// Completes or fails every trade job it is handed, after `delay`.
struct Resolver {
    succeed: bool,
    delay: Duration,
}

#[async_trait]
impl JobHandler for Resolver {
    async fn handle(&self, _job: &Job, _event: &Event) -> Result<Settlement> {
        tokio::time::sleep(self.delay).await;
        if self.succeed {
            Ok(Settlement::default())
        } else {
            Err(TradeError::execution("Sell order has failed! Swap transaction reverted").into())
        }
    }
}

struct Running {
    stop: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl Running {
    async fn stop(self) {
        let _ = self.stop.send(true);
        let _ = self.task.await;
    }
}

fn spawn_resolver(world: &World, succeed: bool) -> Running {
    spawn_slow_resolver(world, succeed, Duration::ZERO)
}

fn spawn_slow_resolver(world: &World, succeed: bool, delay: Duration) -> Running {
    let dispatcher = world.dispatcher(Queue::Trade, Arc::new(Resolver { succeed, delay }));
    let (stop, rx) = watch::channel(false);
    let task = tokio::spawn(async move { dispatcher.run(rx).await });
    Running { stop, task }
}

fn worker(world: &World, sell_wait: Duration) -> PairWorker {
    PairWorker::new(
        PAIR,
        world.strategy_services(sell_wait),
        Duration::from_millis(10),
    )
}

fn sell_jobs(world: &World) -> Vec<Job> {
    world
        .jobs
        .list(Queue::Trade)
        .unwrap()
        .into_iter()
        .filter(|job| job.job_type == job_type::SELL)
        .collect()
}

fn slippage(job: &Job) -> Decimal {
    job.payload["slippage"].as_str().unwrap().parse().unwrap()
}

/// Plain-text operator notices, oldest first.
fn text_notices(world: &World) -> Vec<String> {
    world
        .jobs
        .list(Queue::Chat)
        .unwrap()
        .into_iter()
        .filter(|job| job.payload["message_type"] == "text")
        .map(|job| job.payload["message"].as_str().unwrap().to_string())
        .collect()
}

/// 0.001 WETH paid for 100 TKN.
fn holding(world: &World) {
    world.open_position(units(1, 15), ether(100));
}

// ---------------------------------------------------------------------------
// Worker lifecycle
// ---------------------------------------------------------------------------

#[tokio::test]
async fn worker_stops_when_strategy_cleared() {
    let world = World::new("worker-cleared");
    let (_tx, mut cancel) = watch::channel(false);

    let step = worker(&world, Duration::from_secs(1))
        .step(&mut cancel)
        .await
        .unwrap();
    assert_eq!(step, WorkerStep::StrategyCleared);
}

#[tokio::test]
async fn worker_stops_when_pair_deleted() {
    let world = World::new("worker-deleted");
    world.set_strategy(Some("stop_loss"));
    world.ledger.delete_pair(&PAIR).unwrap();
    let (_tx, mut cancel) = watch::channel(false);

    let step = worker(&world, Duration::from_secs(1))
        .step(&mut cancel)
        .await
        .unwrap();
    assert_eq!(step, WorkerStep::PairDeleted);
}

#[tokio::test]
async fn worker_stops_on_unknown_strategy() {
    let world = World::new("worker-unknown");
    world.set_strategy(Some("martingale"));
    let (_tx, mut cancel) = watch::channel(false);

    let step = worker(&world, Duration::from_secs(1))
        .step(&mut cancel)
        .await
        .unwrap();
    assert_eq!(step, WorkerStep::UnknownStrategy);
}

#[tokio::test]
async fn worker_without_position_only_persists_state() {
    let world = World::new("worker-idle");
    world.set_strategy(Some("prudent_pump"));
    world.store_quote(units(1, 13));
    let (_tx, mut cancel) = watch::channel(false);

    let step = worker(&world, Duration::from_secs(1))
        .step(&mut cancel)
        .await
        .unwrap();

    assert_eq!(step, WorkerStep::Continue);
    assert!(sell_jobs(&world).is_empty());
    let services = world.strategy_services(Duration::from_secs(1));
    assert_eq!(
        services.states.load(&PAIR, StrategyKind::PrudentPump).unwrap(),
        Some(StrategyState::PrudentPump(PrudentPumpState::default()))
    );
}

#[tokio::test]
async fn run_exits_on_cancel() {
    let world = World::new("worker-cancel");
    world.set_strategy(Some("stop_loss"));
    let (tx, rx) = watch::channel(false);
    let task = tokio::spawn(worker(&world, Duration::from_secs(1)).run(rx));

    tokio::time::sleep(Duration::from_millis(30)).await;
    tx.send(true).unwrap();
    tokio::time::timeout(Duration::from_secs(5), task)
        .await
        .expect("worker stops")
        .unwrap();
}

// ---------------------------------------------------------------------------
// Stop loss
// ---------------------------------------------------------------------------

#[tokio::test]
async fn stop_loss_sells_whole_holding_below_threshold() {
    let world = World::new("stop-loss-sell");
    world.set_strategy(Some("stop_loss"));
    holding(&world);
    // 100 TKN at 0.000007 WETH: -30%.
    world.store_quote(units(7, 12));
    let resolver = spawn_resolver(&world, true);
    let (_tx, mut cancel) = watch::channel(false);

    let step = worker(&world, Duration::from_secs(5))
        .step(&mut cancel)
        .await
        .unwrap();
    resolver.stop().await;

    assert_eq!(step, WorkerStep::Continue);
    let sells = sell_jobs(&world);
    assert_eq!(sells.len(), 1);
    assert_eq!(sells[0].status, JobStatus::Completed);
    assert_eq!(sells[0].payload["value"], ether(100).to_string());
    assert!(sells[0].expire_at.is_some());
}

#[tokio::test]
async fn stop_loss_holds_above_threshold() {
    let world = World::new("stop-loss-hold");
    world.set_strategy(Some("stop_loss"));
    holding(&world);
    // -10%.
    world.store_quote(units(9, 12));
    let (_tx, mut cancel) = watch::channel(false);

    worker(&world, Duration::from_secs(1))
        .step(&mut cancel)
        .await
        .unwrap();

    assert!(sell_jobs(&world).is_empty());
}

#[tokio::test]
async fn unanswered_sell_expires_at_the_deadline() {
    let world = World::new("stop-loss-timeout");
    world.set_strategy(Some("stop_loss"));
    holding(&world);
    world.store_quote(units(7, 12));
    let (_tx, mut cancel) = watch::channel(false);

    let step = worker(&world, Duration::from_millis(150))
        .step(&mut cancel)
        .await
        .unwrap();

    assert_eq!(step, WorkerStep::Continue);
    let sells = sell_jobs(&world);
    assert_eq!(sells.len(), 1);
    assert_eq!(sells[0].status, JobStatus::Expired);

    // A dispatcher arriving late finds nothing to run.
    let late = world.dispatcher(
        Queue::Trade,
        Arc::new(Resolver {
            succeed: true,
            delay: Duration::ZERO,
        }),
    );
    assert_eq!(late.run_once().await.unwrap(), None);
}

// ---------------------------------------------------------------------------
// Prudent pump
// ---------------------------------------------------------------------------

#[tokio::test]
async fn prudent_pump_takes_profit_and_disables() {
    let world = World::new("pump-profit");
    world.set_strategy(Some("prudent_pump"));
    holding(&world);
    // +60%.
    world.store_quote(units(16, 12));
    let resolver = spawn_resolver(&world, true);
    let (_tx, mut cancel) = watch::channel(false);
    let services = world.strategy_services(Duration::from_secs(5));

    PairWorker::new(PAIR, services.clone(), Duration::from_millis(10))
        .step(&mut cancel)
        .await
        .unwrap();
    resolver.stop().await;

    let sells = sell_jobs(&world);
    assert_eq!(sells.len(), 1);
    assert_eq!(slippage(&sells[0]), dec!(0.1));
    assert_eq!(
        services.states.load(&PAIR, StrategyKind::PrudentPump).unwrap(),
        Some(StrategyState::PrudentPump(PrudentPumpState {
            disabled: true,
            ..PrudentPumpState::default()
        }))
    );
    assert_eq!(text_notices(&world), ["Profit target met for TKN, selling"]);
    // The strategy itself stays assigned; only its state is disabled.
    assert_eq!(
        world.ledger.get_pair(&PAIR).unwrap().unwrap().strategy.as_deref(),
        Some("prudent_pump")
    );
}

#[tokio::test]
async fn slow_sell_in_flight_at_the_deadline_is_waited_out() {
    let world = World::new("pump-slow-sell");
    world.set_strategy(Some("prudent_pump"));
    holding(&world);
    world.store_quote(units(16, 12));
    // Picked up at once, but executes past the wait.
    let resolver = spawn_slow_resolver(&world, true, Duration::from_millis(700));
    let (_tx, mut cancel) = watch::channel(false);
    let services = world.strategy_services(Duration::from_millis(500));

    PairWorker::new(PAIR, services.clone(), Duration::from_millis(10))
        .step(&mut cancel)
        .await
        .unwrap();
    resolver.stop().await;

    let sells = sell_jobs(&world);
    assert_eq!(sells.len(), 1);
    assert_eq!(sells[0].status, JobStatus::Completed);
    assert_eq!(
        services.states.load(&PAIR, StrategyKind::PrudentPump).unwrap(),
        Some(StrategyState::PrudentPump(PrudentPumpState {
            disabled: true,
            ..PrudentPumpState::default()
        }))
    );
    assert_eq!(
        world.ledger.get_pair(&PAIR).unwrap().unwrap().strategy.as_deref(),
        Some("prudent_pump")
    );
}

#[tokio::test]
async fn prudent_pump_tracks_peak_without_selling() {
    let world = World::new("pump-peak");
    world.set_strategy(Some("prudent_pump"));
    holding(&world);
    // +20%: above the arm level, below take-profit.
    world.store_quote(units(12, 12));
    let (_tx, mut cancel) = watch::channel(false);
    let services = world.strategy_services(Duration::from_secs(1));

    PairWorker::new(PAIR, services.clone(), Duration::from_millis(10))
        .step(&mut cancel)
        .await
        .unwrap();

    assert!(sell_jobs(&world).is_empty());
    let Some(StrategyState::PrudentPump(state)) =
        services.states.load(&PAIR, StrategyKind::PrudentPump).unwrap()
    else {
        panic!("prudent pump state saved");
    };
    assert_eq!(state.highest_profit, dec!(20));
    assert!(!state.disabled);
}

#[tokio::test]
async fn prudent_pump_gives_up_after_three_attempts() {
    let world = World::new("pump-exhausted");
    world.set_strategy(Some("prudent_pump"));
    holding(&world);
    world.store_quote(units(16, 12));
    let resolver = spawn_resolver(&world, false);
    let (_tx, mut cancel) = watch::channel(false);
    let services = world.strategy_services(Duration::from_secs(5));

    PairWorker::new(PAIR, services.clone(), Duration::from_millis(10))
        .step(&mut cancel)
        .await
        .unwrap();
    resolver.stop().await;

    let sells = sell_jobs(&world);
    assert_eq!(sells.len(), 3);
    assert!(sells.iter().all(|job| job.status == JobStatus::Failed));
    let slippages: Vec<Decimal> = sells.iter().map(slippage).collect();
    assert_eq!(slippages, [dec!(0.1), dec!(0.15), dec!(0.2)]);

    assert_eq!(
        world.ledger.get_pair(&PAIR).unwrap().unwrap().strategy,
        None
    );
    let Some(StrategyState::PrudentPump(state)) =
        services.states.load(&PAIR, StrategyKind::PrudentPump).unwrap()
    else {
        panic!("prudent pump state saved");
    };
    assert!(state.disabled);
    assert_eq!(state.retry_count, 3);

    assert_eq!(
        text_notices(&world),
        [
            "Profit target met for TKN, selling".to_string(),
            "Sell retry 2/3 for TKN".to_string(),
            "Sell retry 3/3 for TKN".to_string(),
            format!(
                "Prudent pump could not sell TKN on pair {PAIR} after 3 attempts, strategy disabled"
            ),
        ]
    );
}

#[tokio::test]
async fn disabled_prudent_pump_does_nothing() {
    let world = World::new("pump-disabled");
    world.set_strategy(Some("prudent_pump"));
    holding(&world);
    world.store_quote(units(16, 12));
    let services = world.strategy_services(Duration::from_secs(1));
    services
        .states
        .save(
            &PAIR,
            &StrategyState::PrudentPump(PrudentPumpState {
                disabled: true,
                ..PrudentPumpState::default()
            }),
        )
        .unwrap();
    let (_tx, mut cancel) = watch::channel(false);

    PairWorker::new(PAIR, services, Duration::from_millis(10))
        .step(&mut cancel)
        .await
        .unwrap();

    assert!(sell_jobs(&world).is_empty());
}
