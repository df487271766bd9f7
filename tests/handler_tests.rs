//! Event handlers driven through the trade dispatcher against a mock chain.

mod harness;

use alloy_primitives::{Address, B256, I256, U256};
use chrono::{Duration, Utc};
use dexbot::adapter::outbound::sqlite::SqliteTransactionLog;
use dexbot::application::dispatcher::JobOutcome;
use dexbot::domain::job::{Job, JobStatus, NewJob, Queue};
use dexbot::domain::pair::{DexId, Pair, NATIVE_TOKEN};
use rust_decimal_macros::dec;
use serde_json::json;

use harness::fixtures::{ether, units, World, PAIR, TOKEN};
use harness::mock_chain::{SwapEffect, SwapMode};

fn job(world: &World, id: i64) -> Job {
    world.jobs.get(id).unwrap().expect("job exists")
}

fn chat_jobs(world: &World) -> Vec<Job> {
    world.jobs.list(Queue::Chat).unwrap()
}

fn exception(job: &Job) -> String {
    job.execution_data.as_ref().unwrap()["exception"]
        .as_str()
        .unwrap()
        .to_string()
}

fn kind(job: &Job) -> String {
    job.execution_data.as_ref().unwrap()["kind"]
        .as_str()
        .unwrap()
        .to_string()
}

/// Buys 100 TKN for 0.001 WETH at a price of 0.00001 WETH per TKN.
async fn buy_100_tokens(world: &World) -> i64 {
    world.set_market_price(dec!(0.00001));
    world.chain.script_swap(SwapEffect {
        debit: (world.weth(), units(1, 15)),
        credit: (TOKEN, ether(100)),
    });
    let id = world.enqueue_buy(units(1, 15));
    let outcome = world.trade_dispatcher().run_once().await.unwrap();
    assert_eq!(outcome, Some(JobOutcome::Completed(id)));
    id
}

// ---------------------------------------------------------------------------
// Buy
// ---------------------------------------------------------------------------

#[tokio::test]
async fn buy_opens_position_from_observed_deltas() {
    let world = World::new("buy-opens");
    buy_100_tokens(&world).await;

    let position = world.ledger.get_position(&PAIR).unwrap().unwrap();
    assert_eq!(position.book_value, units(1, 15));
    assert_eq!(position.token_bought, ether(100));
    assert_eq!(position.token_sold, U256::ZERO);

    let tkn = world.ledger.get_token(&TOKEN).unwrap().unwrap();
    let weth = world.ledger.get_token(&world.weth()).unwrap().unwrap();
    assert_eq!(tkn.balance, ether(100));
    assert_eq!(weth.balance, units(9, 15));
}

#[tokio::test]
async fn buy_approves_then_swaps_with_slippage_floor() {
    let world = World::new("buy-txs");
    buy_100_tokens(&world).await;

    let sent = world.chain.sent();
    assert_eq!(sent.len(), 2);
    assert_eq!(sent[0].to, world.weth(), "approval goes to the quote token");
    assert_eq!(sent[1].to, world.contracts.sushiswap_router);
    assert_eq!(sent[1].gas_limit, Some(250_000));
    assert_eq!(sent[0].gas_limit, Some(56_000));

    let log = SqliteTransactionLog::new(world.db.pool());
    let swap = log
        .get(&B256::with_last_byte(2).to_string())
        .unwrap()
        .expect("swap recorded");
    assert_eq!(swap.status.as_deref(), Some("success"));
    assert!(swap.params.unwrap().get("data").is_none());
}

#[tokio::test]
async fn buy_notifies_with_explorer_link() {
    let world = World::new("buy-chat");
    let id = buy_100_tokens(&world).await;

    let chats = chat_jobs(&world);
    assert_eq!(chats.len(), 1);
    let payload = &chats[0].payload;
    assert_eq!(payload["title"], "Buy TKN transaction");
    assert_eq!(payload["message"], "Bought 100 TKN");
    let swap_hash = B256::with_last_byte(2).to_string();
    assert_eq!(
        payload["url"],
        format!("https://basescan.org/tx/{swap_hash}")
    );
    let event_field = payload["fields"]
        .as_array()
        .unwrap()
        .iter()
        .find(|f| f["name"] == "Event Id")
        .unwrap();
    assert_eq!(event_field["value"], id.to_string());
}

#[tokio::test]
async fn buy_rejects_unknown_pair() {
    let world = World::new("buy-unknown-pair");
    let id = world.enqueue(
        "buy",
        json!({"pair": Address::repeat_byte(0x99).to_string(), "value": "1000"}),
    );

    let outcome = world.trade_dispatcher().run_once().await.unwrap();
    assert_eq!(outcome, Some(JobOutcome::Failed(id)));

    let failed = job(&world, id);
    assert_eq!(failed.status, JobStatus::Failed);
    assert_eq!(kind(&failed), "business_rule");
    assert!(exception(&failed).contains("doesn't exist"));
    assert!(world.chain.sent().is_empty());

    let chats = chat_jobs(&world);
    assert_eq!(chats.len(), 1);
    assert_eq!(chats[0].payload["message_type"], "error");
    assert_eq!(chats[0].payload["source_event_id"], id);
}

#[tokio::test]
async fn buy_rejects_amount_above_balance() {
    let world = World::new("buy-low-balance");
    world.set_market_price(dec!(0.00001));
    let id = world.enqueue_buy(units(1, 17));

    world.trade_dispatcher().run_once().await.unwrap();

    let failed = job(&world, id);
    assert!(exception(&failed).starts_with("Balance too low for WETH"));
    assert!(world.chain.sent().is_empty());
}

#[tokio::test]
async fn buy_requires_gas_money() {
    let world = World::new("buy-no-gas");
    world.set_market_price(dec!(0.00001));
    world.chain.set_native(U256::ZERO);
    let id = world.enqueue_buy(units(1, 15));

    world.trade_dispatcher().run_once().await.unwrap();

    assert_eq!(
        exception(&job(&world, id)),
        "Balance of ETH under minimum requirement"
    );
}

#[tokio::test]
async fn buy_rejects_unsupported_dex() {
    let world = World::new("buy-dex");
    world
        .ledger
        .upsert_pair(&Pair {
            address: PAIR,
            base_address: TOKEN,
            quote_address: world.weth(),
            dex: DexId::new("pancakeswap", "v2"),
            chain: "base".into(),
            strategy: None,
            message_id: None,
        })
        .unwrap();
    let id = world.enqueue_buy(units(1, 15));

    world.trade_dispatcher().run_once().await.unwrap();

    assert_eq!(
        exception(&job(&world, id)),
        "Dex pancakeswap:v2 isn't supported"
    );
}

#[tokio::test]
async fn reverted_swap_leaves_ledger_untouched() {
    let world = World::new("buy-revert");
    world.set_market_price(dec!(0.00001));
    world.chain.set_swap_mode(SwapMode::Revert);
    let id = world.enqueue_buy(units(1, 15));

    world.trade_dispatcher().run_once().await.unwrap();

    let failed = job(&world, id);
    assert_eq!(kind(&failed), "execution");
    assert_eq!(
        exception(&failed),
        "Buy order has failed! Swap transaction reverted"
    );
    let data = failed.execution_data.unwrap();
    assert!(data["transaction_hashes"]["approve"].is_string());
    assert!(data["transaction_hashes"]["swap"].is_string());
    assert_eq!(data["trade_information"]["event_id"], id);
    assert_eq!(data["trade_information"]["trade_handler"], "sushiswap");

    assert!(world.ledger.get_position(&PAIR).unwrap().is_none());
    let weth = world.ledger.get_token(&world.weth()).unwrap().unwrap();
    assert_eq!(weth.balance, units(1, 16));
}

#[tokio::test]
async fn swap_without_balance_change_fails() {
    let world = World::new("buy-no-delta");
    world.set_market_price(dec!(0.00001));
    let id = world.enqueue_buy(units(1, 15));

    world.trade_dispatcher().run_once().await.unwrap();

    let failed = job(&world, id);
    assert_eq!(exception(&failed), "Trade has failed");
    assert!(world.ledger.get_position(&PAIR).unwrap().is_none());
}

#[tokio::test]
async fn swap_receipt_timeout_is_recorded() {
    let world = World::new("buy-timeout");
    world.set_market_price(dec!(0.00001));
    world.chain.set_swap_mode(SwapMode::Timeout);
    let id = world.enqueue_buy(units(1, 15));

    world.trade_dispatcher().run_once().await.unwrap();

    let failed = job(&world, id);
    assert_eq!(kind(&failed), "timeout");

    let log = SqliteTransactionLog::new(world.db.pool());
    let swap = log
        .get(&B256::with_last_byte(2).to_string())
        .unwrap()
        .expect("timed out swap recorded");
    assert_eq!(swap.status.as_deref(), Some("timeout"));
}

#[tokio::test]
async fn swap_with_lost_receipt_is_still_recorded() {
    let world = World::new("buy-receipt-error");
    world.set_market_price(dec!(0.00001));
    world.chain.set_swap_mode(SwapMode::ReceiptError);
    let id = world.enqueue_buy(units(1, 15));

    world.trade_dispatcher().run_once().await.unwrap();

    let failed = job(&world, id);
    assert_eq!(failed.status, JobStatus::Failed);
    assert_eq!(kind(&failed), "execution");
    let swap_hash = B256::with_last_byte(2).to_string();
    let data = failed.execution_data.as_ref().unwrap();
    assert_eq!(data["transaction_hashes"]["swap"], swap_hash.as_str());
    assert_eq!(
        data["transaction_hashes"]["approve"],
        B256::with_last_byte(1).to_string().as_str()
    );

    let log = SqliteTransactionLog::new(world.db.pool());
    let swap = log.get(&swap_hash).unwrap().expect("swap recorded");
    assert_eq!(swap.status.as_deref(), Some("error"));
    assert!(world.ledger.get_position(&PAIR).unwrap().is_none());
}

#[tokio::test]
async fn expired_job_never_reaches_the_handler() {
    let world = World::new("expired");
    world.set_market_price(dec!(0.00001));
    let id = world
        .jobs
        .enqueue(
            &NewJob::new(
                Queue::Trade,
                "buy",
                json!({"pair": PAIR.to_string(), "value": "1000000000000000"}),
            )
            .expiring_at(Utc::now() - Duration::seconds(1)),
        )
        .unwrap();

    let outcome = world.trade_dispatcher().run_once().await.unwrap();

    assert_eq!(outcome, Some(JobOutcome::Expired(id)));
    assert_eq!(job(&world, id).status, JobStatus::Expired);
    assert!(world.chain.sent().is_empty());
    assert!(chat_jobs(&world).is_empty());
}

// ---------------------------------------------------------------------------
// Sell
// ---------------------------------------------------------------------------

#[tokio::test]
async fn full_sell_realizes_profit_and_archives_position() {
    let world = World::new("sell-full");
    buy_100_tokens(&world).await;

    world.set_market_price(dec!(0.000012));
    world.chain.script_swap(SwapEffect {
        debit: (TOKEN, ether(100)),
        credit: (world.weth(), units(12, 14)),
    });
    let id = world.enqueue_sell(ether(100));
    let outcome = world.trade_dispatcher().run_once().await.unwrap();
    assert_eq!(outcome, Some(JobOutcome::Completed(id)));

    assert!(world.ledger.get_position(&PAIR).unwrap().is_none());
    let closed = world.ledger.closed_positions(&PAIR).unwrap();
    assert_eq!(closed.len(), 1);
    assert_eq!(closed[0].book_value, U256::ZERO);
    assert_eq!(closed[0].token_sold, ether(100));
    assert_eq!(
        closed[0].realized_pnl,
        I256::from_raw(units(2, 14))
    );

    let chats = chat_jobs(&world);
    assert_eq!(chats.last().unwrap().payload["message"], "Sold 100 TKN for 0.0012 WETH");
}

#[tokio::test]
async fn partial_sell_keeps_position_open() {
    let world = World::new("sell-partial");
    buy_100_tokens(&world).await;

    world.set_market_price(dec!(0.00001));
    world.chain.script_swap(SwapEffect {
        debit: (TOKEN, ether(25)),
        credit: (world.weth(), units(25, 13)),
    });
    let id = world.enqueue_sell(ether(25));
    world.trade_dispatcher().run_once().await.unwrap();
    assert_eq!(job(&world, id).status, JobStatus::Completed);

    let position = world.ledger.get_position(&PAIR).unwrap().unwrap();
    assert_eq!(position.book_value, units(75, 13));
    assert_eq!(position.token_sold, ether(25));
    assert_eq!(position.realized_pnl, I256::ZERO);
}

#[tokio::test]
async fn sell_without_position_is_a_business_failure() {
    let world = World::new("sell-no-position");
    world.set_market_price(dec!(0.00001));
    let id = world.enqueue_sell(ether(1));

    world.trade_dispatcher().run_once().await.unwrap();

    let failed = job(&world, id);
    assert_eq!(kind(&failed), "business_rule");
    assert!(exception(&failed).starts_with("No open position"));
}

// ---------------------------------------------------------------------------
// update-balances and wrap
// ---------------------------------------------------------------------------

#[tokio::test]
async fn update_balances_is_idempotent() {
    let world = World::new("balances");
    world.chain.set_token(TOKEN, ether(5));
    let dispatcher = world.trade_dispatcher();

    for _ in 0..2 {
        let id = world.enqueue("update-balances", json!({}));
        assert_eq!(
            dispatcher.run_once().await.unwrap(),
            Some(JobOutcome::Completed(id))
        );
        let tkn = world.ledger.get_token(&TOKEN).unwrap().unwrap();
        let eth = world.ledger.get_token(&NATIVE_TOKEN).unwrap().unwrap();
        assert_eq!(tkn.balance, ether(5));
        assert_eq!(eth.balance, ether(1));
    }
}

#[tokio::test]
async fn update_balances_skips_unknown_tokens() {
    let world = World::new("balances-listed");
    world.chain.set_token(TOKEN, ether(3));
    let id = world.enqueue(
        "update-balances",
        json!({"addresses": [TOKEN.to_string(), Address::repeat_byte(0x42).to_string()]}),
    );

    world.trade_dispatcher().run_once().await.unwrap();

    assert_eq!(job(&world, id).status, JobStatus::Completed);
    assert_eq!(
        world.ledger.get_token(&TOKEN).unwrap().unwrap().balance,
        ether(3)
    );
}

#[tokio::test]
async fn wrap_moves_eth_into_weth() {
    let world = World::new("wrap");
    let id = world.enqueue("wrap", json!({"value": units(1, 17).to_string()}));

    let outcome = world.trade_dispatcher().run_once().await.unwrap();
    assert_eq!(outcome, Some(JobOutcome::Completed(id)));

    let eth = world.ledger.get_token(&NATIVE_TOKEN).unwrap().unwrap();
    let weth = world.ledger.get_token(&world.weth()).unwrap().unwrap();
    assert_eq!(eth.balance, units(9, 17));
    assert_eq!(weth.balance, units(11, 16));

    let sent = world.chain.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].gas_limit, Some(75_000));
    assert_eq!(
        chat_jobs(&world)[0].payload["message"],
        "Wrapped 0.1 ETH into WETH"
    );
}

#[tokio::test]
async fn wrap_checks_stored_eth_balance() {
    let world = World::new("wrap-low");
    let id = world.enqueue("wrap", json!({"value": ether(2).to_string()}));

    world.trade_dispatcher().run_once().await.unwrap();

    assert!(exception(&job(&world, id)).starts_with("Not enough ETH to wrap"));
    assert!(world.chain.sent().is_empty());
}
