//! Engine services: queue dispatch, event handling, trade execution,
//! strategies, quote ingestion and the ETH price refresh.

pub mod chat;
pub mod dispatcher;
pub mod ether_price;
pub mod handler;
pub mod quotes;
pub mod settings;
pub mod strategy;
pub mod trade;
