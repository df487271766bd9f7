//! Trait definitions (hexagonal ports). Depend only on domain.
//!
//! Ports describe the external collaborators the engine drives: the
//! blockchain client, the market-data provider and the operator channel.
//! Persistence is not a port; the SQLite adapter is used directly.
//!
//! ```text
//!                    ┌─────────────────────────┐
//!                    │      Application        │
//!     ┌──────────────┤  dispatcher, handlers,  ├──────────────┐
//!     │              │  strategies, scheduler  │              │
//!     │              └─────────────────────────┘              │
//!     ▼                         ▼                             ▼
//! ┌─────────┐            ┌─────────────┐              ┌───────────┐
//! │  Chain  │            │ QuoteSource │              │ Notifier  │
//! │ Adapter │            │   Adapter   │              │  Adapter  │
//! └─────────┘            └─────────────┘              └───────────┘
//! ```

pub mod outbound;
