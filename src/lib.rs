//! # Poker Ledger
//!
//! Records a home poker game's cash economy (food and drink orders, rebuys,
//! final chip counts) and settles it into what each participant owes or is
//! owed.
//!
//! ## Design Principles
//!
//! - **Exact money**: all amounts use `rust_decimal`, rendered to two places
//! - **Pure settlement**: [`compute_settlement`] only sees already-fetched rows
//! - **Explicit persistence**: the [`Store`] trait fetches rows; [`MemoryStore`]
//!   is loaded from and saved to a directory of CSV files
//!
//! ## Example
//!
//! ```no_run
//! use poker_ledger::{settle, StoreConfig};
//!
//! let config = StoreConfig::from_cli_or_env(None);
//! let store = config.open().unwrap();
//! let report = settle(&store, 1).unwrap();
//! report.write_csv(std::io::stdout()).unwrap();
//! ```

pub mod config;
pub mod csv_store;
pub mod error;
pub mod model;
pub mod money;
pub mod settlement;
pub mod store;
pub mod summary;

pub use config::StoreConfig;
pub use error::{LedgerError, Result};
pub use model::{ChipResult, Game, GameId, GameUpdate, NewGame, Order, Rebuy, User, UserId};
pub use money::Money;
pub use settlement::{
    compute_settlement, settle, PlayerSettlement, SettlementLine, SettlementReport,
    SettlementTotals,
};
pub use store::{MemoryStore, Store, Upsert};
pub use summary::{order_breakdown, order_menu, player_status, ItemTotal, MenuItem, PlayerStatus};
