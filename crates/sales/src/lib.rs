//! Sale order subchapters.
//!
//! Extends sale order lines with a second grouping level (`subtitle` /
//! `subsubtotal`) under the base `title` / `subtotal` pair, computes the
//! amounts of the aggregate lines, and inserts missing aggregate lines based on
//! the heading structure of an order.
//!
//! Everything here is deterministic domain logic; persistence is reached only
//! through the [`OrderStore`] capability.

pub mod amount;
pub mod config;
pub mod currency;
pub mod line;
pub mod order;
pub mod store;
pub mod synchronizer;

pub use amount::{line_amount, resolve_subsubtotal, resolve_subtotal};
pub use config::SyncConfig;
pub use currency::{Currency, Rounding};
pub use line::{LineId, LineType, SaleLine};
pub use order::{
    AddLine, CreateSaleOrder, LineAdded, LinesRemoved, RemoveLines, SaleOrder, SaleOrderCommand,
    SaleOrderCreated, SaleOrderEvent, SaleOrderId, SubtotalsUpdated, UpdateSubtotals,
};
pub use store::{InMemoryOrderStore, OrderStore, StoreError};
pub use synchronizer::{
    LineInsertion, OrderSyncOutcome, Relabel, SubtotalPlan, SyncError, SyncReport, plan_subtotals,
    update_subtotals,
};
