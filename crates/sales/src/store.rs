//! Order persistence capability.
//!
//! The order-management system owns real storage; the synchronizer only needs
//! to load a snapshot and write it back atomically per order.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use thiserror::Error;

use subchapters_core::{AggregateRoot, ExpectedVersion};

use crate::order::{SaleOrder, SaleOrderId};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("sale order {0} not found")]
    NotFound(SaleOrderId),

    #[error("optimistic concurrency check failed: {0}")]
    Concurrency(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Load/save of whole order snapshots.
pub trait OrderStore: Send + Sync {
    fn load(&self, order_id: SaleOrderId) -> Result<SaleOrder, StoreError>;

    /// Replace the stored snapshot with `order` in one write.
    ///
    /// `expected` is checked against the version currently stored (`0` when
    /// the order has never been saved).
    fn save(&self, order: &SaleOrder, expected: ExpectedVersion) -> Result<(), StoreError>;
}

impl<S> OrderStore for Arc<S>
where
    S: OrderStore + ?Sized,
{
    fn load(&self, order_id: SaleOrderId) -> Result<SaleOrder, StoreError> {
        (**self).load(order_id)
    }

    fn save(&self, order: &SaleOrder, expected: ExpectedVersion) -> Result<(), StoreError> {
        (**self).save(order, expected)
    }
}

/// In-memory order store.
///
/// Intended for tests/dev.
#[derive(Debug, Default)]
pub struct InMemoryOrderStore {
    orders: RwLock<HashMap<SaleOrderId, SaleOrder>>,
}

impl InMemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl OrderStore for InMemoryOrderStore {
    fn load(&self, order_id: SaleOrderId) -> Result<SaleOrder, StoreError> {
        let orders = self
            .orders
            .read()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;

        orders
            .get(&order_id)
            .cloned()
            .ok_or(StoreError::NotFound(order_id))
    }

    fn save(&self, order: &SaleOrder, expected: ExpectedVersion) -> Result<(), StoreError> {
        let mut orders = self
            .orders
            .write()
            .map_err(|_| StoreError::Unavailable("lock poisoned".to_string()))?;

        let current = orders
            .get(&order.id_typed())
            .map(|o| o.version())
            .unwrap_or(0);

        if !expected.matches(current) {
            return Err(StoreError::Concurrency(format!(
                "expected {expected:?}, found {current}"
            )));
        }

        orders.insert(order.id_typed(), order.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use subchapters_core::{Aggregate, AggregateId};

    use crate::currency::Currency;
    use crate::order::{CreateSaleOrder, SaleOrderCommand};

    fn created_order() -> SaleOrder {
        let order_id = SaleOrderId::new(AggregateId::new());
        let mut order = SaleOrder::empty(order_id);
        order
            .execute(&SaleOrderCommand::CreateSaleOrder(CreateSaleOrder {
                order_id,
                currency: Currency::eur(),
                occurred_at: Utc::now(),
            }))
            .unwrap();
        order
    }

    #[test]
    fn save_then_load_roundtrips_snapshot() {
        let store = InMemoryOrderStore::new();
        let order = created_order();

        store.save(&order, ExpectedVersion::Any).unwrap();
        assert_eq!(store.load(order.id_typed()).unwrap(), order);
    }

    #[test]
    fn load_unknown_order_fails() {
        let store = InMemoryOrderStore::new();
        let order_id = SaleOrderId::new(AggregateId::new());
        assert_eq!(store.load(order_id).unwrap_err(), StoreError::NotFound(order_id));
    }

    #[test]
    fn stale_expected_version_is_rejected() {
        let store = Arc::new(InMemoryOrderStore::new());
        let order = created_order();
        store.save(&order, ExpectedVersion::Exact(0)).unwrap();

        let err = store.save(&order, ExpectedVersion::Exact(0)).unwrap_err();
        assert!(matches!(err, StoreError::Concurrency(_)));
        store
            .save(&order, ExpectedVersion::Exact(order.version()))
            .unwrap();
    }
}
