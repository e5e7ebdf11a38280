//! Insertion of missing subtotal / subsubtotal lines.
//!
//! Every run of lines under a `subtitle` must end with a `subsubtotal`, and
//! every run under a `title` (possibly spanning several subtitles) must end
//! with a `subtotal`. Planning is a single pass over the order with two scope
//! states; applying the plan only inserts lines, so pre-existing lines keep
//! their relative order.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use subchapters_core::{Aggregate, AggregateId, AggregateRoot, DomainError, ExpectedVersion};

use crate::config::SyncConfig;
use crate::line::{LineId, LineType, SaleLine};
use crate::order::{SaleOrder, SaleOrderCommand, SaleOrderId, UpdateSubtotals};
use crate::store::{OrderStore, StoreError};

/// A line to insert before the pre-existing line at `position`
/// (`position == len` appends).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineInsertion {
    pub position: usize,
    pub line: SaleLine,
}

/// A description correction for an existing aggregate line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relabel {
    pub line_id: LineId,
    pub description: String,
}

/// Changes needed to complete the structure of one order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtotalPlan {
    /// Sorted by `position`; equal positions keep their planned order.
    pub insertions: Vec<LineInsertion>,
    pub relabels: Vec<Relabel>,
}

impl SubtotalPlan {
    pub fn is_empty(&self) -> bool {
        self.insertions.is_empty() && self.relabels.is_empty()
    }

    /// Apply all changes to `lines` in one batch.
    pub fn apply_to(&self, lines: &mut Vec<SaleLine>) {
        for relabel in &self.relabels {
            if let Some(line) = lines.iter_mut().find(|l| l.id == relabel.line_id) {
                line.description.clone_from(&relabel.description);
            }
        }

        if self.insertions.is_empty() {
            return;
        }

        let existing = std::mem::take(lines);
        let mut pending = self.insertions.iter().peekable();
        let mut merged = Vec::with_capacity(existing.len() + self.insertions.len());

        for (index, line) in existing.into_iter().enumerate() {
            while let Some(insertion) = pending.next_if(|ins| ins.position <= index) {
                merged.push(insertion.line.clone());
            }
            merged.push(line);
        }
        merged.extend(pending.map(|ins| ins.line.clone()));

        *lines = merged;
    }
}

/// Plan the subtotal / subsubtotal lines missing from `lines`.
///
/// Never fails: malformed nesting simply closes whatever scope is open.
/// Inserted lines get ids derived from `batch_id` and their ordinal in the
/// plan, so the same input always yields the same plan.
pub fn plan_subtotals(
    lines: &[SaleLine],
    config: &SyncConfig,
    batch_id: AggregateId,
) -> SubtotalPlan {
    let mut planner = Planner::new(config, batch_id);

    for (position, line) in lines.iter().enumerate() {
        match line.line_type {
            LineType::Line => {}
            LineType::Title => {
                planner.close_subtitle(position);
                planner.close_title(position);
                planner.open_title = Some(line.description.as_str());
            }
            LineType::Subtitle => {
                planner.close_subtitle(position);
                planner.open_subtitle = Some(line.description.as_str());
            }
            LineType::Subtotal => {
                planner.close_subtitle(position);
                if let Some(heading) = planner.open_title.take() {
                    planner.relabel(line, heading);
                }
            }
            LineType::Subsubtotal => {
                // With no open subtitle this closes the title scope instead.
                if let Some(heading) = planner
                    .open_subtitle
                    .take()
                    .or_else(|| planner.open_title.take())
                {
                    planner.relabel(line, heading);
                }
            }
        }
    }

    planner.close_subtitle(lines.len());
    planner.close_title(lines.len());
    planner.plan
}

struct Planner<'a> {
    config: &'a SyncConfig,
    batch_id: AggregateId,
    open_title: Option<&'a str>,
    open_subtitle: Option<&'a str>,
    plan: SubtotalPlan,
}

impl<'a> Planner<'a> {
    fn new(config: &'a SyncConfig, batch_id: AggregateId) -> Self {
        Self {
            config,
            batch_id,
            open_title: None,
            open_subtitle: None,
            plan: SubtotalPlan::default(),
        }
    }

    fn close_subtitle(&mut self, position: usize) {
        if let Some(heading) = self.open_subtitle.take() {
            self.insert(position, LineType::Subsubtotal, heading);
        }
    }

    fn close_title(&mut self, position: usize) {
        if let Some(heading) = self.open_title.take() {
            self.insert(position, LineType::Subtotal, heading);
        }
    }

    fn insert(&mut self, position: usize, line_type: LineType, heading: &str) {
        let ordinal = self.plan.insertions.len();
        let id = LineId::new(self.batch_id.derive(&ordinal.to_string()));
        self.plan.insertions.push(LineInsertion {
            position,
            line: SaleLine::with_id(id, line_type, self.config.describe(heading)),
        });
    }

    fn relabel(&mut self, line: &SaleLine, heading: &str) {
        if !self.config.relabel_existing {
            return;
        }
        let description = self.config.describe(heading);
        if line.description != description {
            self.plan.relabels.push(Relabel {
                line_id: line.id,
                description,
            });
        }
    }
}

/// Failure while synchronizing one order of a batch.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SyncError {
    #[error(transparent)]
    Domain(#[from] DomainError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// What a synchronization run changed, per order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub orders: Vec<OrderSyncOutcome>,
}

/// Result for one order. A failed order keeps zero counts: nothing of it was
/// applied or saved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSyncOutcome {
    pub order_id: SaleOrderId,
    pub inserted: usize,
    pub relabeled: usize,
    pub error: Option<SyncError>,
}

impl SyncReport {
    pub fn inserted(&self) -> usize {
        self.orders.iter().map(|o| o.inserted).sum()
    }

    pub fn relabeled(&self) -> usize {
        self.orders.iter().map(|o| o.relabeled).sum()
    }

    pub fn is_noop(&self) -> bool {
        self.orders.iter().all(|o| o.inserted == 0 && o.relabeled == 0)
    }

    pub fn failures(&self) -> impl Iterator<Item = &OrderSyncOutcome> {
        self.orders.iter().filter(|o| o.error.is_some())
    }

    pub fn is_complete(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// Complete the subtotal structure of every order and save the changed ones.
///
/// Orders are independent: a failing order is recorded in the report and the
/// batch continues. Each changed order is written back in a single `save`
/// guarded by its pre-synchronization version; the in-memory order is only
/// replaced once that save succeeded.
pub fn update_subtotals<S>(
    orders: &mut [SaleOrder],
    store: &S,
    config: &SyncConfig,
    occurred_at: DateTime<Utc>,
) -> SyncReport
where
    S: OrderStore + ?Sized,
{
    let mut report = SyncReport::default();

    for order in orders.iter_mut() {
        let order_id = order.id_typed();
        let outcome = match sync_order(order, store, config, occurred_at) {
            Ok((inserted, relabeled)) => OrderSyncOutcome {
                order_id,
                inserted,
                relabeled,
                error: None,
            },
            Err(error) => {
                tracing::warn!(%order_id, %error, "subtotal update failed");
                OrderSyncOutcome {
                    order_id,
                    inserted: 0,
                    relabeled: 0,
                    error: Some(error),
                }
            }
        };
        report.orders.push(outcome);
    }

    report
}

fn sync_order<S>(
    order: &mut SaleOrder,
    store: &S,
    config: &SyncConfig,
    occurred_at: DateTime<Utc>,
) -> Result<(usize, usize), SyncError>
where
    S: OrderStore + ?Sized,
{
    let order_id = order.id_typed();
    let expected = ExpectedVersion::Exact(order.version());

    let mut next = order.clone();
    let events = next.execute(&SaleOrderCommand::UpdateSubtotals(UpdateSubtotals {
        order_id,
        batch_id: AggregateId::new(),
        config: config.clone(),
        occurred_at,
    }))?;

    if events.is_empty() {
        tracing::debug!(%order_id, "subtotal structure already complete");
        return Ok((0, 0));
    }

    let (inserted, relabeled) = events
        .iter()
        .filter_map(|e| e.subtotal_plan())
        .fold((0, 0), |(i, r), plan| {
            (i + plan.insertions.len(), r + plan.relabels.len())
        });

    store.save(&next, expected)?;
    *order = next;
    tracing::info!(%order_id, inserted, relabeled, "subtotal lines updated");

    Ok((inserted, relabeled))
}
