use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use subchapters_core::{Aggregate, AggregateId, AggregateRoot, DomainError, DomainResult};
use subchapters_events::Event;

use crate::amount::line_amount;
use crate::config::SyncConfig;
use crate::currency::Currency;
use crate::line::{LineId, SaleLine};
use crate::synchronizer::{SubtotalPlan, plan_subtotals};

/// Sale order identifier.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SaleOrderId(pub AggregateId);

impl SaleOrderId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for SaleOrderId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Aggregate root: SaleOrder.
///
/// Owns its lines exclusively; their order is the document layout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaleOrder {
    id: SaleOrderId,
    currency: Currency,
    lines: Vec<SaleLine>,
    version: u64,
    created: bool,
}

impl SaleOrder {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: SaleOrderId) -> Self {
        Self {
            id,
            currency: Currency::eur(),
            lines: Vec::new(),
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> SaleOrderId {
        self.id
    }

    pub fn currency(&self) -> &Currency {
        &self.currency
    }

    pub fn lines(&self) -> &[SaleLine] {
        &self.lines
    }

    pub fn position_of(&self, line_id: LineId) -> Option<usize> {
        self.lines.iter().position(|l| l.id == line_id)
    }

    /// Displayed amount of the line at `index`, `Ok(None)` for headings.
    ///
    /// Fails with `NotFound` for an out-of-range index and with an invariant
    /// violation when the amount does not fit a `Decimal`.
    pub fn amount_at(&self, index: usize) -> DomainResult<Option<Decimal>> {
        line_amount(&self.lines, index, &self.currency)
    }

    /// Displayed amount of a line, `Ok(None)` for headings.
    pub fn amount_of(&self, line_id: LineId) -> DomainResult<Option<Decimal>> {
        let index = self.position_of(line_id).ok_or_else(DomainError::not_found)?;
        line_amount(&self.lines, index, &self.currency)
    }

    /// Changes `UpdateSubtotals` would make, without making them.
    ///
    /// Inserted line ids are derived from `batch_id`.
    pub fn subtotal_plan(&self, config: &SyncConfig, batch_id: AggregateId) -> SubtotalPlan {
        plan_subtotals(&self.lines, config, batch_id)
    }
}

impl AggregateRoot for SaleOrder {
    type Id = SaleOrderId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreateSaleOrder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateSaleOrder {
    pub order_id: SaleOrderId,
    pub currency: Currency,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AddLine (appends at the end of the document).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddLine {
    pub order_id: SaleOrderId,
    pub line: SaleLine,
    pub occurred_at: DateTime<Utc>,
}

/// Command: RemoveLines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoveLines {
    pub order_id: SaleOrderId,
    pub line_ids: Vec<LineId>,
    pub occurred_at: DateTime<Utc>,
}

/// Command: UpdateSubtotals.
///
/// `batch_id` seeds the ids of inserted lines, so handling the same command
/// twice yields the same events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateSubtotals {
    pub order_id: SaleOrderId,
    pub batch_id: AggregateId,
    pub config: SyncConfig,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaleOrderCommand {
    CreateSaleOrder(CreateSaleOrder),
    AddLine(AddLine),
    RemoveLines(RemoveLines),
    UpdateSubtotals(UpdateSubtotals),
}

/// Event: SaleOrderCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleOrderCreated {
    pub order_id: SaleOrderId,
    pub currency: Currency,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LineAdded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineAdded {
    pub order_id: SaleOrderId,
    pub line: SaleLine,
    pub occurred_at: DateTime<Utc>,
}

/// Event: LinesRemoved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinesRemoved {
    pub order_id: SaleOrderId,
    pub line_ids: Vec<LineId>,
    pub occurred_at: DateTime<Utc>,
}

/// Event: SubtotalsUpdated. Carries the whole batch so it applies atomically.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubtotalsUpdated {
    pub order_id: SaleOrderId,
    pub plan: SubtotalPlan,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SaleOrderEvent {
    SaleOrderCreated(SaleOrderCreated),
    LineAdded(LineAdded),
    LinesRemoved(LinesRemoved),
    SubtotalsUpdated(SubtotalsUpdated),
}

impl SaleOrderEvent {
    pub fn subtotal_plan(&self) -> Option<&SubtotalPlan> {
        match self {
            SaleOrderEvent::SubtotalsUpdated(e) => Some(&e.plan),
            _ => None,
        }
    }
}

impl Event for SaleOrderEvent {
    fn event_type(&self) -> &'static str {
        match self {
            SaleOrderEvent::SaleOrderCreated(_) => "sales.order.created",
            SaleOrderEvent::LineAdded(_) => "sales.order.line_added",
            SaleOrderEvent::LinesRemoved(_) => "sales.order.lines_removed",
            SaleOrderEvent::SubtotalsUpdated(_) => "sales.order.subtotals_updated",
        }
    }

    fn version(&self) -> u32 {
        1
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            SaleOrderEvent::SaleOrderCreated(e) => e.occurred_at,
            SaleOrderEvent::LineAdded(e) => e.occurred_at,
            SaleOrderEvent::LinesRemoved(e) => e.occurred_at,
            SaleOrderEvent::SubtotalsUpdated(e) => e.occurred_at,
        }
    }
}

impl Aggregate for SaleOrder {
    type Command = SaleOrderCommand;
    type Event = SaleOrderEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            SaleOrderEvent::SaleOrderCreated(e) => {
                self.id = e.order_id;
                self.currency = e.currency.clone();
                self.lines.clear();
                self.created = true;
            }
            SaleOrderEvent::LineAdded(e) => {
                self.lines.push(e.line.clone());
            }
            SaleOrderEvent::LinesRemoved(e) => {
                self.lines.retain(|l| !e.line_ids.contains(&l.id));
            }
            SaleOrderEvent::SubtotalsUpdated(e) => {
                e.plan.apply_to(&mut self.lines);
            }
        }

        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            SaleOrderCommand::CreateSaleOrder(cmd) => self.handle_create(cmd),
            SaleOrderCommand::AddLine(cmd) => self.handle_add_line(cmd),
            SaleOrderCommand::RemoveLines(cmd) => self.handle_remove_lines(cmd),
            SaleOrderCommand::UpdateSubtotals(cmd) => self.handle_update_subtotals(cmd),
        }
    }
}

impl SaleOrder {
    fn ensure_created(&self, order_id: SaleOrderId) -> Result<(), DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        if self.id != order_id {
            return Err(DomainError::invariant("order_id mismatch"));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreateSaleOrder) -> Result<Vec<SaleOrderEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("sale order already exists"));
        }

        Ok(vec![SaleOrderEvent::SaleOrderCreated(SaleOrderCreated {
            order_id: cmd.order_id,
            currency: cmd.currency.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_add_line(&self, cmd: &AddLine) -> Result<Vec<SaleOrderEvent>, DomainError> {
        self.ensure_created(cmd.order_id)?;

        if self.position_of(cmd.line.id).is_some() {
            return Err(DomainError::conflict(format!(
                "line {} already belongs to this order",
                cmd.line.id
            )));
        }

        if cmd.line.raw_amount().is_none() {
            return Err(DomainError::validation(
                "quantity * unit_price exceeds the decimal range",
            ));
        }

        Ok(vec![SaleOrderEvent::LineAdded(LineAdded {
            order_id: cmd.order_id,
            line: cmd.line.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_remove_lines(&self, cmd: &RemoveLines) -> Result<Vec<SaleOrderEvent>, DomainError> {
        self.ensure_created(cmd.order_id)?;

        if cmd.line_ids.is_empty() {
            return Err(DomainError::validation("no lines to remove"));
        }
        if cmd.line_ids.iter().any(|id| self.position_of(*id).is_none()) {
            return Err(DomainError::not_found());
        }

        Ok(vec![SaleOrderEvent::LinesRemoved(LinesRemoved {
            order_id: cmd.order_id,
            line_ids: cmd.line_ids.clone(),
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_update_subtotals(
        &self,
        cmd: &UpdateSubtotals,
    ) -> Result<Vec<SaleOrderEvent>, DomainError> {
        self.ensure_created(cmd.order_id)?;

        let plan = self.subtotal_plan(&cmd.config, cmd.batch_id);
        if plan.is_empty() {
            return Ok(vec![]);
        }

        Ok(vec![SaleOrderEvent::SubtotalsUpdated(SubtotalsUpdated {
            order_id: cmd.order_id,
            plan,
            occurred_at: cmd.occurred_at,
        })])
    }
}
