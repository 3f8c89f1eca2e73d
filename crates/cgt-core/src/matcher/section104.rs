//! The Section 104 pool: a moving-average cost basis over the shares of a
//! security not otherwise claimed by the same-day or 30-day rules.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::models::{PoolEvent, PoolEventKind, Section104Holding};

/// Mutable pool state tracked per ticker while the matcher runs.
#[derive(Debug, Default)]
pub struct PoolState {
    pub quantity: Decimal,
    pub total_cost: Decimal,
    history: Vec<PoolEvent>,
}

impl PoolState {
    pub fn average_cost(&self) -> Decimal {
        if self.quantity.is_zero() {
            Decimal::ZERO
        } else {
            self.total_cost / self.quantity
        }
    }

    /// Add unreserved BUY quantity to the pool.
    pub fn acquire(&mut self, date: NaiveDate, quantity: Decimal, cost: Decimal, sequence: usize) {
        if quantity <= Decimal::ZERO {
            return;
        }
        self.quantity += quantity;
        self.total_cost += cost;
        self.history.push(PoolEvent {
            date,
            event_kind: PoolEventKind::Acquisition,
            quantity_delta: quantity,
            cost_or_proceeds_delta: cost,
            balance_quantity_after: self.quantity,
            balance_cost_after: self.total_cost,
            transaction_sequence: sequence,
        });
    }

    /// Remove up to `requested` quantity from the pool at the current
    /// average cost. Returns `(quantity removed, allowable cost)`; the
    /// quantity removed is capped at the pool's available balance.
    pub fn dispose(
        &mut self,
        date: NaiveDate,
        requested: Decimal,
        sequence: usize,
    ) -> (Decimal, Decimal) {
        if requested <= Decimal::ZERO || self.quantity <= Decimal::ZERO {
            return (Decimal::ZERO, Decimal::ZERO);
        }
        let claimed = requested.min(self.quantity);
        let cost = self.average_cost() * claimed;
        self.quantity -= claimed;
        self.total_cost -= cost;
        self.history.push(PoolEvent {
            date,
            event_kind: PoolEventKind::Disposal,
            quantity_delta: -claimed,
            cost_or_proceeds_delta: -cost,
            balance_quantity_after: self.quantity,
            balance_cost_after: self.total_cost,
            transaction_sequence: sequence,
        });
        (claimed, cost)
    }

    pub fn into_holding(self, ticker: String) -> Section104Holding {
        Section104Holding {
            ticker,
            quantity: self.quantity,
            total_cost: self.total_cost,
            history: self.history,
        }
    }
}
