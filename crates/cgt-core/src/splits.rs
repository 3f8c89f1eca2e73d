//! Split Normaliser: retroactively restates BUY/SELL (and other per-share)
//! quantities and prices into the latest share-count terms, given a registry
//! of SPLIT/UNSPLIT events. Normalisation runs before FX conversion and
//! before matching, so the rest of the pipeline never sees a raw SPLIT or
//! UNSPLIT transaction and the matching engine always deals in a single,
//! consistent share-count unit per ticker.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::models::{CurrencyAmount, Operation, Transaction};

/// A registry entry describing a retroactive share-count rescale.
#[derive(Debug, Clone, PartialEq)]
pub struct SplitEvent {
    pub ticker: String,
    pub effective_date: NaiveDate,
    /// Multiply pre-event quantities by this factor (and divide prices by
    /// it) to express them in post-event share-count terms. Greater than one
    /// for a forward split, less than one for a reverse split.
    pub factor: Decimal,
}

/// Pull inline SPLIT/UNSPLIT transactions out of the stream into a registry,
/// returning the remaining transactions untouched and in their original
/// relative order.
pub fn extract_registry(transactions: Vec<Transaction>) -> (Vec<Transaction>, Vec<SplitEvent>) {
    let mut registry = Vec::new();
    let mut rest = Vec::with_capacity(transactions.len());
    for tx in transactions {
        match &tx.operation {
            Operation::Split { ratio } => registry.push(SplitEvent {
                ticker: tx.ticker.clone(),
                effective_date: tx.date,
                factor: *ratio,
            }),
            Operation::Unsplit { ratio } if *ratio != Decimal::ZERO => registry.push(SplitEvent {
                ticker: tx.ticker.clone(),
                effective_date: tx.date,
                factor: Decimal::ONE / *ratio,
            }),
            Operation::Unsplit { .. } => {}
            _ => rest.push(tx),
        }
    }
    (rest, registry)
}

/// Combine a caller-supplied external registry with one extracted from the
/// transaction stream. Events are independent of each other, so this is a
/// plain concatenation; [`normalise`] aggregates by ticker and date.
pub fn merge_registry(mut base: Vec<SplitEvent>, extra: Vec<SplitEvent>) -> Vec<SplitEvent> {
    base.extend(extra);
    base
}

/// Cumulative factor for a transaction dated `date` on `ticker`: the product
/// of every registry event for that ticker whose effective date is strictly
/// after `date`. A transaction is only restated by splits that happen after
/// it, since splits before it are already reflected in its recorded price.
fn cumulative_factor(registry: &[SplitEvent], ticker: &str, date: NaiveDate) -> Decimal {
    registry
        .iter()
        .filter(|e| e.ticker == ticker && e.effective_date > date)
        .fold(Decimal::ONE, |acc, e| acc * e.factor)
}

/// Apply the registry to every transaction's share-denominated fields.
/// BUY/SELL prices are scaled inversely so `amount * price` (the
/// consideration) is unchanged; fees, being a fixed cash cost, are left
/// alone.
pub fn normalise(transactions: Vec<Transaction>, registry: &[SplitEvent]) -> Vec<Transaction> {
    if registry.is_empty() {
        return transactions;
    }

    transactions
        .into_iter()
        .map(|tx| {
            let factor = cumulative_factor(registry, &tx.ticker, tx.date);
            if factor == Decimal::ONE {
                return tx;
            }

            let Transaction {
                date,
                ticker,
                operation,
            } = tx;

            let operation = match operation {
                Operation::Buy {
                    amount,
                    price,
                    fees,
                } => Operation::Buy {
                    amount: amount * factor,
                    price: scale_price(price, factor),
                    fees,
                },
                Operation::Sell {
                    amount,
                    price,
                    fees,
                } => Operation::Sell {
                    amount: amount * factor,
                    price: scale_price(price, factor),
                    fees,
                },
                Operation::Dividend {
                    amount,
                    total_value,
                    tax_paid,
                } => Operation::Dividend {
                    amount: amount * factor,
                    total_value,
                    tax_paid,
                },
                Operation::CapReturn {
                    amount,
                    total_value,
                    fees,
                } => Operation::CapReturn {
                    amount: amount * factor,
                    total_value,
                    fees,
                },
                Operation::Transfer { amount } => Operation::Transfer {
                    amount: amount * factor,
                },
                other => other,
            };

            Transaction {
                date,
                ticker,
                operation,
            }
        })
        .collect()
}

fn scale_price(price: CurrencyAmount, factor: Decimal) -> CurrencyAmount {
    CurrencyAmount::new(price.amount / factor, price.currency)
}
