//! Share matching for CGT calculations.
//!
//! HMRC's share identification rules (same-day, 30-day/"bed and breakfast",
//! then the Section 104 pool) cannot be applied in a single forward pass: the
//! 30-day rule lets a disposal claim an acquisition that happens *after* it,
//! which would otherwise have been absorbed into the pool. This module runs
//! two passes per ticker instead:
//!
//! - Pass A reserves same-day and 30-day claims across the ticker's whole
//!   history, disposal by disposal in chronological order, before any pool
//!   activity is simulated.
//! - Pass B replays the ticker's history in chronological order, feeding
//!   unreserved BUY quantity into the Section 104 pool and satisfying SELL
//!   shortfalls from it. Any shortfall the pool cannot cover is queued and
//!   resolved by a later, still-unreserved BUY (the short-sell fallback).

mod bed_and_breakfast;
mod same_day;
mod section104;

use std::collections::{HashMap, VecDeque};

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::models::{Disposal, GbpTransaction, Match, MatchRule, Operation, Section104Holding};
use section104::PoolState;

/// One BUY's reservation bookkeeping while the matcher runs.
#[derive(Debug, Clone)]
struct BuyLeg {
    sequence: usize,
    date: NaiveDate,
    quantity: Decimal,
    unit_cost: Decimal,
    reserved: Decimal,
}

impl BuyLeg {
    fn available(&self) -> Decimal {
        self.quantity - self.reserved
    }
}

/// One SELL as seen by the matcher. `valid` is false when the transaction's
/// FX rate could not be resolved; an invalid sell produces an incomplete
/// disposal with no matches rather than participating in matching.
struct SellInput<'a> {
    tx: &'a GbpTransaction,
    quantity: Decimal,
    unit_gross_price: Decimal,
    unit_net_proceeds: Decimal,
    valid: bool,
}

/// Run the matching engine over GBP-normalized transactions.
///
/// Transactions must already be split-normalised: SPLIT and UNSPLIT
/// operations are not processed here (see [`crate::splits`]) and are
/// ignored if present. Non-trading operations (DIVIDEND, CAPRETURN,
/// INTEREST, TAX, FEE, TRANSFER) pass through untouched and do not affect
/// matching.
pub fn run(transactions: &[GbpTransaction]) -> (Vec<Disposal>, Vec<Section104Holding>) {
    let mut by_ticker: HashMap<String, Vec<&GbpTransaction>> = HashMap::new();
    for tx in transactions {
        if matches!(tx.operation, Operation::Buy { .. } | Operation::Sell { .. }) {
            by_ticker.entry(tx.ticker.clone()).or_default().push(tx);
        }
    }

    let mut tickers: Vec<String> = by_ticker.keys().cloned().collect();
    tickers.sort();

    let mut disposals = Vec::new();
    let mut holdings = Vec::new();

    for ticker in tickers {
        let Some(mut txs) = by_ticker.remove(&ticker) else {
            continue;
        };
        txs.sort_by_key(|t| (t.date, t.sequence));
        let (ticker_disposals, holding) = run_for_ticker(&ticker, &txs);
        disposals.extend(ticker_disposals);
        if holding.quantity != Decimal::ZERO || !holding.history.is_empty() {
            holdings.push(holding);
        }
    }

    crate::ordering::sort_by_date_ticker(&mut disposals, |d| d.date, |d| d.ticker.as_str());

    (disposals, holdings)
}

fn run_for_ticker(
    ticker: &str,
    txs: &[&GbpTransaction],
) -> (Vec<Disposal>, Section104Holding) {
    let mut buys: Vec<BuyLeg> = Vec::new();
    let mut sells: Vec<SellInput<'_>> = Vec::new();

    for tx in txs {
        match &tx.operation {
            Operation::Buy {
                amount,
                price,
                fees,
            } => {
                if tx.fx_error.is_some() || *amount == Decimal::ZERO {
                    continue;
                }
                let total_cost = *amount * *price + *fees;
                buys.push(BuyLeg {
                    sequence: tx.sequence,
                    date: tx.date,
                    quantity: *amount,
                    unit_cost: total_cost / *amount,
                    reserved: Decimal::ZERO,
                });
            }
            Operation::Sell {
                amount,
                price,
                fees,
            } => {
                let valid = tx.fx_error.is_none() && *amount != Decimal::ZERO;
                let (unit_gross_price, unit_net_proceeds) = if valid {
                    let net_total = *amount * *price - *fees;
                    (*price, net_total / *amount)
                } else {
                    (Decimal::ZERO, Decimal::ZERO)
                };
                sells.push(SellInput {
                    tx,
                    quantity: *amount,
                    unit_gross_price,
                    unit_net_proceeds,
                    valid,
                });
            }
            _ => {}
        }
    }

    // Pass A: same-day then 30-day reservation, earliest disposal first.
    let mut matches_by_sell: Vec<Vec<Match>> = vec![Vec::new(); sells.len()];
    let mut remaining_by_sell: Vec<Decimal> = Vec::with_capacity(sells.len());

    for (i, sell) in sells.iter().enumerate() {
        if !sell.valid {
            remaining_by_sell.push(Decimal::ZERO);
            continue;
        }
        let mut remaining = sell.quantity;

        for (buy_idx, qty) in same_day::claim(&mut buys, sell.tx.date, &mut remaining) {
            matches_by_sell[i].push(build_match(
                MatchRule::SameDay,
                qty,
                buys[buy_idx].unit_cost * qty,
                sell.unit_net_proceeds * qty,
                Some(buys[buy_idx].date),
            ));
        }
        for (buy_idx, qty) in bed_and_breakfast::claim(&mut buys, sell.tx.date, &mut remaining) {
            matches_by_sell[i].push(build_match(
                MatchRule::BedAndBreakfast,
                qty,
                buys[buy_idx].unit_cost * qty,
                sell.unit_net_proceeds * qty,
                Some(buys[buy_idx].date),
            ));
        }

        remaining_by_sell.push(remaining);
    }

    // Pass B: pool simulation plus short-sell fallback, replayed in
    // chronological order over the full per-ticker transaction stream.
    let mut pool = PoolState::default();
    let mut short_queue: VecDeque<(usize, Decimal)> = VecDeque::new();

    let buy_index_by_sequence: HashMap<usize, usize> = buys
        .iter()
        .enumerate()
        .map(|(idx, b)| (b.sequence, idx))
        .collect();
    let sell_index_by_sequence: HashMap<usize, usize> = sells
        .iter()
        .enumerate()
        .map(|(idx, s)| (s.tx.sequence, idx))
        .collect();

    for tx in txs {
        match &tx.operation {
            Operation::Buy { .. } => {
                let Some(&buy_idx) = buy_index_by_sequence.get(&tx.sequence) else {
                    continue;
                };
                let mut unreserved = buys[buy_idx].available();
                if unreserved <= Decimal::ZERO {
                    continue;
                }

                while unreserved > Decimal::ZERO {
                    let Some(&(sell_i, owed)) = short_queue.front() else {
                        break;
                    };
                    let claimed = owed.min(unreserved);
                    let cost = buys[buy_idx].unit_cost * claimed;
                    let proceeds = sells[sell_i].unit_net_proceeds * claimed;
                    matches_by_sell[sell_i].push(build_match(
                        MatchRule::ShortSell,
                        claimed,
                        cost,
                        proceeds,
                        Some(buys[buy_idx].date),
                    ));
                    unreserved -= claimed;
                    buys[buy_idx].reserved += claimed;
                    let remaining_owed = owed - claimed;
                    if let Some(front) = short_queue.front_mut() {
                        if remaining_owed > Decimal::ZERO {
                            front.1 = remaining_owed;
                        } else {
                            short_queue.pop_front();
                        }
                    }
                }

                if unreserved > Decimal::ZERO {
                    let cost = buys[buy_idx].unit_cost * unreserved;
                    pool.acquire(buys[buy_idx].date, unreserved, cost, buys[buy_idx].sequence);
                }
            }
            Operation::Sell { .. } => {
                let Some(&sell_i) = sell_index_by_sequence.get(&tx.sequence) else {
                    continue;
                };
                if !sells[sell_i].valid {
                    continue;
                }
                let mut remaining = remaining_by_sell[sell_i];
                if remaining <= Decimal::ZERO {
                    continue;
                }

                let (claimed, cost) = pool.dispose(tx.date, remaining, tx.sequence);
                if claimed > Decimal::ZERO {
                    let proceeds = sells[sell_i].unit_net_proceeds * claimed;
                    matches_by_sell[sell_i].push(build_match(
                        MatchRule::Section104,
                        claimed,
                        cost,
                        proceeds,
                        None,
                    ));
                    remaining -= claimed;
                }

                if remaining > Decimal::ZERO {
                    short_queue.push_back((sell_i, remaining));
                }
            }
            _ => {}
        }
    }

    let mut disposals = Vec::with_capacity(sells.len());
    for (i, sell) in sells.into_iter().enumerate() {
        let matches = std::mem::take(&mut matches_by_sell[i]);
        let matched_quantity: Decimal = matches.iter().map(|m| m.quantity).sum();
        let unmatched_quantity = (sell.quantity - matched_quantity).max(Decimal::ZERO);
        let is_incomplete = !sell.valid || unmatched_quantity > Decimal::ZERO;

        let gross_proceeds = if sell.valid {
            matched_quantity * sell.unit_gross_price
        } else {
            Decimal::ZERO
        };
        let proceeds: Decimal = matches
            .iter()
            .map(|m| m.gain_or_loss + m.allowable_cost)
            .sum();

        disposals.push(Disposal {
            id: format!("{ticker}-{}-{}", sell.tx.date, sell.tx.sequence),
            date: sell.tx.date,
            ticker: ticker.to_string(),
            quantity: sell.quantity,
            gross_proceeds,
            proceeds,
            matches,
            is_incomplete,
            unmatched_quantity,
        });
    }

    (disposals, pool.into_holding(ticker.to_string()))
}

fn build_match(
    rule: MatchRule,
    quantity: Decimal,
    allowable_cost: Decimal,
    proceeds: Decimal,
    acquisition_date: Option<NaiveDate>,
) -> Match {
    Match {
        rule,
        quantity,
        allowable_cost,
        gain_or_loss: proceeds - allowable_cost,
        acquisition_date,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn buy(date: &str, ticker: &str, sequence: usize, qty: Decimal, price: Decimal) -> GbpTransaction {
        GbpTransaction {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            ticker: ticker.to_string(),
            operation: Operation::Buy {
                amount: qty,
                price,
                fees: Decimal::ZERO,
            },
            sequence,
            fx_error: None,
        }
    }

    fn sell(date: &str, ticker: &str, sequence: usize, qty: Decimal, price: Decimal) -> GbpTransaction {
        GbpTransaction {
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            ticker: ticker.to_string(),
            operation: Operation::Sell {
                amount: qty,
                price,
                fees: Decimal::ZERO,
            },
            sequence,
            fx_error: None,
        }
    }

    #[test]
    fn simple_section_104_match() {
        let txs = vec![
            buy("2023-01-01", "AAA", 0, dec!(100), dec!(10)),
            sell("2023-06-01", "AAA", 1, dec!(40), dec!(15)),
        ];
        let (disposals, holdings) = run(&txs);
        assert_eq!(disposals.len(), 1);
        let d = &disposals[0];
        assert_eq!(d.matches.len(), 1);
        assert_eq!(d.matches[0].rule, MatchRule::Section104);
        assert_eq!(d.matches[0].allowable_cost, dec!(400));
        assert_eq!(d.matches[0].gain_or_loss, dec!(200));
        assert!(!d.is_incomplete);
        assert_eq!(holdings[0].quantity, dec!(60));
    }

    #[test]
    fn same_day_takes_priority_over_pool() {
        let txs = vec![
            buy("2023-01-01", "AAA", 0, dec!(100), dec!(10)),
            buy("2023-06-01", "AAA", 1, dec!(10), dec!(20)),
            sell("2023-06-01", "AAA", 2, dec!(10), dec!(25)),
        ];
        let (disposals, holdings) = run(&txs);
        assert_eq!(disposals[0].matches.len(), 1);
        assert_eq!(disposals[0].matches[0].rule, MatchRule::SameDay);
        assert_eq!(disposals[0].matches[0].allowable_cost, dec!(200));
        assert_eq!(holdings[0].quantity, dec!(100));
    }

    #[test]
    fn bed_and_breakfast_takes_priority_over_pool() {
        let txs = vec![
            buy("2023-01-01", "AAA", 0, dec!(100), dec!(10)),
            sell("2023-06-01", "AAA", 1, dec!(10), dec!(25)),
            buy("2023-06-15", "AAA", 2, dec!(10), dec!(22)),
        ];
        let (disposals, holdings) = run(&txs);
        assert_eq!(disposals[0].matches.len(), 1);
        assert_eq!(disposals[0].matches[0].rule, MatchRule::BedAndBreakfast);
        assert_eq!(disposals[0].matches[0].allowable_cost, dec!(220));
        // the 2023-01-01 buy is untouched, stays in the pool in full
        assert_eq!(holdings[0].quantity, dec!(100));
    }

    #[test]
    fn short_sell_covered_by_later_buy_outside_bnb_window() {
        let txs = vec![
            sell("2023-06-01", "AAA", 0, dec!(10), dec!(25)),
            buy("2023-08-01", "AAA", 1, dec!(10), dec!(20)),
        ];
        let (disposals, holdings) = run(&txs);
        assert_eq!(disposals[0].matches.len(), 1);
        assert_eq!(disposals[0].matches[0].rule, MatchRule::ShortSell);
        assert_eq!(disposals[0].matches[0].allowable_cost, dec!(200));
        assert!(!disposals[0].is_incomplete);
        assert_eq!(holdings[0].quantity, Decimal::ZERO);
    }

    #[test]
    fn unmatched_disposal_beyond_all_rules_is_incomplete() {
        let txs = vec![sell("2023-06-01", "AAA", 0, dec!(10), dec!(25))];
        let (disposals, _) = run(&txs);
        assert!(disposals[0].is_incomplete);
        assert_eq!(disposals[0].unmatched_quantity, dec!(10));
        assert!(disposals[0].matches.is_empty());
    }

    #[test]
    fn fx_error_sell_is_marked_incomplete_without_consuming_pool() {
        let mut s = sell("2023-06-01", "AAA", 1, dec!(10), dec!(25));
        s.fx_error = Some("FX_UNAVAILABLE".to_string());
        let txs = vec![buy("2023-01-01", "AAA", 0, dec!(100), dec!(10)), s];
        let (disposals, holdings) = run(&txs);
        assert!(disposals[0].is_incomplete);
        assert!(disposals[0].matches.is_empty());
        assert_eq!(holdings[0].quantity, dec!(100));
    }
}
