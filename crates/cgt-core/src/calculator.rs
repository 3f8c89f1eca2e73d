//! Top-level orchestration of the CGT calculation pipeline:
//! split normalisation, GBP enrichment, share matching, then tax-year
//! aggregation.

use cgt_money::FxCache;

use crate::aggregator;
use crate::config::Config;
use crate::error::CgtError;
use crate::matcher;
use crate::models::{TaxReport, Transaction, transactions_to_gbp};
use crate::splits::{self, SplitEvent};

/// Run the full pipeline over a list of transactions.
///
/// `tax_year_start`, if given, restricts the report to that single tax year
/// (e.g. `Some(2023)` for 2023/24). `fx_cache` supplies the monthly FX rates
/// used to convert non-GBP amounts; pass `None` to treat every non-GBP
/// transaction as unpriced (its `fx_error` will be set, and any disposal that
/// depends on it marked `is_incomplete`, rather than the calculation failing
/// outright). `external_splits` supplements any SPLIT/UNSPLIT transactions
/// found inline in `transactions`.
///
/// # Validation
///
/// This function does not perform input validation. Callers should use
/// [`crate::validation::validate()`] first to catch invalid inputs (zero
/// quantities, negative prices, etc.) with helpful error messages.
///
/// ```
/// use cgt_core::calculator::calculate;
/// use cgt_core::{Transaction, Operation, CurrencyAmount, Currency};
/// use chrono::NaiveDate;
/// use rust_decimal_macros::dec;
///
/// let transactions = vec![Transaction {
///     date: NaiveDate::from_ymd_opt(2023, 6, 1).unwrap(),
///     ticker: "AAPL".to_string(),
///     operation: Operation::Buy {
///         amount: dec!(10),
///         price: CurrencyAmount::new(dec!(150), Currency::GBP),
///         fees: CurrencyAmount::default(),
///     },
/// }];
///
/// let report = calculate(transactions, None, None, Vec::new()).unwrap();
/// assert_eq!(report.holdings.len(), 1);
/// assert_eq!(report.holdings[0].quantity, dec!(10));
/// ```
pub fn calculate(
    transactions: Vec<Transaction>,
    tax_year_start: Option<u16>,
    fx_cache: Option<&FxCache>,
    external_splits: Vec<SplitEvent>,
) -> Result<TaxReport, CgtError> {
    let config = Config::load_with_overrides();

    let (transactions, inline_splits) = splits::extract_registry(transactions);
    let registry = splits::merge_registry(inline_splits, external_splits);
    let transactions = splits::normalise(transactions, &registry);

    let gbp_transactions = transactions_to_gbp(&transactions, fx_cache);

    let (disposals, mut holdings) = matcher::run(&gbp_transactions);
    holdings.sort_by(|a, b| a.ticker.cmp(&b.ticker));

    let mut tax_years = aggregator::build_summaries(disposals, &config);
    if let Some(year) = tax_year_start {
        tax_years.retain(|summary| summary.period.start_year() == year);
    }
    tax_years.sort_by_key(|summary| summary.period.start_year());

    Ok(TaxReport {
        tax_years,
        holdings,
    })
}
