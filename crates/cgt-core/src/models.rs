use cgt_money::FxCache;
use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::CgtError;

// Re-export Currency and CurrencyAmount from cgt-money
pub use cgt_money::{Currency, CurrencyAmount};

/// Serialize a Decimal to at most 2 decimal places for monetary amounts.
mod decimal_money {
    use rust_decimal::Decimal;
    use serde::{self, Serializer};

    pub fn serialize<S>(value: &Decimal, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let rounded = value.round_dp(2);
        serializer.serialize_str(&rounded.to_string())
    }

    pub fn serialize_opt<S>(value: &Option<Decimal>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(v) => serialize(v, serializer),
            None => serializer.serialize_none(),
        }
    }
}

fn uppercase_ticker<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    Ok(s.to_uppercase())
}

/// A validated UK tax year identifier (April 6 to April 5).
///
/// Stores the start year internally and serializes to "YYYY/YY" format (e.g., "2023/24").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaxPeriod(u16);

impl TaxPeriod {
    /// # Errors
    /// Returns `CgtError::InvalidTaxYear` if the year is outside the range 1900-2100.
    pub fn new(start_year: u16) -> Result<Self, CgtError> {
        if !(1900..=2100).contains(&start_year) {
            return Err(CgtError::InvalidTaxYear(start_year));
        }
        Ok(Self(start_year))
    }

    /// Derive the tax year from a date. UK tax year starts April 6.
    pub fn from_date(date: NaiveDate) -> Self {
        Self(tax_year_start(date))
    }

    pub fn start_year(&self) -> u16 {
        self.0
    }

    pub fn end_year(&self) -> u16 {
        self.0 + 1
    }

    pub fn start_date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.0 as i32, 4, 6)
    }

    pub fn end_date(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(self.end_year() as i32, 4, 5)
    }
}

/// The calendar year in which the UK tax year containing `date` starts.
///
/// 2024-03-15 -> 2023 (before April 6); 2024-04-10 -> 2024 (on or after April 6).
pub fn tax_year_start(date: NaiveDate) -> u16 {
    let year = date.year() as u16;
    let month = date.month();
    let day = date.day();
    if month < 4 || (month == 4 && day < 6) {
        year - 1
    } else {
        year
    }
}

impl std::fmt::Display for TaxPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let end_short = (self.0 + 1) % 100;
        write!(f, "{}/{:02}", self.0, end_short)
    }
}

impl Serialize for TaxPeriod {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let end_short = (self.0 + 1) % 100;
        serializer.serialize_str(&format!("{}/{:02}", self.0, end_short))
    }
}

impl<'de> Deserialize<'de> for TaxPeriod {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let parts: Vec<&str> = s.split('/').collect();
        if parts.len() != 2 {
            return Err(serde::de::Error::custom(format!(
                "invalid tax period format: expected 'YYYY/YY', got '{s}'"
            )));
        }
        let start: u16 = parts[0]
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid start year: '{}'", parts[0])))?;
        let end_short: u16 = parts[1]
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid end year: '{}'", parts[1])))?;

        let expected_end = (start + 1) % 100;
        if end_short != expected_end {
            return Err(serde::de::Error::custom(format!(
                "tax years must be consecutive: '{s}' should end with '{expected_end:02}', not '{end_short:02}'"
            )));
        }

        TaxPeriod::new(start).map_err(serde::de::Error::custom)
    }
}

impl JsonSchema for TaxPeriod {
    fn schema_name() -> String {
        "TaxPeriod".to_owned()
    }

    fn json_schema(generator: &mut schemars::r#gen::SchemaGenerator) -> schemars::schema::Schema {
        let mut schema = generator.subschema_for::<String>().into_object();
        schema.metadata().description =
            Some("UK tax year in 'YYYY/YY' format (e.g., '2023/24')".to_owned());
        schema.string().pattern = Some(r"^\d{4}/\d{2}$".to_owned());
        schema.into()
    }
}

/// A transaction with amounts in their original currency.
/// Used for parsing and JSON I/O.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Transaction {
    pub date: NaiveDate,
    #[serde(deserialize_with = "uppercase_ticker")]
    pub ticker: String,
    #[serde(flatten)]
    pub operation: Operation<CurrencyAmount>,
}

/// A transaction with all monetary amounts converted to GBP.
///
/// This is the "enriched transaction" the matching engine consumes. `sequence`
/// carries the original parse order so that same-date transactions have a
/// well-defined, deterministic tiebreak throughout the engine.
#[derive(Debug, Clone, PartialEq)]
pub struct GbpTransaction {
    pub date: NaiveDate,
    pub ticker: String,
    pub operation: Operation<Decimal>,
    pub sequence: usize,
    /// Set when the FX rate for this transaction's (date, currency) could not
    /// be resolved. When set, all monetary fields of `operation` are zeroed
    /// and the transaction is excluded from matching; any disposal that would
    /// have consumed it is marked `is_incomplete`.
    pub fx_error: Option<String>,
}

impl GbpTransaction {
    pub fn tax_year(&self) -> TaxPeriod {
        TaxPeriod::from_date(self.date)
    }
}

impl Transaction {
    /// Convert this transaction to a GBP-normalized transaction.
    ///
    /// Unlike the native-currency form, this never fails: a missing FX rate
    /// taints the transaction (`fx_error` set, monetary fields zeroed) rather
    /// than aborting the whole run, per the engine's total-function contract.
    pub fn to_gbp(&self, sequence: usize, fx_cache: Option<&FxCache>) -> GbpTransaction {
        let date = self.date;
        let mut fx_error: Option<String> = None;
        let mut fail = |currency: &str| {
            fx_error.get_or_insert_with(|| {
                format!(
                    "FX_UNAVAILABLE: no rate for {currency} in {}-{:02}",
                    date.year(),
                    date.month()
                )
            });
            Decimal::ZERO
        };

        let operation = match &self.operation {
            Operation::Buy {
                amount,
                price,
                fees,
            } => Operation::Buy {
                amount: *amount,
                price: amount_to_gbp(price, date, fx_cache, &mut fail),
                fees: amount_to_gbp(fees, date, fx_cache, &mut fail),
            },
            Operation::Sell {
                amount,
                price,
                fees,
            } => Operation::Sell {
                amount: *amount,
                price: amount_to_gbp(price, date, fx_cache, &mut fail),
                fees: amount_to_gbp(fees, date, fx_cache, &mut fail),
            },
            Operation::Dividend {
                amount,
                total_value,
                tax_paid,
            } => Operation::Dividend {
                amount: *amount,
                total_value: amount_to_gbp(total_value, date, fx_cache, &mut fail),
                tax_paid: amount_to_gbp(tax_paid, date, fx_cache, &mut fail),
            },
            Operation::CapReturn {
                amount,
                total_value,
                fees,
            } => Operation::CapReturn {
                amount: *amount,
                total_value: amount_to_gbp(total_value, date, fx_cache, &mut fail),
                fees: amount_to_gbp(fees, date, fx_cache, &mut fail),
            },
            Operation::Interest { total_value } => Operation::Interest {
                total_value: amount_to_gbp(total_value, date, fx_cache, &mut fail),
            },
            Operation::Tax { total_value } => Operation::Tax {
                total_value: amount_to_gbp(total_value, date, fx_cache, &mut fail),
            },
            Operation::Fee { total_value } => Operation::Fee {
                total_value: amount_to_gbp(total_value, date, fx_cache, &mut fail),
            },
            Operation::Transfer { amount } => Operation::Transfer { amount: *amount },
            Operation::Split { ratio } => Operation::Split { ratio: *ratio },
            Operation::Unsplit { ratio } => Operation::Unsplit { ratio: *ratio },
        };

        GbpTransaction {
            date: self.date,
            ticker: self.ticker.clone(),
            operation,
            sequence,
            fx_error,
        }
    }
}

/// Convert a `CurrencyAmount` to GBP, routing failures through `on_missing`
/// instead of returning early, so every money field on the operation is still
/// visited (and the first failure recorded).
fn amount_to_gbp(
    amount: &CurrencyAmount,
    date: NaiveDate,
    fx_cache: Option<&FxCache>,
    on_missing: &mut impl FnMut(&str) -> Decimal,
) -> Decimal {
    if amount.is_gbp() {
        return amount.amount;
    }

    let Some(cache) = fx_cache else {
        return on_missing(amount.code());
    };

    match amount.to_gbp(date, cache) {
        Ok(v) => v,
        Err(_) => on_missing(amount.code()),
    }
}

/// Convert a slice of transactions to GBP-normalized transactions, assigning
/// each its parse-order sequence number.
pub fn transactions_to_gbp(
    transactions: &[Transaction],
    fx_cache: Option<&FxCache>,
) -> Vec<GbpTransaction> {
    transactions
        .iter()
        .enumerate()
        .map(|(i, tx)| tx.to_gbp(i, fx_cache))
        .collect()
}

/// A financial operation, generic over the monetary amount type.
///
/// - `Operation<CurrencyAmount>`: amounts in original currency (for I/O)
/// - `Operation<Decimal>`: amounts in GBP (for calculations)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Operation<M: Default> {
    Buy {
        amount: Decimal,
        price: M,
        #[serde(default)]
        fees: M,
    },
    Sell {
        amount: Decimal,
        price: M,
        #[serde(default)]
        fees: M,
    },
    Dividend {
        amount: Decimal,
        total_value: M,
        #[serde(default)]
        tax_paid: M,
    },
    /// Return of capital. Reduces the holding's value without disposing of
    /// shares; carried through untouched (no cost-basis adjustment), matching
    /// the treatment of DIVIDEND and INTEREST.
    #[serde(rename = "CAPRETURN")]
    CapReturn {
        amount: Decimal,
        total_value: M,
        #[serde(default)]
        fees: M,
    },
    /// Passes through untouched; income tax on interest is out of scope.
    Interest {
        total_value: M,
    },
    /// Withholding or other tax paid; recorded but not part of CGT matching.
    Tax {
        total_value: M,
    },
    /// Account-level fee unrelated to a specific trade.
    Fee {
        total_value: M,
    },
    /// Movement of shares between accounts. Excluded from CGT matching; does
    /// not carry cost basis into a new pool (see DESIGN.md Open Questions).
    Transfer {
        amount: Decimal,
    },
    Split {
        ratio: Decimal,
    },
    Unsplit {
        ratio: Decimal,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub enum PoolEventKind {
    /// Unreserved BUY quantity added to the pool.
    Acquisition,
    /// SELL consuming pool quantity under the Section 104 rule.
    Disposal,
    /// Retroactive quantity rescale from a SPLIT transaction.
    Split,
    /// Retroactive quantity rescale from an UNSPLIT transaction.
    Unsplit,
}

/// One append-only entry in a Section 104 pool's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PoolEvent {
    pub date: NaiveDate,
    pub event_kind: PoolEventKind,
    #[serde(serialize_with = "decimal_money::serialize")]
    pub quantity_delta: Decimal,
    #[serde(serialize_with = "decimal_money::serialize")]
    pub cost_or_proceeds_delta: Decimal,
    #[serde(serialize_with = "decimal_money::serialize")]
    pub balance_quantity_after: Decimal,
    #[serde(serialize_with = "decimal_money::serialize")]
    pub balance_cost_after: Decimal,
    pub transaction_sequence: usize,
}

/// The Section 104 pool for one symbol: a moving-average cost basis over the
/// fungible shares not otherwise claimed by the same-day or 30-day rules.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct Section104Holding {
    pub ticker: String,
    pub quantity: Decimal,
    #[serde(serialize_with = "decimal_money::serialize")]
    pub total_cost: Decimal,
    #[serde(default)]
    pub history: Vec<PoolEvent>,
}

impl Section104Holding {
    /// `total_cost / quantity`, or zero when the pool is empty.
    pub fn average_cost(&self) -> Decimal {
        if self.quantity != Decimal::ZERO {
            self.total_cost / self.quantity
        } else {
            Decimal::ZERO
        }
    }
}

/// Enumeration of HMRC share matching rules, applied in this order.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, JsonSchema)]
pub enum MatchRule {
    SameDay,
    BedAndBreakfast,
    Section104,
    /// A disposal exceeding prior holdings, covered by a future acquisition
    /// within the 30-day window that arrived after the pool was exhausted.
    ShortSell,
}

/// How a disposal (or portion of it) was matched to an acquisition.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct Match {
    pub rule: MatchRule,
    pub quantity: Decimal,
    #[serde(serialize_with = "decimal_money::serialize")]
    pub allowable_cost: Decimal,
    #[serde(serialize_with = "decimal_money::serialize")]
    pub gain_or_loss: Decimal,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acquisition_date: Option<NaiveDate>,
}

/// A sale event that triggers CGT calculation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct Disposal {
    pub id: String,
    pub date: NaiveDate,
    pub ticker: String,
    /// Total quantity disposed of (matched + unmatched).
    pub quantity: Decimal,
    /// Gross proceeds before sale fees, for the matched quantity.
    #[serde(serialize_with = "decimal_money::serialize")]
    pub gross_proceeds: Decimal,
    /// Net proceeds after sale fees, for the matched quantity.
    #[serde(serialize_with = "decimal_money::serialize")]
    pub proceeds: Decimal,
    pub matches: Vec<Match>,
    /// True when matched quantity is less than disposed quantity: the pool
    /// was insufficient and no short-sell acquisition covered the remainder,
    /// or the disposal's own FX rate could not be resolved.
    pub is_incomplete: bool,
    pub unmatched_quantity: Decimal,
}

/// Summary of CGT activity within a single UK tax year.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct TaxYearSummary {
    pub period: TaxPeriod,
    pub disposals: Vec<Disposal>,
    #[serde(serialize_with = "decimal_money::serialize")]
    pub total_gain: Decimal,
    #[serde(serialize_with = "decimal_money::serialize")]
    pub total_loss: Decimal,
    #[serde(serialize_with = "decimal_money::serialize")]
    pub net_gain: Decimal,
    #[serde(serialize_with = "decimal_money::serialize")]
    pub aea_applied: Decimal,
    #[serde(serialize_with = "decimal_money::serialize")]
    pub taxable: Decimal,
    pub features: TaxYearFeatures,
}

/// Year-specific adjustments layered on top of the plain gain/loss totals.
/// Only the 2024/25 mid-year rate change populates these fields today, but
/// the shape accommodates future rate-change years.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct TaxYearFeatures {
    /// True iff a disposal on/after a rate-change event date exists and the
    /// year's net gain exceeds its AEA (HMRC SA108 Box 51).
    pub box51_adjustment_required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(serialize_with = "decimal_money::serialize_opt")]
    pub gains_before_rate_change: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(serialize_with = "decimal_money::serialize_opt")]
    pub gains_after_rate_change: Option<Decimal>,
}

/// The complete CGT calculation output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, JsonSchema)]
pub struct TaxReport {
    pub tax_years: Vec<TaxYearSummary>,
    pub holdings: Vec<Section104Holding>,
}
