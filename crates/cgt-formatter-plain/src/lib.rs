//! Plain text formatter for CGT tax reports.

use cgt_core::{CgtError, Disposal, MatchRule, Operation, TaxReport, Transaction};
use cgt_format::{
    CurrencyFormatter, format_currency, format_date, format_decimal, format_tax_year,
};
use rust_decimal::Decimal;
use std::fmt::Write;

/// Shared formatter instance for currency formatting.
fn formatter() -> CurrencyFormatter {
    CurrencyFormatter::uk()
}

/// Format a tax report as plain text.
pub fn format(report: &TaxReport, transactions: &[Transaction]) -> Result<String, CgtError> {
    let mut out = String::new();

    // SUMMARY
    let _ = writeln!(out, "# SUMMARY\n");
    let _ = writeln!(
        out,
        "{:<12}{:<12}{:<12}{:<14}Taxable gain",
        "Tax year", "Gain", "Proceeds", "Exemption"
    );
    let _ = writeln!(
        out,
        "=============================================================="
    );

    for year in &report.tax_years {
        let proceeds: Decimal = year.disposals.iter().map(|d| d.proceeds).sum();

        let _ = writeln!(
            out,
            "{:<12}{:<12}{:<12}{:<14}{}",
            format_tax_year(year.period.start_year()),
            format_currency(year.net_gain),
            format_currency(proceeds),
            format_currency(year.aea_applied),
            format_currency(year.taxable)
        );

        if year.features.box51_adjustment_required {
            let _ = writeln!(
                out,
                "{:<12}  SA108 Box 51 adjustment required (gains before 30 Oct 2024: {}, on or after: {})",
                "",
                format_currency(year.features.gains_before_rate_change.unwrap_or(Decimal::ZERO)),
                format_currency(year.features.gains_after_rate_change.unwrap_or(Decimal::ZERO))
            );
        }
    }

    // TAX YEAR DETAILS
    let _ = writeln!(out, "\n# TAX YEAR DETAILS");

    for year in &report.tax_years {
        let _ = writeln!(out, "\n## {}\n", format_tax_year(year.period.start_year()));

        // Sort disposals by date, then by ticker for deterministic output
        let mut disposals: Vec<_> = year.disposals.iter().collect();
        disposals.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.ticker.cmp(&b.ticker)));

        for (i, disposal) in disposals.iter().enumerate() {
            format_disposal(&mut out, i + 1, disposal);
        }
    }

    // HOLDINGS
    let _ = writeln!(out, "\n# HOLDINGS\n");
    let mut active: Vec<_> = report
        .holdings
        .iter()
        .filter(|h| h.quantity > Decimal::ZERO)
        .collect();
    active.sort_by(|a, b| a.ticker.cmp(&b.ticker));
    if active.is_empty() {
        let _ = writeln!(out, "NONE");
    } else {
        for h in active {
            let _ = writeln!(
                out,
                "{}: {} units at £{} avg cost",
                h.ticker,
                format_decimal(h.quantity),
                format_decimal(h.average_cost().round_dp(2))
            );
        }
    }

    // TRANSACTIONS
    let _ = writeln!(out, "\n# TRANSACTIONS\n");
    let mut txns: Vec<_> = transactions
        .iter()
        .filter(|t| matches!(t.operation, Operation::Buy { .. } | Operation::Sell { .. }))
        .collect();
    txns.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.ticker.cmp(&b.ticker)));

    for t in txns {
        match &t.operation {
            Operation::Buy {
                amount,
                price,
                fees,
            } => {
                let _ = writeln!(
                    out,
                    "{} BUY {} {} @ {} ({} fees)",
                    format_date(t.date),
                    format_decimal(*amount),
                    t.ticker,
                    formatter().format_unit(price),
                    formatter().format_unit(fees)
                );
            }
            Operation::Sell {
                amount,
                price,
                fees,
            } => {
                let _ = writeln!(
                    out,
                    "{} SELL {} {} @ {} ({} fees)",
                    format_date(t.date),
                    format_decimal(*amount),
                    t.ticker,
                    formatter().format_unit(price),
                    formatter().format_unit(fees)
                );
            }
            _ => {}
        }
    }

    // ASSET EVENTS
    let mut events: Vec<_> = transactions
        .iter()
        .filter(|t| {
            matches!(
                t.operation,
                Operation::Dividend { .. }
                    | Operation::CapReturn { .. }
                    | Operation::Interest { .. }
                    | Operation::Tax { .. }
                    | Operation::Fee { .. }
                    | Operation::Transfer { .. }
                    | Operation::Split { .. }
                    | Operation::Unsplit { .. }
            )
        })
        .collect();
    events.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.ticker.cmp(&b.ticker)));

    if !events.is_empty() {
        let _ = writeln!(out, "\n# ASSET EVENTS\n");
        for t in events {
            match &t.operation {
                Operation::Dividend {
                    amount,
                    total_value,
                    ..
                } => {
                    let _ = writeln!(
                        out,
                        "{} DIVIDEND {} {} {}",
                        format_date(t.date),
                        t.ticker,
                        format_decimal(*amount),
                        formatter().format_amount(total_value)
                    );
                }
                Operation::CapReturn {
                    amount,
                    total_value,
                    ..
                } => {
                    let _ = writeln!(
                        out,
                        "{} CAPRETURN {} {} {}",
                        format_date(t.date),
                        t.ticker,
                        format_decimal(*amount),
                        formatter().format_amount(total_value)
                    );
                }
                Operation::Interest { total_value } => {
                    let _ = writeln!(
                        out,
                        "{} INTEREST {} {}",
                        format_date(t.date),
                        t.ticker,
                        formatter().format_amount(total_value)
                    );
                }
                Operation::Tax { total_value } => {
                    let _ = writeln!(
                        out,
                        "{} TAX {} {}",
                        format_date(t.date),
                        t.ticker,
                        formatter().format_amount(total_value)
                    );
                }
                Operation::Fee { total_value } => {
                    let _ = writeln!(
                        out,
                        "{} FEE {} {}",
                        format_date(t.date),
                        t.ticker,
                        formatter().format_amount(total_value)
                    );
                }
                Operation::Transfer { amount } => {
                    let _ = writeln!(
                        out,
                        "{} TRANSFER {} {}",
                        format_date(t.date),
                        t.ticker,
                        format_decimal(*amount)
                    );
                }
                Operation::Split { ratio } => {
                    let _ = writeln!(
                        out,
                        "{} SPLIT {} {}",
                        format_date(t.date),
                        t.ticker,
                        format_decimal(*ratio)
                    );
                }
                Operation::Unsplit { ratio } => {
                    let _ = writeln!(
                        out,
                        "{} UNSPLIT {} {}",
                        format_date(t.date),
                        t.ticker,
                        format_decimal(*ratio)
                    );
                }
                _ => {}
            }
        }
    }

    Ok(out.trim_end().to_string() + "\n")
}

fn format_disposal(out: &mut String, index: usize, disposal: &Disposal) {
    let total_gain: Decimal = disposal.matches.iter().map(|m| m.gain_or_loss).sum();
    let gain_type = if total_gain >= Decimal::ZERO {
        "GAIN"
    } else {
        "LOSS"
    };

    let _ = writeln!(
        out,
        "{}) SELL {} {} on {} - {} {}",
        index,
        format_decimal(disposal.quantity),
        disposal.ticker,
        format_date(disposal.date),
        gain_type,
        format_currency(total_gain.abs())
    );

    if disposal.is_incomplete {
        let _ = writeln!(
            out,
            "   INCOMPLETE: {} shares unmatched (missing FX rate or insufficient prior holding)",
            format_decimal(disposal.unmatched_quantity)
        );
    }

    for m in &disposal.matches {
        match m.rule {
            MatchRule::SameDay => {
                let _ = writeln!(out, "   Same Day: {} shares", format_decimal(m.quantity));
            }
            MatchRule::BedAndBreakfast => {
                if let Some(date) = m.acquisition_date {
                    let _ = writeln!(
                        out,
                        "   B&B: {} shares from {}",
                        format_decimal(m.quantity),
                        format_date(date)
                    );
                }
            }
            MatchRule::Section104 => {
                let cost_per_share = if m.quantity != Decimal::ZERO {
                    m.allowable_cost / m.quantity
                } else {
                    Decimal::ZERO
                };
                let _ = writeln!(
                    out,
                    "   Section 104: {} shares @ £{}",
                    format_decimal(m.quantity),
                    format_decimal(cost_per_share.round_dp(2))
                );
            }
            MatchRule::ShortSell => {
                if let Some(date) = m.acquisition_date {
                    let _ = writeln!(
                        out,
                        "   Short sale covered: {} shares from {}",
                        format_decimal(m.quantity),
                        format_date(date)
                    );
                } else {
                    let _ = writeln!(
                        out,
                        "   Short sale covered: {} shares",
                        format_decimal(m.quantity)
                    );
                }
            }
        }
    }

    if disposal.quantity != Decimal::ZERO {
        let unit_price = disposal.gross_proceeds / disposal.quantity;
        let _ = writeln!(
            out,
            "   Proceeds: {} × £{} = {}",
            format_decimal(disposal.quantity),
            format_decimal(unit_price.round_dp(4)),
            format_currency(disposal.gross_proceeds)
        );
    }

    let total_cost: Decimal = disposal.matches.iter().map(|m| m.allowable_cost).sum();
    let _ = writeln!(out, "   Cost: {}", format_currency(total_cost));
    let _ = writeln!(out, "   Result: {}\n", format_currency(total_gain));
}
