//! Tax-Year Aggregator: groups disposals into UK tax years (6 April to 5
//! April), applies the Annual Exempt Amount, and flags the mid-year
//! rate-change split a tax year's SA108 return may require (HMRC Box 51,
//! introduced for 2024/25's 30 October rate change).

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use crate::config::Config;
use crate::models::{Disposal, TaxPeriod, TaxYearFeatures, TaxYearSummary};

/// Build one [`TaxYearSummary`] per tax year present in `disposals`,
/// consuming the disposal list.
pub fn build_summaries(disposals: Vec<Disposal>, config: &Config) -> Vec<TaxYearSummary> {
    let mut by_year: BTreeMap<TaxPeriod, Vec<Disposal>> = BTreeMap::new();
    for disposal in disposals {
        by_year
            .entry(TaxPeriod::from_date(disposal.date))
            .or_default()
            .push(disposal);
    }

    by_year
        .into_iter()
        .map(|(period, mut year_disposals)| {
            year_disposals.sort_by(|a, b| (a.date, &a.ticker).cmp(&(b.date, &b.ticker)));
            build_summary(period, year_disposals, config)
        })
        .collect()
}

fn build_summary(period: TaxPeriod, disposals: Vec<Disposal>, config: &Config) -> TaxYearSummary {
    let total_gain: Decimal = disposals
        .iter()
        .flat_map(|d| &d.matches)
        .map(|m| m.gain_or_loss)
        .filter(|g| *g > Decimal::ZERO)
        .sum();
    let total_loss: Decimal = disposals
        .iter()
        .flat_map(|d| &d.matches)
        .map(|m| m.gain_or_loss)
        .filter(|g| *g < Decimal::ZERO)
        .map(|g| -g)
        .sum();
    let net_gain = total_gain - total_loss;

    let aea = config
        .get_exemption(period.start_year())
        .unwrap_or(Decimal::ZERO);
    let gain_before_aea = net_gain.max(Decimal::ZERO);
    let aea_applied = aea.min(gain_before_aea);
    let taxable = (gain_before_aea - aea_applied).max(Decimal::ZERO);

    let features = build_features(period, &disposals, config, net_gain, aea);

    TaxYearSummary {
        period,
        disposals,
        total_gain,
        total_loss,
        net_gain,
        aea_applied,
        taxable,
        features,
    }
}

fn build_features(
    period: TaxPeriod,
    disposals: &[Disposal],
    config: &Config,
    net_gain: Decimal,
    aea: Decimal,
) -> TaxYearFeatures {
    let events = config.rate_change_events_for(period.start_year());
    let Some(event) = events.into_iter().next() else {
        return TaxYearFeatures::default();
    };

    let gains_before: Decimal = disposals
        .iter()
        .filter(|d| d.date < event.date)
        .flat_map(|d| &d.matches)
        .map(|m| m.gain_or_loss)
        .sum();
    let gains_after: Decimal = disposals
        .iter()
        .filter(|d| d.date >= event.date)
        .flat_map(|d| &d.matches)
        .map(|m| m.gain_or_loss)
        .sum();

    let has_post_change_disposal = disposals.iter().any(|d| d.date >= event.date);
    let box51_adjustment_required = has_post_change_disposal && net_gain > aea;

    TaxYearFeatures {
        box51_adjustment_required,
        gains_before_rate_change: Some(gains_before),
        gains_after_rate_change: Some(gains_after),
    }
}
