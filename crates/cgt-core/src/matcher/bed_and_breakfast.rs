//! 30-day rule (TCGA92/S106A(5), the "bed and breakfast" rule): after the
//! same-day rule, a disposal is matched against acquisitions of the same
//! security in the 30 days *following* the disposal, earliest first.

use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;

use super::BuyLeg;

const WINDOW_DAYS: u64 = 30;

/// Claim available quantity from BUYs within the 30-day window after
/// `sell_date`, earliest date first and earliest sequence first within a
/// date. Mutates `buys` in place and returns `(buy index, quantity claimed)`.
pub fn claim(
    buys: &mut [BuyLeg],
    sell_date: NaiveDate,
    remaining: &mut Decimal,
) -> Vec<(usize, Decimal)> {
    let mut claims = Vec::new();
    if *remaining <= Decimal::ZERO {
        return claims;
    }
    let Some(window_end) = sell_date.checked_add_days(Days::new(WINDOW_DAYS)) else {
        return claims;
    };

    let mut order: Vec<usize> = buys
        .iter()
        .enumerate()
        .filter(|(_, b)| b.date > sell_date && b.date <= window_end && b.available() > Decimal::ZERO)
        .map(|(i, _)| i)
        .collect();
    order.sort_by_key(|&i| (buys[i].date, buys[i].sequence));

    for i in order {
        if *remaining <= Decimal::ZERO {
            break;
        }
        let avail = buys[i].available();
        let claimed = avail.min(*remaining);
        buys[i].reserved += claimed;
        *remaining -= claimed;
        claims.push((i, claimed));
    }

    claims
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn leg(date: NaiveDate, seq: usize, quantity: Decimal) -> BuyLeg {
        BuyLeg {
            sequence: seq,
            date,
            quantity,
            unit_cost: dec!(10),
            reserved: Decimal::ZERO,
        }
    }

    #[test]
    fn claims_within_window_earliest_first() {
        let sell = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();
        let within = NaiveDate::from_ymd_opt(2023, 6, 10).unwrap();
        let later_within = NaiveDate::from_ymd_opt(2023, 6, 20).unwrap();
        let outside = NaiveDate::from_ymd_opt(2023, 7, 5).unwrap();
        let mut buys = vec![
            leg(later_within, 1, dec!(5)),
            leg(within, 0, dec!(5)),
            leg(outside, 2, dec!(100)),
        ];
        let mut remaining = dec!(8);
        let claims = claim(&mut buys, sell, &mut remaining);
        assert_eq!(claims, vec![(1, dec!(5)), (0, dec!(3))]);
        assert_eq!(remaining, Decimal::ZERO);
        assert_eq!(buys[2].reserved, Decimal::ZERO);
    }

    #[test]
    fn ignores_buys_on_or_before_sell_date() {
        let sell = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();
        let mut buys = vec![leg(sell, 0, dec!(10))];
        let mut remaining = dec!(5);
        let claims = claim(&mut buys, sell, &mut remaining);
        assert!(claims.is_empty());
        assert_eq!(remaining, dec!(5));
    }

    #[test]
    fn window_boundary_is_inclusive_of_day_30() {
        let sell = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();
        let day30 = sell.checked_add_days(Days::new(30)).unwrap();
        let day31 = sell.checked_add_days(Days::new(31)).unwrap();
        let mut buys = vec![leg(day30, 0, dec!(5)), leg(day31, 1, dec!(5))];
        let mut remaining = dec!(10);
        let claims = claim(&mut buys, sell, &mut remaining);
        assert_eq!(claims, vec![(0, dec!(5))]);
        assert_eq!(remaining, dec!(5));
    }
}
