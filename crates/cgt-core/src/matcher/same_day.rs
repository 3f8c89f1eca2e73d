//! Same-day rule (TCGA92/S105(1)): a disposal is matched first against any
//! acquisitions of the same security made on the same date, before any other
//! rule is considered.

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::BuyLeg;

/// Claim available quantity from same-day BUYs, earliest-in-sequence first.
/// Mutates `buys` in place (reserving claimed quantity) and returns the
/// `(buy index, quantity claimed)` pairs so the caller can build `Match`
/// entries with each buy's per-share cost.
pub fn claim(
    buys: &mut [BuyLeg],
    sell_date: NaiveDate,
    remaining: &mut Decimal,
) -> Vec<(usize, Decimal)> {
    let mut claims = Vec::new();
    if *remaining <= Decimal::ZERO {
        return claims;
    }

    let mut order: Vec<usize> = buys
        .iter()
        .enumerate()
        .filter(|(_, b)| b.date == sell_date && b.available() > Decimal::ZERO)
        .map(|(i, _)| i)
        .collect();
    order.sort_by_key(|&i| buys[i].sequence);

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
    fn claims_only_matching_date() {
        let d1 = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();
        let d2 = NaiveDate::from_ymd_opt(2023, 6, 2).unwrap();
        let mut buys = vec![leg(d1, 0, dec!(10)), leg(d2, 1, dec!(10))];
        let mut remaining = dec!(5);
        let claims = claim(&mut buys, d1, &mut remaining);
        assert_eq!(claims, vec![(0, dec!(5))]);
        assert_eq!(remaining, Decimal::ZERO);
        assert_eq!(buys[0].reserved, dec!(5));
        assert_eq!(buys[1].reserved, Decimal::ZERO);
    }

    #[test]
    fn claims_across_multiple_same_day_buys_in_sequence_order() {
        let d1 = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();
        let mut buys = vec![leg(d1, 1, dec!(5)), leg(d1, 0, dec!(5))];
        let mut remaining = dec!(7);
        let claims = claim(&mut buys, d1, &mut remaining);
        // sequence 0 (index 1) claimed first, then sequence 1 (index 0)
        assert_eq!(claims, vec![(1, dec!(5)), (0, dec!(2))]);
        assert_eq!(remaining, Decimal::ZERO);
    }

    #[test]
    fn no_claim_when_nothing_outstanding() {
        let d1 = NaiveDate::from_ymd_opt(2023, 6, 1).unwrap();
        let mut buys = vec![leg(d1, 0, dec!(10))];
        let mut remaining = Decimal::ZERO;
        let claims = claim(&mut buys, d1, &mut remaining);
        assert!(claims.is_empty());
    }
}
