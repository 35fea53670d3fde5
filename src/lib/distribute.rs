//! Spread a lifetime target over the editable months of an allocation

use std::fmt;
use std::str::FromStr;

use crate::lib::{allocation::MonthlyTargetMap, month::MonthBucket};

/// Shape of a distribution over time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// same amount every month
    Even,
    /// heavier in the middle months
    Weighted,
    /// decreasing over time
    Frontloaded,
    /// increasing over time
    Backloaded,
}

impl Strategy {
    pub const ALL: [Strategy; 4] = [
        Strategy::Even,
        Strategy::Weighted,
        Strategy::Frontloaded,
        Strategy::Backloaded,
    ];

    /// Relative weight of month `i` out of `n`
    fn weight(self, i: usize, n: usize) -> u128 {
        let w = match self {
            Strategy::Even => 1,
            Strategy::Weighted => (i + 1).min(n - i),
            Strategy::Frontloaded => n - i,
            Strategy::Backloaded => i + 1,
        };
        w as u128
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Strategy::Even => "even",
            Strategy::Weighted => "weighted",
            Strategy::Frontloaded => "frontloaded",
            Strategy::Backloaded => "backloaded",
        };
        write!(f, "{}", name)
    }
}

impl FromStr for Strategy {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, ()> {
        match s {
            "even" => Ok(Strategy::Even),
            "weighted" => Ok(Strategy::Weighted),
            "frontloaded" => Ok(Strategy::Frontloaded),
            "backloaded" => Ok(Strategy::Backloaded),
            _ => Err(()),
        }
    }
}

/// Distribute `total` over `months` so that the values sum to `total` exactly
///
/// Each month first receives the integer part of its share, then the units
/// left over go one at a time to the months with the largest fractional
/// parts, earlier months first on ties.
/// With no month at all, nothing is distributed.
pub fn distribute(total: u64, months: &[MonthBucket], strategy: Strategy) -> MonthlyTargetMap {
    let n = months.len();
    if n == 0 {
        return MonthlyTargetMap::new();
    }
    let weights = (0..n).map(|i| strategy.weight(i, n)).collect::<Vec<_>>();
    let sum_weights: u128 = weights.iter().sum();
    let mut shares = Vec::with_capacity(n);
    let mut distributed = 0u128;
    for (i, w) in weights.iter().enumerate() {
        let scaled = total as u128 * w;
        let share = scaled / sum_weights;
        distributed += share;
        shares.push((i, share, scaled % sum_weights));
    }
    let mut leftover = total as u128 - distributed;
    let mut order = (0..n).collect::<Vec<_>>();
    order.sort_by(|a, b| shares[*b].2.cmp(&shares[*a].2).then(a.cmp(b)));
    for i in order {
        if leftover == 0 {
            break;
        }
        shares[i].1 += 1;
        leftover -= 1;
    }
    shares
        .into_iter()
        .map(|(i, share, _)| (months[i], share as u64))
        .collect()
}

#[cfg(test)]
#[rustfmt::skip]
mod test {
    use super::*;
    use crate::lib::{date::Date, month::months_between};

    fn fy_months(count: usize) -> Vec<MonthBucket> {
        months_between("2025-04-01".parse::<Date>().unwrap(), "2026-03-31".parse::<Date>().unwrap())
            .take(count)
            .collect()
    }

    fn values(map: &MonthlyTargetMap) -> Vec<u64> {
        map.values().copied().collect()
    }

    #[test]
    fn even_gives_remainder_to_earliest() {
        let months = fy_months(9);
        assert_eq!(values(&distribute(100, &months, Strategy::Even)), vec![12, 11, 11, 11, 11, 11, 11, 11, 11]);
        assert_eq!(values(&distribute(5, &months, Strategy::Even)), vec![1, 1, 1, 1, 1, 0, 0, 0, 0]);
        assert_eq!(values(&distribute(0, &months, Strategy::Even)), vec![0; 9]);
    }

    #[test]
    fn shapes() {
        let months = fy_months(4);
        // weights 1 2 3 4
        assert_eq!(values(&distribute(100, &months, Strategy::Backloaded)), vec![10, 20, 30, 40]);
        assert_eq!(values(&distribute(100, &months, Strategy::Frontloaded)), vec![40, 30, 20, 10]);
        // weights 1 2 2 1
        assert_eq!(values(&distribute(60, &months, Strategy::Weighted)), vec![10, 20, 20, 10]);
    }

    #[test]
    fn always_sums_to_total() {
        for count in 1..=12 {
            let months = fy_months(count);
            for strategy in Strategy::ALL {
                for total in [0, 1, 7, 100, 1013, u64::MAX] {
                    let map = distribute(total, &months, strategy);
                    assert_eq!(map.len(), count);
                    let sum = map.values().fold(0u128, |a, v| a + *v as u128);
                    assert_eq!(sum, total as u128, "{} over {} months with {}", total, count, strategy);
                }
            }
        }
    }

    #[test]
    fn nothing_to_fill() {
        assert!(distribute(10, &[], Strategy::Even).is_empty());
    }

    #[test]
    fn strategy_names() {
        for strategy in Strategy::ALL {
            assert_eq!(strategy.to_string().parse::<Strategy>(), Ok(strategy));
        }
        assert!("even_fallback".parse::<Strategy>().is_err());
    }
}
