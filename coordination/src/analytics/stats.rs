//! Price and mechanism statistics over completed pairs.

use serde::{Deserialize, Serialize};

use crate::negotiation::{Mechanism, Pair};

/// Summary statistics over final prices.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceStats {
    pub count: usize,
    pub min: u64,
    pub max: u64,
    pub mean: f64,
    /// Mean of the two middle prices when `count` is even.
    pub median: f64,
}

impl PriceStats {
    /// `None` when there are no prices.
    pub fn from_prices(prices: &[u64]) -> Option<Self> {
        if prices.is_empty() {
            return None;
        }
        let mut sorted = prices.to_vec();
        sorted.sort_unstable();

        let count = sorted.len();
        let sum: u128 = sorted.iter().map(|&p| u128::from(p)).sum();
        let mean = sum as f64 / count as f64;
        let mid = count / 2;
        let median = if count % 2 == 0 {
            (sorted[mid - 1] as f64 + sorted[mid] as f64) / 2.0
        } else {
            sorted[mid] as f64
        };

        Some(Self {
            count,
            min: sorted[0],
            max: sorted[count - 1],
            mean,
            median,
        })
    }
}

/// How pairs ended up with their mechanism.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MechanismAdoption {
    pub shotgun: usize,
    pub timed_auction: usize,
    /// Still choosing.
    pub undecided: usize,
    /// Both sides voted the same way.
    pub agreed: usize,
    /// Settled by a coin flip.
    pub randomly_resolved: usize,
    /// Set for the whole session without a pair vote.
    pub assigned: usize,
}

impl MechanismAdoption {
    pub fn from_pairs<'a>(pairs: impl IntoIterator<Item = &'a Pair>) -> Self {
        pairs
            .into_iter()
            .fold(Self::default(), |mut adoption, pair| {
                match pair.mechanism {
                    Some(Mechanism::Shotgun) => adoption.shotgun += 1,
                    Some(Mechanism::TimedAuction) => adoption.timed_auction += 1,
                    None => adoption.undecided += 1,
                }
                match (pair.mechanism, pair.mechanism_agreed) {
                    (_, Some(true)) => adoption.agreed += 1,
                    (_, Some(false)) => adoption.randomly_resolved += 1,
                    (Some(_), None) => adoption.assigned += 1,
                    (None, None) => {}
                }
                adoption
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::negotiation::PairMember;
    use crate::state::Side;
    use chrono::Utc;

    fn pair(mechanism: Option<Mechanism>, agreed: Option<bool>) -> Pair {
        let member = |id: &str, side| PairMember {
            id: id.to_string(),
            name: id.to_string(),
            side,
        };
        let mut pair = Pair::new(
            Pair::new_id(),
            member("a", Side::A),
            member("b", Side::B),
            mechanism,
            Utc::now(),
        );
        pair.mechanism_agreed = agreed;
        pair
    }

    #[test]
    fn test_price_stats_odd() {
        let stats = PriceStats::from_prices(&[3_000_000, 1_000_000, 2_000_000]).unwrap();
        assert_eq!(stats.min, 1_000_000);
        assert_eq!(stats.max, 3_000_000);
        assert_eq!(stats.mean, 2_000_000.0);
        assert_eq!(stats.median, 2_000_000.0);
    }

    #[test]
    fn test_price_stats_even_median() {
        let stats = PriceStats::from_prices(&[4, 1, 3, 2]).unwrap();
        assert_eq!(stats.median, 2.5);
        assert_eq!(stats.mean, 2.5);
        assert_eq!(stats.count, 4);
    }

    #[test]
    fn test_price_stats_empty() {
        assert!(PriceStats::from_prices(&[]).is_none());
    }

    #[test]
    fn test_mechanism_adoption() {
        let pairs = vec![
            pair(Some(Mechanism::Shotgun), Some(true)),
            pair(Some(Mechanism::TimedAuction), Some(false)),
            pair(Some(Mechanism::TimedAuction), None),
            pair(None, None),
        ];
        let adoption = MechanismAdoption::from_pairs(&pairs);
        assert_eq!(
            adoption,
            MechanismAdoption {
                shotgun: 1,
                timed_auction: 2,
                undecided: 1,
                agreed: 1,
                randomly_resolved: 1,
                assigned: 1,
            }
        );
    }
}
