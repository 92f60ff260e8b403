//! Pure tally and plurality winner.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::options::VoteOption;

/// Per-option vote counts, iterated in declaration order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent, bound = "O: VoteOption")]
pub struct Tally<O: VoteOption>(BTreeMap<O, u32>);

impl<O: VoteOption> Tally<O> {
    /// A tally with every option of `O` at zero.
    pub fn zeroed() -> Self {
        Self(O::ALL.iter().map(|option| (*option, 0)).collect())
    }

    pub fn count(&self, option: O) -> u32 {
        self.0.get(&option).copied().unwrap_or(0)
    }

    pub fn total(&self) -> u32 {
        self.0.values().sum()
    }

    pub fn iter(&self) -> impl Iterator<Item = (O, u32)> + '_ {
        self.0.iter().map(|(option, count)| (*option, *count))
    }
}

impl<O: VoteOption> Default for Tally<O> {
    fn default() -> Self {
        Self::zeroed()
    }
}

/// Count `choices`, starting every option in `valid` at zero.
///
/// Choices outside `valid` are skipped.
pub fn tally<O: VoteOption>(choices: impl IntoIterator<Item = O>, valid: &[O]) -> Tally<O> {
    let mut counts: BTreeMap<O, u32> = valid.iter().map(|option| (*option, 0)).collect();
    for choice in choices {
        if let Some(count) = counts.get_mut(&choice) {
            *count += 1;
        }
    }
    Tally(counts)
}

/// Plurality winner; ties go to the earliest declared option.
///
/// Returns `None` only when the tally has no options at all.
pub fn winning_option<O: VoteOption>(tally: &Tally<O>) -> Option<O> {
    let mut best: Option<(O, u32)> = None;
    for (option, count) in tally.iter() {
        match best {
            Some((_, top)) if count <= top => {}
            _ => best = Some((option, count)),
        }
    }
    best.map(|(option, _)| option)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::voting::options::{FrameworkChoice, Remedy};

    #[test]
    fn test_tally_zero_initialises_every_option() {
        let counts = tally(Vec::<Remedy>::new(), Remedy::ALL);
        assert_eq!(counts.iter().count(), 4);
        assert_eq!(counts.total(), 0);
    }

    #[test]
    fn test_tally_counts() {
        use FrameworkChoice::*;
        let counts = tally(
            vec![Oppression, Partnership, Oppression, Dissolution, Oppression],
            FrameworkChoice::ALL,
        );
        assert_eq!(counts.count(Oppression), 3);
        assert_eq!(counts.count(Dissolution), 1);
        assert_eq!(counts.count(Partnership), 1);
        assert_eq!(counts.total(), 5);
    }

    #[test]
    fn test_tally_skips_choices_outside_valid_set() {
        let valid = [Remedy::Shotgun, Remedy::TimedAuction];
        let counts = tally(
            vec![
                Remedy::Buyout,
                Remedy::Shotgun,
                Remedy::Liquidation,
                Remedy::TimedAuction,
            ],
            &valid,
        );
        assert_eq!(counts.total(), 2);
        assert_eq!(counts.count(Remedy::Buyout), 0);
    }

    #[test]
    fn test_tally_total_matches_valid_entries() {
        // sum(counts) == number of ledger entries whose option is valid
        let ledgers: Vec<Vec<Remedy>> = vec![
            vec![],
            vec![Remedy::Buyout; 7],
            Remedy::ALL.iter().copied().cycle().take(13).collect(),
        ];
        let valid = [Remedy::Buyout, Remedy::Liquidation];
        for ledger in ledgers {
            let expected = ledger.iter().filter(|c| valid.contains(c)).count() as u32;
            assert_eq!(tally(ledger.clone(), &valid).total(), expected);
            assert_eq!(tally(ledger.clone(), Remedy::ALL).total(), ledger.len() as u32);
        }
    }

    #[test]
    fn test_winner_plurality() {
        let counts = tally(
            vec![Remedy::TimedAuction, Remedy::TimedAuction, Remedy::Buyout],
            Remedy::ALL,
        );
        assert_eq!(winning_option(&counts), Some(Remedy::TimedAuction));
    }

    #[test]
    fn test_winner_tie_goes_to_first_declared() {
        use FrameworkChoice::*;
        // {a:2, b:2, c:1} with order [a, b, c] -> a
        let counts = tally(
            vec![Dissolution, Oppression, Partnership, Dissolution, Oppression],
            FrameworkChoice::ALL,
        );
        for _ in 0..100 {
            assert_eq!(winning_option(&counts), Some(Oppression));
        }

        let counts = tally(
            vec![Remedy::Liquidation, Remedy::Shotgun],
            Remedy::ALL,
        );
        assert_eq!(winning_option(&counts), Some(Remedy::Shotgun));
    }

    #[test]
    fn test_winner_with_no_votes_is_first_option() {
        let counts = tally(Vec::<Remedy>::new(), Remedy::ALL);
        assert_eq!(winning_option(&counts), Some(Remedy::Buyout));
    }

    #[test]
    fn test_winner_of_empty_option_set() {
        let counts = tally(vec![Remedy::Shotgun], &[]);
        assert_eq!(winning_option(&counts), None);
    }

    #[test]
    fn test_tally_serializes_as_map() {
        let counts = tally(vec![Remedy::TimedAuction], Remedy::ALL);
        let json = serde_json::to_value(&counts).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "buyout": 0,
                "shotgun": 0,
                "timed_auction": 1,
                "liquidation": 0,
            })
        );
        let parsed: Tally<Remedy> = serde_json::from_value(json).unwrap();
        assert_eq!(parsed, counts);
    }
}
