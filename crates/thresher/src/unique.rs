//! One best hit per distinct peptide sequence

use crate::hit::{Hit, Polarity};
use std::cmp::Ordering;
use std::collections::BTreeMap;

/// Rank two hits for the same sequence: lower q-value, then better score,
/// then smaller absolute adjusted mass error. `Less` means `a` is better.
pub fn rank(polarity: Polarity, a: &Hit, b: &Hit) -> Ordering {
    (a.q_value + 0.0)
        .total_cmp(&(b.q_value + 0.0))
        .then_with(|| polarity.order(a.score, b.score))
        .then_with(|| a.adjusted_ppm.abs().total_cmp(&b.adjusted_ppm.abs()))
}

/// Best target and best decoy hit for each sequence. Borrows hits, so the
/// same hit may be a winner at both the file and the batch level.
#[derive(Clone, Debug)]
pub struct SequenceWinners<'a> {
    polarity: Polarity,
    targets: BTreeMap<&'a str, &'a Hit>,
    decoys: BTreeMap<&'a str, &'a Hit>,
}

impl<'a> SequenceWinners<'a> {
    pub fn new(polarity: Polarity) -> Self {
        Self {
            polarity,
            targets: BTreeMap::new(),
            decoys: BTreeMap::new(),
        }
    }

    /// Insert `hit`, keeping whichever of it and the current winner ranks
    /// better. Exact ties keep the current winner.
    pub fn insert(&mut self, hit: &'a Hit) {
        let map = match hit.decoy {
            true => &mut self.decoys,
            false => &mut self.targets,
        };
        let polarity = self.polarity;
        map.entry(hit.sequence.as_str())
            .and_modify(|winner| {
                if rank(polarity, hit, winner) == Ordering::Less {
                    *winner = hit;
                }
            })
            .or_insert(hit);
    }

    /// Target winners, ordered by sequence
    pub fn targets(&self) -> impl Iterator<Item = &'a Hit> + '_ {
        self.targets.values().copied()
    }

    /// Decoy winners, ordered by sequence
    pub fn decoys(&self) -> impl Iterator<Item = &'a Hit> + '_ {
        self.decoys.values().copied()
    }

    pub fn target_count(&self) -> usize {
        self.targets.len()
    }

    pub fn decoy_count(&self) -> usize {
        self.decoys.len()
    }
}

impl<'a> Extend<&'a Hit> for SequenceWinners<'a> {
    fn extend<I: IntoIterator<Item = &'a Hit>>(&mut self, iter: I) {
        for hit in iter {
            self.insert(hit);
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::hit::testing::hit;
    use quickcheck_macros::quickcheck;

    fn ranked(scan: u32, seq: &str, score: f64, decoy: bool, adj: f64, q: f64) -> Hit {
        let mut h = hit(scan, seq, score, decoy, adj);
        h.adjusted_ppm = adj;
        h.q_value = q;
        h
    }

    #[test]
    fn tie_break_order() {
        let hits = vec![
            ranked(1, "AAA", 0.01, false, 3.0, 0.5),
            // lower q-value beats a better score
            ranked(2, "AAA", 0.02, false, 3.0, 0.0),
            // same q-value, better score
            ranked(3, "CCC", 0.02, false, 3.0, 0.0),
            ranked(4, "CCC", 0.01, false, 3.0, 0.0),
            // same q-value and score, smaller absolute mass error
            ranked(5, "DDD", 0.01, false, 3.0, 0.0),
            ranked(6, "DDD", 0.01, false, -1.0, 0.0),
            // decoys are kept apart
            ranked(7, "AAA", 0.001, true, 0.0, 0.0),
        ];
        let mut winners = SequenceWinners::new(Polarity::Lower);
        winners.extend(&hits);

        let scans = winners.targets().map(|h| h.scan).collect::<Vec<_>>();
        assert_eq!(scans, vec![2, 4, 6]);
        assert_eq!(winners.decoy_count(), 1);
        assert_eq!(winners.decoys().next().map(|h| h.scan), Some(7));
    }

    #[test]
    fn exact_tie_keeps_first() {
        let hits = vec![
            ranked(1, "AAA", 10.0, false, 1.0, 0.0),
            ranked(2, "AAA", 10.0, false, -1.0, 0.0),
        ];
        let mut winners = SequenceWinners::new(Polarity::Higher);
        winners.extend(&hits);
        assert_eq!(winners.targets().next().map(|h| h.scan), Some(1));
    }

    #[test]
    fn signed_zero_scores_tie() {
        // -0.0 == 0.0, so the smaller mass error decides
        let a = ranked(1, "AAA", 0.0, false, 2.0, 0.0);
        let b = ranked(2, "AAA", -0.0, false, 1.0, -0.0);
        assert_eq!(rank(Polarity::Higher, &a, &b), Ordering::Greater);
        assert_eq!(rank(Polarity::Lower, &b, &a), Ordering::Less);

        let hits = vec![a, b];
        let mut winners = SequenceWinners::new(Polarity::Higher);
        winners.extend(&hits);
        assert_eq!(winners.targets().next().map(|h| h.scan), Some(2));
    }

    #[quickcheck]
    fn winner_is_never_worse(raw: Vec<(u8, u8, u8, i8, bool)>, higher: bool) -> bool {
        let polarity = match higher {
            true => Polarity::Higher,
            false => Polarity::Lower,
        };
        let hits = raw
            .iter()
            .enumerate()
            .map(|(ix, &(seq, score, q, adj, decoy))| {
                ranked(
                    ix as u32,
                    &(seq % 6).to_string(),
                    (score % 8) as f64,
                    decoy,
                    (adj % 5) as f64,
                    (q % 3) as f64,
                )
            })
            .collect::<Vec<_>>();

        let mut winners = SequenceWinners::new(polarity);
        winners.extend(&hits);

        winners.targets().chain(winners.decoys()).all(|winner| {
            hits.iter()
                .filter(|h| h.sequence == winner.sequence && h.decoy == winner.decoy)
                .all(|h| rank(polarity, winner, h) != Ordering::Greater)
        }) && winners.target_count() + winners.decoy_count()
            == {
                let mut keys = hits
                    .iter()
                    .map(|h| (h.sequence.as_str(), h.decoy))
                    .collect::<Vec<_>>();
                keys.sort();
                keys.dedup();
                keys.len()
            }
    }
}
