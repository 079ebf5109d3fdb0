use crate::fdr::{Counting, Tally};
use crate::hit::Hit;

/// Assign q-values (percent) in place to the hits of a single file
///
/// # Invariants
/// * `hits` must be sorted by score, best first
pub fn assign_q_values(hits: &mut [Hit], counting: Counting) {
    // Hits sharing a score are resolved together, so a tie never receives
    // two different q-values
    let fdrs = {
        let mut tally = Tally::new(counting);
        hits.chunk_by(|a, b| a.score == b.score)
            .map(|tier| {
                tally.extend(tier);
                tally.fdr()
            })
            .collect::<Vec<_>>()
    };

    for (tier, fdr) in hits.chunk_by_mut(|a, b| a.score == b.score).zip(fdrs) {
        for hit in tier {
            hit.q_value = fdr;
        }
    }

    monotone(hits);
}

/// Q-value is the minimum FDR at any threshold at least as permissive as the
/// current one: `q = q[::-1].cummin()[::-1]`. An undefined FDR is replaced by
/// the first defined value below it, if there is one.
///
/// # Invariants
/// * `hits` must be sorted by score, best first
pub fn monotone(hits: &mut [Hit]) {
    let mut q_min = f64::NAN;
    for hit in hits.iter_mut().rev() {
        q_min = q_min.min(hit.q_value);
        hit.q_value = q_min;
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::hit::{testing::hit, Polarity};
    use quickcheck_macros::quickcheck;

    #[test]
    fn target_then_decoy() {
        let mut hits = vec![
            hit(1, "TARGET", 10.0, false, 0.0),
            hit(2, "DECOY", 9.0, true, 0.0),
        ];
        assign_q_values(&mut hits, Counting::Redundant);
        assert_eq!(hits[0].q_value, 0.0);
        assert_eq!(hits[1].q_value, 100.0);
    }

    #[test]
    fn ties_share_q_value() {
        let mut hits = vec![
            hit(1, "AAA", 10.0, false, 0.0),
            hit(2, "CCC", 9.0, true, 0.0),
            hit(3, "DDD", 9.0, false, 0.0),
            hit(4, "EEE", 8.0, false, 0.0),
            hit(5, "FFF", 7.0, false, 0.0),
        ];
        assign_q_values(&mut hits, Counting::Redundant);
        let q = hits.iter().map(|h| h.q_value).collect::<Vec<_>>();
        assert_eq!(q, vec![0.0, 25.0, 25.0, 25.0, 25.0]);
    }

    #[test]
    fn leading_decoys() {
        let mut hits = vec![
            hit(1, "DECOY", 0.001, true, 0.0),
            hit(2, "AAA", 0.01, false, 0.0),
            hit(3, "CCC", 0.02, false, 0.0),
        ];
        assign_q_values(&mut hits, Counting::Redundant);
        assert_eq!(hits[0].q_value, 50.0);
        assert_eq!(hits[1].q_value, 50.0);
        assert_eq!(hits[2].q_value, 50.0);

        let mut decoys = vec![
            hit(1, "DECOY", 0.001, true, 0.0),
            hit(2, "DECOY", 0.002, true, 0.0),
        ];
        assign_q_values(&mut decoys, Counting::Redundant);
        assert!(decoys.iter().all(|h| h.q_value.is_nan()));
    }

    #[test]
    fn unique_sequences() {
        let mut hits = vec![
            hit(1, "AAA", 10.0, false, 0.0),
            hit(2, "AAA", 9.0, false, 0.0),
            hit(3, "KKK", 8.0, true, 0.0),
            hit(4, "CCC", 7.0, false, 0.0),
        ];
        assign_q_values(&mut hits, Counting::Unique);
        let q = hits.iter().map(|h| h.q_value).collect::<Vec<_>>();
        assert_eq!(q, vec![0.0, 0.0, 50.0, 50.0]);

        assign_q_values(&mut hits, Counting::Redundant);
        let q = hits.iter().map(|h| h.q_value).collect::<Vec<_>>();
        let third = crate::fdr::fdr(1, 3);
        assert_eq!(q, vec![0.0, 0.0, third, third]);
    }

    #[quickcheck]
    fn non_increasing_with_quality(raw: Vec<(u8, bool, u8)>, unique: bool) -> bool {
        let mut hits = raw
            .iter()
            .enumerate()
            .map(|(ix, &(score, decoy, seq))| {
                hit(ix as u32, &(seq % 8).to_string(), (score % 32) as f64, decoy, 0.0)
            })
            .collect::<Vec<_>>();
        hits.sort_by(|a, b| Polarity::Higher.order(a.score, b.score));

        let counting = if unique {
            Counting::Unique
        } else {
            Counting::Redundant
        };
        assign_q_values(&mut hits, counting);

        let defined = hits.iter().skip_while(|h| h.q_value.is_nan());
        let ties = hits
            .windows(2)
            .filter(|w| w[0].score == w[1].score)
            .all(|w| w[0].q_value.to_bits() == w[1].q_value.to_bits());
        ties && defined
            .clone()
            .zip(defined.skip(1))
            .all(|(better, worse)| better.q_value <= worse.q_value)
    }
}
