//! Typo suggestions: rank candidate names by their similarity to a mistyped token.
use std::collections::BTreeSet;

use crate::constant::*;

/// How closely a candidate resembles a typo.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Similarity {
    pub distance: usize,
    pub prefix: usize,
    pub sameness: usize,
    pub score: i64,
}

impl Similarity {
    /// Whether the candidate is close enough to be worth suggesting.
    pub fn is_similar(&self) -> bool {
        self.score > TYPO_SCORE_FLOOR
            && !(self.prefix == 0 && self.sameness == 0 && self.distance > TYPO_DISTANCE_CUTOFF)
    }
}

/// The Levenshtein edit distance, over characters.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;

        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            current[j + 1] = substitution
                .min(previous[j + 1] + 1)
                .min(current[j] + 1);
        }

        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}

fn common_prefix(a: &[char], b: &[char]) -> usize {
    a.iter().zip(b.iter()).take_while(|(x, y)| x == y).count()
}

// The best position-wise match over every rotation of the typo, doubled on a full-length match.
fn rotational_sameness(typo: &[char], candidate: &[char]) -> usize {
    let mut best = 0;

    for rotation in 0..typo.len() {
        let matches = typo[rotation..]
            .iter()
            .chain(typo[..rotation].iter())
            .zip(candidate.iter())
            .filter(|(x, y)| x == y)
            .count();
        let matches = if matches == candidate.len() {
            matches * 2
        } else {
            matches
        };
        best = best.max(matches);
    }

    best
}

fn containment(typo: &str, candidate: &str) -> usize {
    if typo.is_empty() || candidate.is_empty() {
        0
    } else if candidate.contains(typo) {
        typo.chars().count()
    } else if typo.contains(candidate) {
        candidate.chars().count()
    } else {
        0
    }
}

/// Score `candidate` against `typo`.
pub fn similarity(typo: &str, candidate: &str) -> Similarity {
    let typo_chars: Vec<char> = typo.chars().collect();
    let candidate_chars: Vec<char> = candidate.chars().collect();
    let distance = levenshtein(typo, candidate);
    let prefix = common_prefix(&typo_chars, &candidate_chars);
    let sameness = rotational_sameness(&typo_chars, &candidate_chars).max(containment(typo, candidate));

    Similarity {
        distance,
        prefix,
        sameness,
        score: prefix as i64 + sameness as i64 - distance as i64,
    }
}

/// Rank `candidates` by similarity to `typo`, keeping at most `limit` of the similar ones.
///
/// Ordered by score (descending), then prefix length (ascending), then sameness (descending), then alphabetically.
///
/// ### Example
/// ```
/// use argot_engine::suggest::rank_suggestions;
///
/// assert_eq!(rank_suggestions("psh", ["push", "pull", "pop"], 1), vec!["push"]);
/// assert!(rank_suggestions("zzz", ["push", "pull", "pop"], 5).is_empty());
/// ```
pub fn rank_suggestions<I, S>(typo: &str, candidates: I, limit: usize) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let unique: BTreeSet<String> = candidates
        .into_iter()
        .map(|c| c.as_ref().to_string())
        .collect();
    let mut scored: Vec<(Similarity, String)> = unique
        .into_iter()
        .map(|candidate| (similarity(typo, &candidate), candidate))
        .filter(|(s, _)| s.is_similar())
        .collect();

    scored.sort_by(|(a, a_name), (b, b_name)| {
        b.score
            .cmp(&a.score)
            .then(a.prefix.cmp(&b.prefix))
            .then(b.sameness.cmp(&a.sameness))
            .then_with(|| a_name.cmp(b_name))
    });

    scored
        .into_iter()
        .take(limit)
        .map(|(_, candidate)| candidate)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("", "", 0)]
    #[case("abc", "", 3)]
    #[case("", "abc", 3)]
    #[case("kitten", "sitting", 3)]
    #[case("psh", "push", 1)]
    #[case("psh", "pull", 3)]
    #[case("flaw", "lawn", 2)]
    #[case("héllo", "hello", 1)]
    fn edit_distance(#[case] a: &str, #[case] b: &str, #[case] expected: usize) {
        assert_eq!(levenshtein(a, b), expected);
        assert_eq!(levenshtein(b, a), expected);
    }

    #[rstest]
    #[case("psh", "push", 1, 1, 1)]
    #[case("psh", "pop", 2, 1, 1)]
    #[case("psh", "pull", 3, 1, 1)]
    #[case("verbos", "verbose", 1, 6, 6)]
    #[case("atc", "cat", 2, 0, 6)]
    #[case("zzz", "push", 4, 0, 0)]
    fn similarity_terms(
        #[case] typo: &str,
        #[case] candidate: &str,
        #[case] distance: usize,
        #[case] prefix: usize,
        #[case] sameness: usize,
    ) {
        let s = similarity(typo, candidate);
        assert_eq!((s.distance, s.prefix, s.sameness), (distance, prefix, sameness));
        assert_eq!(s.score, prefix as i64 + sameness as i64 - distance as i64);
    }

    #[test]
    fn rank_push() {
        assert_eq!(
            rank_suggestions("psh", ["push", "pull", "pop"], 5),
            vec!["push", "pop", "pull"]
        );
        assert_eq!(rank_suggestions("psh", ["push", "pull", "pop"], 1), vec!["push"]);
    }

    #[rstest]
    #[case("zzz")]
    #[case("")]
    #[case("qwertyuiop")]
    fn rank_nothing_similar(#[case] typo: &str) {
        assert!(rank_suggestions(typo, ["push", "pull", "pop"], 5).is_empty());
    }

    #[test]
    fn rank_limit_zero() {
        assert!(rank_suggestions("psh", ["push"], 0).is_empty());
    }

    #[test]
    fn rank_deduplicates() {
        assert_eq!(rank_suggestions("psh", ["push", "push"], 5), vec!["push"]);
    }

    #[test]
    fn rank_ties_alphabetical() {
        // Identical terms against both candidates.
        assert_eq!(rank_suggestions("ab", ["ax", "ay"], 5), vec!["ax", "ay"]);
    }

    #[test]
    fn rank_pure_and_stable() {
        let candidates = ["verbose", "version", "verify", "name", "value"];
        let first = rank_suggestions("verison", candidates, 3);
        let second = rank_suggestions("verison", candidates.iter().rev(), 3);
        assert_eq!(first, second);
        assert_eq!(first[0], "version");
    }
}
