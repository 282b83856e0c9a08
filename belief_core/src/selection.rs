//! Enumeration of the field subsets that can explain a count observation.
//!
//! Given the probability `p_i` that each field sits on the observed cell, a
//! selection is a set of exactly `count` field indices that
//! - contains every certain field (`p_i >= 1`), and
//! - contains only positive fields (`p_i > 0`).
//!
//! Its likelihood is `Π (selected ? p_i : 1 - p_i)` over all fields.
//! Selections are built by backtracking: a branch is cut as soon as it can no
//! longer reach `count` members, or its partial likelihood underflows to zero.

/// One admissible assignment of observed particles to fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Selection {
    /// Selected field indices, ascending
    pub members: Vec<usize>,

    /// Probability that exactly these fields are the observed particles
    pub likelihood: f64,
}

impl Selection {
    pub fn contains(&self, index: usize) -> bool {
        self.members.binary_search(&index).is_ok()
    }
}

/// Lists every admissible selection of `count` fields, in lexicographic order
/// of their members.
pub fn admissible_selections(probabilities: &[f64], count: usize) -> Vec<Selection> {
    let mut search = Search {
        probabilities,
        count,
        positives_after: positive_suffix_counts(probabilities),
        chosen: Vec::with_capacity(count),
        out: Vec::new(),
    };
    search.extend(0, 1.0);
    search.out
}

/// `positives_after[i]` is the number of positive fields at index `i` or later.
fn positive_suffix_counts(probabilities: &[f64]) -> Vec<usize> {
    let mut counts = vec![0; probabilities.len() + 1];
    for (i, p) in probabilities.iter().enumerate().rev() {
        counts[i] = counts[i + 1] + usize::from(*p > 0.0);
    }
    counts
}

struct Search<'a> {
    probabilities: &'a [f64],
    count: usize,
    positives_after: Vec<usize>,
    chosen: Vec<usize>,
    out: Vec<Selection>,
}

impl Search<'_> {
    fn extend(&mut self, index: usize, likelihood: f64) {
        let open = self.count - self.chosen.len();
        if self.positives_after[index] < open {
            return;
        }
        if index == self.probabilities.len() {
            self.out.push(Selection {
                members: self.chosen.clone(),
                likelihood,
            });
            return;
        }

        let p = self.probabilities[index];

        if p > 0.0 && open > 0 {
            let next = likelihood * p;
            if next != 0.0 {
                self.chosen.push(index);
                self.extend(index + 1, next);
                self.chosen.pop();
            }
        }

        // A certain field can never be left out.
        if p < 1.0 {
            let next = likelihood * (1.0 - p);
            if next != 0.0 {
                self.extend(index + 1, next);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn members(selections: &[Selection]) -> Vec<Vec<usize>> {
        selections.iter().map(|s| s.members.clone()).collect()
    }

    #[test]
    fn test_single_field_observed() {
        let selections = admissible_selections(&[0.5], 1);
        assert_eq!(members(&selections), vec![vec![0]]);
        assert_relative_eq!(selections[0].likelihood, 0.5);
    }

    #[test]
    fn test_absence_selects_nothing() {
        let selections = admissible_selections(&[0.5, 0.2], 0);
        assert_eq!(members(&selections), vec![Vec::<usize>::new()]);
        assert_relative_eq!(selections[0].likelihood, 0.5 * 0.8);
    }

    #[test]
    fn test_zero_fields_are_never_selected() {
        let selections = admissible_selections(&[0.0, 0.4, 0.6], 1);
        assert_eq!(members(&selections), vec![vec![1], vec![2]]);
        assert_relative_eq!(selections[0].likelihood, 0.4 * 0.4);
        assert_relative_eq!(selections[1].likelihood, 0.6 * 0.6);
    }

    #[test]
    fn test_certain_fields_are_always_selected() {
        let selections = admissible_selections(&[1.0, 0.5, 0.5], 2);
        assert_eq!(members(&selections), vec![vec![0, 1], vec![0, 2]]);
        assert!(selections.iter().all(|s| s.contains(0)));
    }

    #[test]
    fn test_too_few_certain_slots() {
        // Two certain fields cannot explain a single observed particle.
        assert!(admissible_selections(&[1.0, 1.0], 1).is_empty());
    }

    #[test]
    fn test_count_exceeds_positive_fields() {
        assert!(admissible_selections(&[0.5, 0.0], 2).is_empty());
        assert!(admissible_selections(&[], 1).is_empty());
    }

    #[test]
    fn test_all_pairs_of_four() {
        let selections = admissible_selections(&[0.5; 4], 2);
        assert_eq!(selections.len(), 6);
        for s in &selections {
            assert_relative_eq!(s.likelihood, 0.0625);
        }
        assert_eq!(selections[0].members, vec![0, 1]);
        assert_eq!(selections[5].members, vec![2, 3]);
    }

    #[test]
    fn test_underflow_is_pruned() {
        let tiny = [1e-200, 1e-200, 1e-200];
        assert!(admissible_selections(&tiny, 3).is_empty());
    }

    #[test]
    fn test_likelihoods_sum_over_counts() {
        // Σ over every count of every selection is the total probability, 1.
        let probs = [0.3, 0.6, 0.9, 0.1];
        let total: f64 = (0..=probs.len())
            .flat_map(|n| admissible_selections(&probs, n))
            .map(|s| s.likelihood)
            .sum();
        assert_relative_eq!(total, 1.0, epsilon = 1e-12);
    }
}
