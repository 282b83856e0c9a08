//! A single weighted hypothesis about which particles exist and where.
//!
//! A [`Hypothesis`] owns one [`BeliefField`] per particle it believes in plus
//! an existence weight, meaningful relative to the rest of its ensemble.
//! Observations and deletions that admit several explanations split it into
//! children, one per explanation; each child is an independent deep copy.

use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};
use std::cell::OnceCell;
use std::cmp::Ordering;
use std::collections::hash_map::{Entry, HashMap};
use tracing::trace;

use crate::belief_field::{distinct_cells, BeliefField};
use crate::canonical::HypothesisKey;
use crate::error::BeliefError;
use crate::grid::{Coord, GridShape, Topology};
use crate::selection::{admissible_selections, Selection};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hypothesis {
    /// Grid every owned field lives on
    shape: GridShape,

    /// Existence weight (relative to the ensemble)
    weight: f64,

    /// One field per believed particle
    fields: Vec<BeliefField>,

    /// Cached noisy-OR occupancy grid
    #[serde(skip)]
    occupancy: OnceCell<DMatrix<f64>>,

    /// Cached `weight * Σ field.information()`
    #[serde(skip)]
    information: OnceCell<f64>,
}

impl Hypothesis {
    /// Creates a hypothesis that believes in no particles.
    pub fn new(shape: GridShape, weight: f64) -> Self {
        Self::with_fields(shape, weight, Vec::new())
    }

    /// Creates a hypothesis from prepared fields.
    pub fn with_fields(shape: GridShape, weight: f64, fields: Vec<BeliefField>) -> Self {
        Self {
            shape,
            weight,
            fields,
            occupancy: OnceCell::new(),
            information: OnceCell::new(),
        }
    }

    pub fn shape(&self) -> GridShape {
        self.shape
    }

    pub fn weight(&self) -> f64 {
        self.weight
    }

    pub(crate) fn set_weight(&mut self, weight: f64) {
        self.weight = weight;
        self.information.take();
    }

    pub fn fields(&self) -> &[BeliefField] {
        &self.fields
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    fn invalidate(&mut self) {
        self.occupancy.take();
        self.information.take();
    }

    // ========================================================================
    // QUERIES
    // ========================================================================

    /// Probability that at least one believed particle occupies `cell`.
    ///
    /// Folds the fields left as a noisy-OR: `acc += (1 - acc) * p`.
    pub fn probability(&self, cell: Coord) -> f64 {
        self.occupancy()
            .get((cell.row, cell.col))
            .copied()
            .unwrap_or(0.0)
    }

    fn occupancy(&self) -> &DMatrix<f64> {
        self.occupancy.get_or_init(|| {
            let mut acc = DMatrix::zeros(self.shape.height, self.shape.width);
            for field in &self.fields {
                acc.zip_apply(field.as_matrix(), |a, p| *a += (1.0 - *a) * p);
            }
            acc
        })
    }

    /// `weight * Σ field.information()`.
    pub fn information(&self) -> f64 {
        *self.information.get_or_init(|| {
            let total: f64 = self.fields.iter().map(BeliefField::information).sum();
            self.weight * total
        })
    }

    /// Ranks hypotheses by information, most informative first.
    pub fn by_information(a: &Hypothesis, b: &Hypothesis) -> Ordering {
        b.information().total_cmp(&a.information())
    }

    /// Aggregate similarity in [0, 1].
    ///
    /// Fields of `other` are greedily paired with their most similar unpaired
    /// field here; the Bhattacharyya coefficients of the pairs are summed and
    /// divided by the larger field count. Two empty hypotheses are identical.
    pub fn similarity(&self, other: &Hypothesis) -> f64 {
        let larger = self.fields.len().max(other.fields.len());
        if larger == 0 {
            return 1.0;
        }
        let paired: f64 = self.pair_fields(other).iter().map(|(_, s)| s).sum();
        paired / larger as f64
    }

    /// Canonical key: the multiset of this hypothesis' field keys.
    pub fn key(&self) -> HypothesisKey {
        HypothesisKey::new(self.fields.iter().map(BeliefField::key).collect())
    }

    /// Greedy pairing of `other`'s fields with fields of `self`.
    ///
    /// Entry `k` is `(index into self.fields, similarity)` for `other.fields[k]`.
    /// Ties go to the first candidate found. Pairing stops once every field of
    /// `self` is taken.
    fn pair_fields(&self, other: &Hypothesis) -> Vec<(usize, f64)> {
        let mut free: Vec<usize> = (0..self.fields.len()).collect();
        let mut pairs = Vec::with_capacity(other.fields.len());

        for theirs in &other.fields {
            let mut best: Option<(usize, f64)> = None;
            for (slot, &mine) in free.iter().enumerate() {
                let similarity = self.fields[mine].similarity(theirs);
                if best.map_or(true, |(_, top)| similarity > top) {
                    best = Some((slot, similarity));
                }
            }
            match best {
                Some((slot, similarity)) => pairs.push((free.remove(slot), similarity)),
                None => break,
            }
        }
        pairs
    }

    // ========================================================================
    // EVENTS
    // ========================================================================

    /// Adds a particle known to be somewhere in `area`.
    pub fn add_distribution(&mut self, area: &[Coord]) -> Result<(), BeliefError> {
        self.fields.push(BeliefField::uniform(self.shape, area)?);
        self.invalidate();
        Ok(())
    }

    /// Diffuses every field by one random-walk step.
    pub fn simulate_time_step<T: Topology + ?Sized>(&mut self, topology: &T) {
        for field in &mut self.fields {
            field.diffuse(topology);
        }
        self.invalidate();
    }

    /// One particle vanished somewhere in `area`: which one?
    ///
    /// Each field's mass inside `area`, normalized over all fields, is the
    /// probability that it was the deleted particle. Every field with nonzero
    /// probability yields a child without that field, weighted accordingly.
    /// A hypothesis with no mass in `area` yields no children.
    pub fn split_after_deletion(&self, area: &[Coord]) -> Result<Vec<Hypothesis>, BeliefError> {
        let area: Vec<Coord> = distinct_cells(self.shape, area)?.into_iter().collect();
        let masses: Vec<f64> = self.fields.iter().map(|f| f.mass_within(&area)).collect();
        let total: f64 = masses.iter().sum();
        if total <= 0.0 {
            return Ok(Vec::new());
        }

        let children: Vec<Hypothesis> = masses
            .iter()
            .enumerate()
            .filter_map(|(index, mass)| {
                let share = mass / total;
                if share == 0.0 {
                    return None;
                }
                let mut child = self.clone();
                child.fields.remove(index);
                child.set_weight(self.weight * share);
                child.invalidate();
                Some(child)
            })
            .collect();

        trace!(
            fields = self.fields.len(),
            children = children.len(),
            "split after deletion"
        );
        Ok(children)
    }

    /// Exactly `count` particles sit on `cell`: which fields are they?
    ///
    /// Every admissible selection of fields (see [`admissible_selections`])
    /// yields a child in which the selected fields collapse onto `cell` and
    /// every other field loses its mass there. Children with identical field
    /// sets are collapsed into one and their weights summed.
    pub fn split_after_observation(
        &self,
        cell: Coord,
        count: usize,
    ) -> Result<Vec<Hypothesis>, BeliefError> {
        let cell = self.shape.check(cell)?;
        let mut base = self.clone();
        for field in &mut base.fields {
            field.normalize();
        }
        base.invalidate();

        let probabilities: Vec<f64> = base.fields.iter().map(|f| f.probability(cell)).collect();
        let selections = admissible_selections(&probabilities, count);

        let mut children: Vec<Hypothesis> = Vec::new();
        let mut seen: HashMap<HypothesisKey, usize> = HashMap::new();

        for selection in &selections {
            let mut child = base.explain(cell, selection)?;
            let contribution = base.weight * selection.likelihood;

            match seen.entry(child.key()) {
                Entry::Occupied(slot) => {
                    let existing = &mut children[*slot.get()];
                    existing.set_weight(existing.weight + contribution);
                }
                Entry::Vacant(slot) => {
                    slot.insert(children.len());
                    child.set_weight(contribution);
                    children.push(child);
                }
            }
        }

        trace!(
            %cell,
            count,
            selections = selections.len(),
            children = children.len(),
            "split after observation"
        );
        Ok(children)
    }

    /// Child in which exactly the selected fields are on `cell`.
    fn explain(&self, cell: Coord, selection: &Selection) -> Result<Hypothesis, BeliefError> {
        let mut child = self.clone();
        for &index in &selection.members {
            child.fields[index].concentrate_at(cell)?;
        }
        child.observe_absence(cell, selection)?;
        child.invalidate();
        Ok(child)
    }

    /// Removes the mass at `cell` from every field outside `except`.
    fn observe_absence(&mut self, cell: Coord, except: &Selection) -> Result<(), BeliefError> {
        for (index, field) in self.fields.iter_mut().enumerate() {
            if except.contains(index) {
                continue;
            }
            field.normalize();
            if field.probability(cell) >= 1.0 {
                return Err(BeliefError::InfeasibleObservation { cell });
            }
            field.vanish_from(cell)?;
        }
        Ok(())
    }

    /// Absorbs `other` into this hypothesis.
    ///
    /// Each field of `other` is mixed into its most similar unpaired field
    /// here with proportion `other.weight / self.weight`; the weights add up.
    pub fn merge_in(&mut self, other: &Hypothesis) -> Result<(), BeliefError> {
        if other.fields.len() > self.fields.len() {
            return Err(BeliefError::ShapeMismatch {
                ours: self.fields.len(),
                theirs: other.fields.len(),
            });
        }

        let proportion = if self.weight > 0.0 {
            other.weight / self.weight
        } else {
            1.0
        };
        let pairs = self.pair_fields(other);
        for (theirs, (mine, _)) in other.fields.iter().zip(pairs) {
            self.fields[mine].merge_in(theirs, proportion)?;
        }

        self.weight += other.weight;
        self.invalidate();
        Ok(())
    }
}
