//! Bounded-depth game-tree search.
//!
//! [`GameTree`] chooses the best response for the side to move by searching
//! to a fixed ply horizon with alpha-beta pruning, memoised through a
//! [`TranspositionTable`]. The canonical form is negamax (both players
//! maximise, with the sign flipped between plies); the explicit two-function
//! min-max form is also available and chooses identical moves.
//!
//! Preliminary values for generated responses come from the table when
//! possible and from the static evaluator otherwise, and responses are
//! searched most-promising-first so cut-offs occur early.

use serde::{Deserialize, Serialize};

use crate::table::TranspositionTable;
use crate::{GameState, PlayerId, ResponseGenerator, StaticEvaluator};

/// A preliminary value at least this far from the parent's value is
/// considered unsettled and earns a one-ply quiescent extension at the
/// search horizon.
pub const QUIESCENT_THRESHOLD: f32 = 1.0;

/// Number of plies covered by the per-depth analysis counters.
pub const MAX_ANALYSIS_DEPTH: usize = 10;

/// Quality of a value computed by the static evaluator alone.
const SEF_QUALITY: i16 = 0;

/// Responses whose preliminary value is already search-grade sort first.
const PRIORITY_HIGH: i32 = 1;
const PRIORITY_LOW: i32 = 0;

/// Construction-time switches for the search.
///
/// The defaults are the canonical configuration; the alternatives exist for
/// comparison and diagnosis.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchOptions {
    /// Use the negamax form; otherwise the explicit first-/second-player
    /// search pair. Both choose the same moves.
    pub negamax: bool,
    /// Sort responses by preliminary-quality priority before value.
    pub prioritized_ordering: bool,
    /// Extend one ply past the horizon when a value looks unsettled.
    pub quiescent: bool,
    /// Record the per-search analysis counters.
    pub analysis: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        SearchOptions {
            negamax: true,
            prioritized_ordering: false,
            quiescent: true,
            analysis: false,
        }
    }
}

/// Counters describing the last searches.
///
/// `generated_counts[d]` / `evaluated_counts[d]` are the responses generated
/// and statically evaluated at depth `d`; `value` is the root value of the
/// most recent search.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TreeAnalysis {
    pub generated_counts: [u64; MAX_ANALYSIS_DEPTH],
    pub evaluated_counts: [u64; MAX_ANALYSIS_DEPTH],
    pub value: f32,
    pub alpha_cutoffs: u64,
    pub beta_cutoffs: u64,
}

impl TreeAnalysis {
    pub fn reset(&mut self) {
        *self = TreeAnalysis::default();
    }

    /// Serialises the counters as a JSON record.
    pub fn to_json(&self) -> Result<String, String> {
        serde_json::to_string_pretty(self).map_err(|e| format!("Failed to serialize: {}", e))
    }
}

/// Per-invocation scratch value: a generated state with its best-known value.
struct Node<G> {
    state: G,
    value: f32,
    quality: i16,
    priority: i32,
}

/// Sorts the most promising response for the side to move first: highest
/// priority, then highest `value * factor`.
fn sort_responses<G>(responses: &mut [Node<G>], factor: f32) {
    responses.sort_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then((b.value * factor).total_cmp(&(a.value * factor)))
    });
}

/// A game-tree search engine.
///
/// The evaluator and generator are injected once at construction and the
/// search is monomorphised over them; the transposition table is owned by the
/// tree and persists across searches (use [`GameTree::table_mut`] to age it
/// between real-world moves).
pub struct GameTree<E, R>
where
    E: StaticEvaluator,
    R: ResponseGenerator<State = E::State>,
{
    max_depth: i32,
    table: TranspositionTable,
    evaluator: E,
    generator: R,
    options: SearchOptions,
    analysis: TreeAnalysis,
}

impl<E, R> GameTree<E, R>
where
    E: StaticEvaluator,
    R: ResponseGenerator<State = E::State>,
{
    /// Creates an engine with the default [`SearchOptions`].
    ///
    /// `max_depth` is the nominal ply horizon and must be positive.
    pub fn new(table: TranspositionTable, evaluator: E, generator: R, max_depth: i32) -> Self {
        Self::with_options(table, evaluator, generator, max_depth, SearchOptions::default())
    }

    pub fn with_options(
        table: TranspositionTable,
        evaluator: E,
        generator: R,
        max_depth: i32,
        options: SearchOptions,
    ) -> Self {
        assert!(max_depth > 0, "max_depth must be positive");
        assert!(
            max_depth <= i16::MAX as i32,
            "max_depth must fit the quality range"
        );

        GameTree {
            max_depth,
            table,
            evaluator,
            generator,
            options,
            analysis: TreeAnalysis::default(),
        }
    }

    pub fn max_depth(&self) -> i32 {
        self.max_depth
    }

    pub fn options(&self) -> SearchOptions {
        self.options
    }

    pub fn table(&self) -> &TranspositionTable {
        &self.table
    }

    pub fn table_mut(&mut self) -> &mut TranspositionTable {
        &mut self.table
    }

    /// The driver's analysis counters (recorded only when
    /// `SearchOptions::analysis` is set).
    pub fn analysis_data(&self) -> &TreeAnalysis {
        &self.analysis
    }

    pub fn reset_analysis(&mut self) {
        self.analysis.reset();
    }

    /// Searches for the best response to `state` and stores it in the
    /// state's response slot.
    ///
    /// The state is not otherwise altered. If no responses exist the slot is
    /// left untouched; detecting the end of the game is the caller's
    /// responsibility. Deterministic given identical inputs and table
    /// contents.
    pub fn find_best_response(&mut self, state: &mut E::State) {
        let (value, _) = if self.options.negamax {
            let factor = state.whose_turn().factor();
            self.next_ply(state, 0.0, factor, -f32::MAX, f32::MAX, 0)
        } else {
            match state.whose_turn() {
                PlayerId::First => self.first_player_search(state, 0.0, -f32::MAX, f32::MAX, 0),
                PlayerId::Second => self.second_player_search(state, 0.0, -f32::MAX, f32::MAX, 0),
            }
        };

        if self.options.analysis {
            self.analysis.value = value;
        }
        log::debug!(
            "search to depth {} complete, value {:.2}",
            self.max_depth,
            value
        );
    }

    /// Recursively evaluates the responses to a state, negamax form.
    ///
    /// `node_value` is the state's preliminary value (used only to judge
    /// whether a response looks unsettled); `factor` is `+1` when the first
    /// player is to move and `-1` otherwise. Returns the state's refined
    /// value and its quality, and stores the chosen response in the state's
    /// response slot.
    fn next_ply(
        &mut self,
        state: &mut E::State,
        node_value: f32,
        factor: f32,
        mut alpha: f32,
        beta: f32,
        depth: i32,
    ) -> (f32, i16) {
        let response_depth = depth + 1;
        let quality = (self.max_depth - depth) as i16;
        let min_response_quality = (self.max_depth - response_depth) as i16;

        let mut responses = self.generate_responses(state, depth);
        if responses.is_empty() {
            // No moves: a terminal leaf, worth its static evaluation.
            return self.get_value(state, depth);
        }
        sort_responses(&mut responses, factor);

        let first_player_wins = self.evaluator.first_player_wins();
        let mut pruned = false;
        let mut best_idx = 0;
        let mut best_norm = -f32::MAX;

        for i in 0..responses.len() {
            let response = &mut responses[i];

            // A response already won by the side to move is final. Otherwise
            // search it if its preliminary quality is below what this ply
            // needs, or extend one ply past the horizon when an
            // evaluator-grade value looks unsettled.
            if response.value * factor != first_player_wins
                && ((response_depth < self.max_depth
                    && response.quality < min_response_quality)
                    || (response_depth == self.max_depth
                        && response.quality == SEF_QUALITY
                        && self.should_extend(node_value, response.value)))
            {
                let prelim = response.value;
                let (v, q) = self.next_ply(
                    &mut response.state,
                    prelim,
                    -factor,
                    -beta,
                    -alpha,
                    response_depth,
                );
                response.value = v;
                response.quality = q;
            }

            let response = &responses[i];
            log::trace!(
                "{:indent$}{:016x}: value = {:.2}, quality = {}, alpha = {:.2}, beta = {:.2}",
                "",
                response.state.fingerprint(),
                response.value,
                response.quality,
                alpha,
                beta,
                indent = depth as usize * 4
            );

            let value = response.value * factor;
            if value > best_norm {
                best_norm = value;
                best_idx = i;

                // A forced win for the side to move ends the scan.
                if value == first_player_wins {
                    break;
                }

                // Beta cut-off: the opponent already has a move elsewhere
                // that bounds this subtree, so the rest cannot matter.
                if value > beta {
                    pruned = true;
                    if self.options.analysis {
                        self.analysis.beta_cutoffs += 1;
                    }
                    break;
                }

                if value > alpha {
                    alpha = value;
                }
            }
        }

        let chosen = responses.swap_remove(best_idx);
        let value = chosen.value;
        *state.response_mut() = Some(Box::new(chosen.state));

        // A pruned value is only a bound, not the true minimax value;
        // storing it at search quality would poison later searches.
        if !pruned {
            self.table.update(state.fingerprint(), value, quality);
        }
        (value, quality)
    }

    /// Evaluates the first player's responses; the chosen response is the one
    /// with the highest value. Two-function counterpart of [`Self::next_ply`].
    fn first_player_search(
        &mut self,
        state: &mut E::State,
        node_value: f32,
        mut alpha: f32,
        beta: f32,
        depth: i32,
    ) -> (f32, i16) {
        let response_depth = depth + 1;
        let quality = (self.max_depth - depth) as i16;
        let min_response_quality = (self.max_depth - response_depth) as i16;

        let mut responses = self.generate_responses(state, depth);
        if responses.is_empty() {
            return self.get_value(state, depth);
        }
        sort_responses(&mut responses, 1.0);

        let first_player_wins = self.evaluator.first_player_wins();
        let mut pruned = false;
        let mut best_idx = 0;
        let mut best_value = -f32::MAX;

        for i in 0..responses.len() {
            let response = &mut responses[i];
            if response.value != first_player_wins
                && ((response_depth < self.max_depth
                    && response.quality < min_response_quality)
                    || (response_depth == self.max_depth
                        && response.quality == SEF_QUALITY
                        && self.should_extend(node_value, response.value)))
            {
                let prelim = response.value;
                let (v, q) = self.second_player_search(
                    &mut response.state,
                    prelim,
                    alpha,
                    beta,
                    response_depth,
                );
                response.value = v;
                response.quality = q;
            }

            let value = responses[i].value;
            if value > best_value {
                best_value = value;
                best_idx = i;

                if value == first_player_wins {
                    break;
                }
                if value > beta {
                    pruned = true;
                    if self.options.analysis {
                        self.analysis.beta_cutoffs += 1;
                    }
                    break;
                }
                if value > alpha {
                    alpha = value;
                }
            }
        }

        let chosen = responses.swap_remove(best_idx);
        let value = chosen.value;
        *state.response_mut() = Some(Box::new(chosen.state));

        if !pruned {
            self.table.update(state.fingerprint(), value, quality);
        }
        (value, quality)
    }

    /// Evaluates the second player's responses; the chosen response is the
    /// one with the lowest value.
    fn second_player_search(
        &mut self,
        state: &mut E::State,
        node_value: f32,
        alpha: f32,
        mut beta: f32,
        depth: i32,
    ) -> (f32, i16) {
        let response_depth = depth + 1;
        let quality = (self.max_depth - depth) as i16;
        let min_response_quality = (self.max_depth - response_depth) as i16;

        let mut responses = self.generate_responses(state, depth);
        if responses.is_empty() {
            return self.get_value(state, depth);
        }
        sort_responses(&mut responses, -1.0);

        let second_player_wins = self.evaluator.second_player_wins();
        let mut pruned = false;
        let mut best_idx = 0;
        let mut best_value = f32::MAX;

        for i in 0..responses.len() {
            let response = &mut responses[i];
            if response.value != second_player_wins
                && ((response_depth < self.max_depth
                    && response.quality < min_response_quality)
                    || (response_depth == self.max_depth
                        && response.quality == SEF_QUALITY
                        && self.should_extend(node_value, response.value)))
            {
                let prelim = response.value;
                let (v, q) = self.first_player_search(
                    &mut response.state,
                    prelim,
                    alpha,
                    beta,
                    response_depth,
                );
                response.value = v;
                response.quality = q;
            }

            let value = responses[i].value;
            if value < best_value {
                best_value = value;
                best_idx = i;

                if value == second_player_wins {
                    break;
                }

                // Alpha cut-off: the first player already has a better move
                // elsewhere and would never allow this line.
                if value < alpha {
                    pruned = true;
                    if self.options.analysis {
                        self.analysis.alpha_cutoffs += 1;
                    }
                    break;
                }

                if value < beta {
                    beta = value;
                }
            }
        }

        let chosen = responses.swap_remove(best_idx);
        let value = chosen.value;
        *state.response_mut() = Some(Box::new(chosen.state));

        if !pruned {
            self.table.update(state.fingerprint(), value, quality);
        }
        (value, quality)
    }

    /// Generates the responses to a state, each carrying a preliminary value
    /// from the table or the static evaluator.
    fn generate_responses(&mut self, state: &E::State, depth: i32) -> Vec<Node<E::State>> {
        let states = self.generator.responses(state, depth);

        if self.options.analysis {
            if let Some(count) = self.analysis.generated_counts.get_mut(depth as usize) {
                *count += states.len() as u64;
            }
        }

        states
            .into_iter()
            .map(|s| {
                let (value, quality) = self.get_value(&s, depth);
                let priority = if self.options.prioritized_ordering {
                    self.prioritize(quality, depth)
                } else {
                    PRIORITY_LOW
                };
                Node {
                    state: s,
                    value,
                    quality,
                    priority,
                }
            })
            .collect()
    }

    /// Looks up a state's value, falling back to the static evaluator.
    ///
    /// Any value already in the table was produced by search and/or static
    /// evaluation, so its quality is at least evaluation-grade and a lookup
    /// is far cheaper than evaluating again. Misses are evaluated and cached
    /// at quality 0 so repeated lookups stay cheap.
    fn get_value(&mut self, state: &E::State, depth: i32) -> (f32, i16) {
        let fingerprint = state.fingerprint();
        if let Some(hit) = self.table.check(fingerprint) {
            return hit;
        }

        if self.options.analysis {
            if let Some(count) = self.analysis.evaluated_counts.get_mut(depth as usize) {
                *count += 1;
            }
        }

        let value = self.evaluator.evaluate(state);
        debug_assert!(
            value.is_finite(),
            "static evaluator produced a non-finite value"
        );
        debug_assert!(
            value >= self.evaluator.second_player_wins()
                && value <= self.evaluator.first_player_wins(),
            "static evaluator produced an out-of-range value"
        );

        self.table.update(fingerprint, value, SEF_QUALITY);
        (value, SEF_QUALITY)
    }

    /// A response whose preliminary quality is already as good as this ply's
    /// search would produce is probably close to its final value; searching
    /// it first hastens cut-offs at the cost of a few extra static
    /// evaluations on the low-priority rest.
    fn prioritize(&self, quality: i16, depth: i32) -> i32 {
        if quality as i32 > self.max_depth - depth {
            PRIORITY_HIGH
        } else {
            PRIORITY_LOW
        }
    }

    /// Whether an unsettled preliminary value warrants searching one ply past
    /// the nominal horizon.
    fn should_extend(&self, previous_value: f32, this_value: f32) -> bool {
        self.options.quiescent && (previous_value - this_value).abs() >= QUIESCENT_THRESHOLD
    }
}

#[cfg(test)]
#[path = "tree_tests.rs"]
mod tree_tests;
