//! Generic two-player, zero-sum, perfect-information game search.
//!
//! The crate is game-agnostic: it knows nothing about chess, checkers,
//! Othello, or any other game. The host application supplies the rules
//! through three small traits ([`GameState`], [`StaticEvaluator`],
//! [`ResponseGenerator`]) and gets back a bounded-depth alpha-beta search
//! ([`tree::GameTree`]) memoised through a persistent value cache
//! ([`table::TranspositionTable`]).

pub mod table;
pub mod tree;

pub use table::{TableAnalysis, TranspositionTable};
pub use tree::{GameTree, SearchOptions, TreeAnalysis, MAX_ANALYSIS_DEPTH, QUIESCENT_THRESHOLD};

// =============================================================================
// Collaborator traits, implemented by the host application's game
// =============================================================================

/// The two players of a zero-sum game.
///
/// Values are oriented so that higher favours [`PlayerId::First`] and lower
/// favours [`PlayerId::Second`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlayerId {
    First,
    Second,
}

impl PlayerId {
    #[inline(always)]
    pub fn other(self) -> PlayerId {
        match self {
            PlayerId::First => PlayerId::Second,
            PlayerId::Second => PlayerId::First,
        }
    }

    /// The negamax sign for this player: `+1.0` for the maximiser,
    /// `-1.0` for the minimiser.
    #[inline(always)]
    pub fn factor(self) -> f32 {
        match self {
            PlayerId::First => 1.0,
            PlayerId::Second => -1.0,
        }
    }
}

/// An abstract game state.
///
/// The search borrows states from the response generator and hands the chosen
/// one back through the `response` slot, forming an owning chain of
/// successors (unique ownership forward, no back-pointers).
pub trait GameState: Sized {
    /// A statistically unique 64-bit hash of this state.
    ///
    /// Must never equal [`TranspositionTable::UNUSED`] (`u64::MAX`), which is
    /// reserved as the empty-bucket marker.
    fn fingerprint(&self) -> u64;

    /// The player that responds to this state.
    fn whose_turn(&self) -> PlayerId;

    /// The chosen response to this state, if a search has determined one.
    fn response(&self) -> Option<&Self>;

    /// The slot the search writes the chosen response into.
    fn response_mut(&mut self) -> &mut Option<Box<Self>>;
}

/// Scores a state without searching below it.
pub trait StaticEvaluator {
    type State: GameState;

    /// Returns a value for the given state.
    ///
    /// Higher is better for the first player. The result must be finite and
    /// satisfy `second_player_wins() <= v <= first_player_wins()`; the
    /// sentinels themselves mean an expected win for that player. The
    /// function must be pure and deterministic.
    fn evaluate(&self, state: &Self::State) -> f32;

    /// The invariant value of a state won by the first player.
    ///
    /// Must be higher than any non-winning value, but comfortably below
    /// `f32::MAX` so negamax arithmetic stays well-defined.
    fn first_player_wins(&self) -> f32;

    /// The invariant value of a state won by the second player.
    ///
    /// Must be lower than any non-winning value, but comfortably above
    /// `-f32::MAX`. Negamax relies on the recommended symmetry
    /// `second_player_wins() == -first_player_wins()`.
    fn second_player_wins(&self) -> f32;
}

/// Produces the legal successors of a state.
pub trait ResponseGenerator {
    type State: GameState;

    /// All states reachable from `state` in one ply.
    ///
    /// Ownership of the returned states transfers to the search for the
    /// duration of the invocation. An empty list means no moves are
    /// available; the search then treats the state as a terminal leaf. Games
    /// in which passing or resigning is legal must return those as explicit
    /// successors.
    fn responses(&self, state: &Self::State, depth: i32) -> Vec<Self::State>;
}
