//! Single-heap Nim, as a complete set of collaborators for the search
//! engine.
//!
//! Players alternately take one to three stones from a heap; whoever takes
//! the last stone wins. Heaps at a multiple of four are lost for the side to
//! move, which makes the engine's choices easy to check.

use search_core::{GameState, PlayerId, ResponseGenerator, StaticEvaluator};


/// The most stones a player may take per turn.
pub const MAX_TAKE: u32 = 3;

const WIN: f32 = 1000.0;
const HEURISTIC_EDGE: f32 = 10.0;

/// A Nim position: the heap size and the player to move.
pub struct NimState {
    stones: u32,
    turn: PlayerId,
    response: Option<Box<NimState>>,
}

impl NimState {
    pub fn new(stones: u32, turn: PlayerId) -> NimState {
        NimState {
            stones,
            turn,
            response: None,
        }
    }

    pub fn stones(&self) -> u32 {
        self.stones
    }

    /// The game is over when the heap is empty; the player who emptied it
    /// (the one not to move) has won.
    pub fn winner(&self) -> Option<PlayerId> {
        (self.stones == 0).then(|| self.turn.other())
    }
}

impl GameState for NimState {
    fn fingerprint(&self) -> u64 {
        // Positions are few enough that the encoding itself is unique, and
        // it can never collide with the reserved unused marker.
        (self.stones as u64) << 1
            | match self.turn {
                PlayerId::First => 0,
                PlayerId::Second => 1,
            }
    }

    fn whose_turn(&self) -> PlayerId {
        self.turn
    }

    fn response(&self) -> Option<&Self> {
        self.response.as_deref()
    }

    fn response_mut(&mut self) -> &mut Option<Box<Self>> {
        &mut self.response
    }
}

/// Values terminal heaps with the win sentinels and everything else with a
/// mod-4 edge for the side to move.
#[derive(Clone, Copy, Debug, Default)]
pub struct NimEvaluator;

impl StaticEvaluator for NimEvaluator {
    type State = NimState;

    fn evaluate(&self, state: &NimState) -> f32 {
        let mover_edge = if state.stones == 0 {
            // The opponent just took the last stone.
            -WIN
        } else if state.stones % 4 == 0 {
            -HEURISTIC_EDGE
        } else {
            HEURISTIC_EDGE
        };

        match state.turn {
            PlayerId::First => mover_edge,
            PlayerId::Second => -mover_edge,
        }
    }

    fn first_player_wins(&self) -> f32 {
        WIN
    }

    fn second_player_wins(&self) -> f32 {
        -WIN
    }
}

/// Generates every legal take; none once the heap is empty.
#[derive(Clone, Copy, Debug, Default)]
pub struct NimGenerator;

impl ResponseGenerator for NimGenerator {
    type State = NimState;

    fn responses(&self, state: &NimState, _depth: i32) -> Vec<NimState> {
        (1..=MAX_TAKE.min(state.stones))
            .map(|take| NimState::new(state.stones - take, state.turn.other()))
            .collect()
    }
}
