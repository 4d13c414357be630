//! A scripted deterministic game for driving the engine end to end.
//!
//! States are integer ids; each test supplies the move graph and the static
//! values as tables. Turns alternate between plies.

#![allow(dead_code)]

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use search_core::{
    GameState, GameTree, PlayerId, ResponseGenerator, SearchOptions, StaticEvaluator,
    TranspositionTable,
};

/// Symmetric win sentinels for the scripted games.
pub const WIN: f32 = 1000.0;

pub struct ScriptedState {
    pub id: u64,
    pub turn: PlayerId,
    response: Option<Box<ScriptedState>>,
}

impl ScriptedState {
    pub fn new(id: u64, turn: PlayerId) -> ScriptedState {
        ScriptedState {
            id,
            turn,
            response: None,
        }
    }
}

impl GameState for ScriptedState {
    fn fingerprint(&self) -> u64 {
        self.id
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

pub struct Script {
    pub moves: HashMap<u64, Vec<u64>>,
    pub values: HashMap<u64, f32>,
}

impl Script {
    pub fn new(moves: &[(u64, &[u64])], values: &[(u64, f32)]) -> Rc<Script> {
        Rc::new(Script {
            moves: moves
                .iter()
                .map(|&(id, succ)| (id, succ.to_vec()))
                .collect(),
            values: values.iter().copied().collect(),
        })
    }

    pub fn value_of(&self, id: u64) -> f32 {
        self.values.get(&id).copied().unwrap_or(0.0)
    }
}

/// Table-driven evaluator that counts its calls per state.
pub struct ScriptedEvaluator {
    script: Rc<Script>,
    negated: bool,
    pub calls: Rc<RefCell<HashMap<u64, u32>>>,
}

impl StaticEvaluator for ScriptedEvaluator {
    type State = ScriptedState;

    fn evaluate(&self, state: &ScriptedState) -> f32 {
        *self.calls.borrow_mut().entry(state.id).or_insert(0) += 1;
        let value = self.script.value_of(state.id);
        if self.negated {
            -value
        } else {
            value
        }
    }

    fn first_player_wins(&self) -> f32 {
        WIN
    }

    fn second_player_wins(&self) -> f32 {
        -WIN
    }
}

pub struct ScriptedGenerator {
    script: Rc<Script>,
}

impl ResponseGenerator for ScriptedGenerator {
    type State = ScriptedState;

    fn responses(&self, state: &ScriptedState, _depth: i32) -> Vec<ScriptedState> {
        match self.script.moves.get(&state.id) {
            Some(ids) => ids
                .iter()
                .map(|&id| ScriptedState::new(id, state.whose_turn().other()))
                .collect(),
            None => Vec::new(),
        }
    }
}

/// An engine over a scripted game, with a handle on the evaluator's calls.
pub struct Harness {
    pub tree: GameTree<ScriptedEvaluator, ScriptedGenerator>,
    pub eval_calls: Rc<RefCell<HashMap<u64, u32>>>,
}

impl Harness {
    pub fn evaluations_of(&self, id: u64) -> u32 {
        self.eval_calls.borrow().get(&id).copied().unwrap_or(0)
    }
}

pub fn harness(script: &Rc<Script>, max_depth: i32, options: SearchOptions) -> Harness {
    harness_negated(script, max_depth, options, false)
}

pub fn harness_negated(
    script: &Rc<Script>,
    max_depth: i32,
    options: SearchOptions,
    negated: bool,
) -> Harness {
    let calls = Rc::new(RefCell::new(HashMap::new()));
    let evaluator = ScriptedEvaluator {
        script: script.clone(),
        negated,
        calls: calls.clone(),
    };
    let generator = ScriptedGenerator {
        script: script.clone(),
    };
    Harness {
        tree: GameTree::with_options(
            TranspositionTable::new(512, 1),
            evaluator,
            generator,
            max_depth,
            options,
        ),
        eval_calls: calls,
    }
}

pub fn analysing() -> SearchOptions {
    SearchOptions {
        analysis: true,
        ..SearchOptions::default()
    }
}

/// Exhaustive depth-limited minimax over a script, the reference the driver
/// must agree with. Win sentinels are terminal; leaves keep their static
/// value.
pub fn minimax(script: &Script, id: u64, turn: PlayerId, plies_left: i32) -> f32 {
    let value = script.value_of(id);
    if plies_left == 0 || value == WIN || value == -WIN {
        return value;
    }
    let successors = match script.moves.get(&id) {
        Some(succ) if !succ.is_empty() => succ,
        _ => return value,
    };

    let children = successors
        .iter()
        .map(|&child| minimax(script, child, turn.other(), plies_left - 1));
    match turn {
        PlayerId::First => children.fold(-f32::MAX, f32::max),
        PlayerId::Second => children.fold(f32::MAX, f32::min),
    }
}
