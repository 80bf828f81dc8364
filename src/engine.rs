//! Engine façade: the single entry point the UCI adapter drives. Owns the
//! persistent transposition table, the resolved configuration, and
//! statistics from the most recent search.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info, warn};

use shakmaty::{Color, Move};

use crate::error::ProtocolError;
use crate::position::Position;
use crate::search::{self, SearchContext};
use crate::time::{self, ClockReport};
use crate::tt::TranspositionTable;
use crate::types::{EngineConfig, IterationInfo, SearchResult, SearchStats};

pub struct Engine {
    config: EngineConfig,
    tt: TranspositionTable,
    position: Position,
    stop: Arc<AtomicBool>,
    last_stats: SearchStats,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let tt = TranspositionTable::new(config.hash_mb);
        Self {
            config,
            tt,
            position: Position::startpos(),
            stop: Arc::new(AtomicBool::new(false)),
            last_stats: SearchStats::default(),
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn stats(&self) -> SearchStats {
        self.last_stats
    }

    pub fn side_to_move(&self) -> Color {
        self.position.side_to_move()
    }

    pub fn current_position_fen(&self) -> String {
        self.position.to_fen()
    }

    /// Bump the TT generation for a fresh game. Entries aren't cleared
    /// outright — stale-generation entries are simply eligible for
    /// replacement again, per the TT's own replacement policy.
    pub fn new_game(&mut self) {
        info!("ucinewgame: starting a new TT generation");
        self.tt.new_search();
        self.position = Position::startpos();
    }

    pub fn set_hash_size(&mut self, mb: usize) {
        info!(mb, "resizing transposition table");
        self.tt = TranspositionTable::new(mb);
        self.config.hash_mb = mb;
    }

    pub fn set_max_depth(&mut self, depth: u8) {
        self.config.max_depth = depth;
    }

    pub fn set_quiescence(&mut self, enabled: bool) {
        self.config.quiescence = enabled;
    }

    /// Apply an unrecognized `setoption` name: logged, never fatal.
    pub fn unknown_option(&self, name: &str) {
        let err = ProtocolError::UnknownOption {
            name: name.to_string(),
        };
        warn!(%err);
    }

    /// Set the current position from a FEN (or "startpos") plus a sequence
    /// of moves in long algebraic notation. An illegal move aborts the
    /// remainder of the command and leaves the position unchanged.
    pub fn set_position(&mut self, fen_or_startpos: &str, moves: &[String]) -> Result<(), ProtocolError> {
        let mut position = if fen_or_startpos == "startpos" {
            Position::startpos()
        } else {
            Position::from_fen(fen_or_startpos).map_err(ProtocolError::MalformedPosition)?
        };

        for mv_str in moves {
            let Some(mv) = find_move(&position, mv_str) else {
                warn!(mv = %mv_str, "illegal move in position command");
                return Err(ProtocolError::IllegalMove {
                    mv: mv_str.clone(),
                });
            };
            position.push(mv);
        }

        self.position = position;
        Ok(())
    }

    /// Run the time manager and iterative deepening; always returns a legal
    /// move (falling back to the first legal move if even depth 1 couldn't
    /// complete in time).
    pub fn choose_move(&mut self, clock: &ClockReport, mut on_iteration: impl FnMut(&IterationInfo)) -> SearchResult {
        let budget_ms = time::allocate(clock, self.config.time_ms);
        let mut ctx = SearchContext::new(&mut self.tt, Arc::clone(&self.stop), budget_ms, self.config.quiescence);

        let emit_depth_log = self.config.emit_depth_log;
        let result = search::iterative_deepening(&mut self.position, &mut ctx, &self.config, |info| {
            if emit_depth_log {
                debug!(
                    depth = info.depth,
                    score = info.score,
                    nodes = info.nodes,
                    elapsed_ms = info.elapsed_ms,
                    "iteration complete"
                );
            }
            on_iteration(info);
        });
        self.last_stats = result.stats;

        if result.best_move.is_some() {
            return result;
        }

        // Invariant-violation fallback: search could not complete even a
        // single iteration in the time available. Any legal move keeps the
        // UCI contract (always answer `go` with a `bestmove`).
        let fallback = self.position.legal_moves().into_iter().next();
        SearchResult {
            best_move: fallback,
            ..result
        }
    }

    /// Set the stop flag; observed by the search thread cooperatively,
    /// never forces a hard interrupt.
    pub fn stop(&self) {
        self.stop.store(true, Ordering::SeqCst);
    }
}

fn find_move(position: &Position, mv_str: &str) -> Option<Move> {
    position.parse_uci_move(mv_str)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_position_rejects_illegal_move_and_leaves_position_unchanged() {
        let mut engine = Engine::new(EngineConfig::default());
        let before = engine.position.zobrist_key();

        let result = engine.set_position("startpos", &["e2e5".to_string()]);
        assert!(result.is_err());
        assert_eq!(engine.position.zobrist_key(), before);
    }

    #[test]
    fn set_position_applies_legal_moves() {
        let mut engine = Engine::new(EngineConfig::default());
        engine
            .set_position("startpos", &["e2e4".to_string(), "e7e5".to_string()])
            .unwrap();
        assert_ne!(engine.position.zobrist_key(), Position::startpos().zobrist_key());
    }

    #[test]
    fn choose_move_always_returns_a_legal_move() {
        let mut engine = Engine::new(EngineConfig {
            max_depth: 3,
            ..EngineConfig::default()
        });
        let clock = ClockReport::default();
        let result = engine.choose_move(&clock, |_| {});
        assert!(result.best_move.is_some());
    }

    #[test]
    fn resizing_hash_clears_the_table() {
        let mut engine = Engine::new(EngineConfig::default());
        let clock = ClockReport::default();
        engine.choose_move(&clock, |_| {});
        engine.set_hash_size(2);
        assert!(engine.tt.probe(engine.position.zobrist_key()).is_none());
    }
}
