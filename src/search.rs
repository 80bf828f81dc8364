//! Iterative-deepening alpha-beta negamax over a [`Position`], with a
//! transposition table, MVV-LVA move ordering, and quiescence search.
//!
//! Cancellation is modeled as `Option<Score>` rather than a magic sentinel
//! value: `None` means "the deadline or stop flag fired partway through this
//! subtree", and propagates upward through `?`. No TT store happens on a
//! cancelled subtree — a partial score is not a sound bound.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use shakmaty::Move;

use crate::evaluation::evaluate;
use crate::movegen::{order_captures, order_moves};
use crate::position::Position;
use crate::tt::{TTFlag, TranspositionTable};
use crate::types::{
    EngineConfig, IterationInfo, Score, SearchResult, SearchStats, MAX_PLY, SCORE_INFINITY, SCORE_MATE,
};

/// Per-`choose_move` mutable state: node counters, the stop flag, and the
/// deadline. Constructed fresh for every search; the TT is the only thing
/// that survives across calls, owned by the engine façade.
pub struct SearchContext<'a> {
    pub stats: SearchStats,
    pub start_time: Instant,
    pub stop: Arc<AtomicBool>,
    pub deadline_ms: Option<u64>,
    pub tt: &'a mut TranspositionTable,
    pub quiescence_enabled: bool,
    root_best_move: Option<Move>,
}

impl<'a> SearchContext<'a> {
    /// `stop` is supplied by the caller (the engine façade) rather than
    /// created fresh here, so a `stop()` call from another thread can reach
    /// the same flag this context is checking.
    pub fn new(
        tt: &'a mut TranspositionTable,
        stop: Arc<AtomicBool>,
        deadline_ms: Option<u64>,
        quiescence_enabled: bool,
    ) -> Self {
        stop.store(false, Ordering::SeqCst);
        Self {
            stats: SearchStats::default(),
            start_time: Instant::now(),
            stop,
            deadline_ms,
            tt,
            quiescence_enabled,
            root_best_move: None,
        }
    }

    fn check_time(&self) {
        if let Some(limit) = self.deadline_ms {
            if self.start_time.elapsed().as_millis() as u64 >= limit {
                self.stop.store(true, Ordering::Relaxed);
            }
        }
    }

    fn is_cancelled(&self) -> bool {
        self.stop.load(Ordering::Relaxed)
    }
}

/// Extract the principal variation by following the TT's hash-move chain
/// from `pos`'s current position, stopping on a repeated key (cycle guard),
/// a missing entry, or an illegal stored move.
fn extract_pv(pos: &mut Position, tt: &TranspositionTable, max_moves: usize) -> Vec<Move> {
    let mut pv = Vec::new();
    let mut seen: Vec<u64> = Vec::new();
    let mut pushed = 0usize;

    for _ in 0..max_moves {
        let hash = pos.zobrist_key();
        if seen.contains(&hash) {
            break;
        }
        seen.push(hash);

        let Some(entry) = tt.probe(hash) else { break };
        let Some(ref mv) = entry.best_move else { break };
        if !pos.is_legal(&mv) {
            break;
        }
        pv.push(mv.clone());
        pos.push(mv.clone());
        pushed += 1;
    }

    for _ in 0..pushed {
        pos.pop();
    }

    pv
}

/// Run iterative deepening from `pos`'s current position up to `max_depth`,
/// calling `on_iteration` after each completed iteration. `pos` is restored
/// to its original position on return regardless of how the search ends.
pub fn iterative_deepening(
    pos: &mut Position,
    ctx: &mut SearchContext,
    config: &EngineConfig,
    mut on_iteration: impl FnMut(&IterationInfo),
) -> SearchResult {
    let mut best_move: Option<Move> = None;
    let mut best_score: Score = 0;
    let mut depth_reached = 0u8;

    for depth in 1..=config.max_depth {
        ctx.root_best_move = None;
        let score = negamax(pos, ctx, depth, 0, -SCORE_INFINITY, SCORE_INFINITY);

        let Some(score) = score else {
            // Cancelled mid-iteration: keep the previous iteration's result,
            // but fall back to whatever root move we had if this is the
            // very first iteration and it didn't even finish.
            if best_move.is_none() {
                best_move = ctx.root_best_move.clone();
            }
            break;
        };

        best_score = score;
        depth_reached = depth;
        if let Some(ref mv) = ctx.root_best_move {
            best_move = Some(mv.clone());
        }

        let elapsed_ms = ctx.start_time.elapsed().as_millis().max(1) as u64;
        let nps = ctx.stats.nodes * 1000 / elapsed_ms;
        ctx.stats.elapsed_ms = elapsed_ms;
        ctx.stats.depth_reached = depth_reached;

        let pv = extract_pv(pos, ctx.tt, depth as usize);
        on_iteration(&IterationInfo {
            depth,
            score: best_score,
            nodes: ctx.stats.nodes,
            elapsed_ms,
            nps,
            pv,
        });

        if ctx.is_cancelled() {
            break;
        }

        // Soft limit: don't start another iteration once half the budget is spent.
        if let Some(limit) = ctx.deadline_ms {
            if ctx.start_time.elapsed().as_millis() as u64 > limit / 2 {
                break;
            }
        }

        if crate::types::is_mate_score(best_score) {
            break;
        }
    }

    ctx.stats.elapsed_ms = ctx.start_time.elapsed().as_millis() as u64;
    ctx.stats.depth_reached = depth_reached;

    SearchResult {
        best_move,
        score: best_score,
        pv: extract_pv(pos, ctx.tt, depth_reached.max(1) as usize),
        stats: ctx.stats,
    }
}

/// Negamax with alpha-beta pruning and TT. Returns `None` if cancelled.
fn negamax(
    pos: &mut Position,
    ctx: &mut SearchContext,
    depth: u8,
    ply: usize,
    mut alpha: Score,
    beta: Score,
) -> Option<Score> {
    ctx.stats.nodes += 1;
    if ctx.stats.nodes & 2047 == 0 {
        ctx.check_time();
    }
    if ctx.is_cancelled() {
        return None;
    }

    if let Some(reason) = pos.is_terminal() {
        return Some(if reason.is_decisive() {
            -SCORE_MATE + ply as Score
        } else {
            0
        });
    }

    if depth == 0 {
        return quiescence(pos, ctx, ply, alpha, beta);
    }

    let hash = pos.zobrist_key();
    let mut hash_move: Option<Move> = None;

    ctx.stats.tt_probes += 1;
    if let Some(entry) = ctx.tt.probe(hash) {
        ctx.stats.tt_hits += 1;
        hash_move = entry.best_move.clone();
        if entry.depth >= depth {
            if let Some(score) = TranspositionTable::retrieve_score(entry, ply, alpha, beta) {
                return Some(score);
            }
        }
    }

    let moves = order_moves(pos.inner(), hash_move);
    if moves.is_empty() {
        // is_terminal() above only catches checkmate/stalemate up front; a
        // position can still run out of moves here after TT-guided pruning
        // hasn't touched move generation at all, so this is a reachable
        // terminal case, not just a defensive fallback.
        return Some(if pos.is_in_check() {
            -SCORE_MATE + ply as Score
        } else {
            0
        });
    }

    let mut best_score = -SCORE_INFINITY;
    let mut best_move: Option<Move> = None;
    let original_alpha = alpha;

    for scored_move in moves.iter() {
        let score = {
            let mut guard = pos.push_guarded(scored_move.mv.clone());
            negamax(&mut guard, ctx, depth - 1, ply + 1, -beta, -alpha).map(|s| -s)
        };

        let Some(score) = score else {
            return None;
        };

        if score > best_score {
            best_score = score;
            best_move = Some(scored_move.mv.clone());
            if ply == 0 {
                ctx.root_best_move = Some(scored_move.mv.clone());
            }
        }

        if score > alpha {
            alpha = score;
        }

        if alpha >= beta {
            ctx.stats.cutoffs += 1;
            break;
        }
    }

    let flag = if best_score >= beta {
        TTFlag::LowerBound
    } else if best_score <= original_alpha {
        TTFlag::UpperBound
    } else {
        TTFlag::Exact
    };
    ctx.tt.store(hash, depth, best_score, flag, best_move, ply);

    Some(best_score)
}

/// Quiescence search: explores captures when quiet, all legal replies when
/// in check (standing pat is illegal while in check). Returns `None` if
/// cancelled.
fn quiescence(pos: &mut Position, ctx: &mut SearchContext, ply: usize, mut alpha: Score, beta: Score) -> Option<Score> {
    ctx.stats.nodes += 1;
    ctx.stats.qnodes += 1;

    if ctx.stats.nodes & 2047 == 0 {
        ctx.check_time();
    }
    if ctx.is_cancelled() {
        return None;
    }

    if ply >= MAX_PLY {
        return Some(evaluate(pos.inner()));
    }

    if !ctx.quiescence_enabled {
        return Some(evaluate(pos.inner()));
    }

    let in_check = pos.is_in_check();

    if in_check {
        let moves = order_moves(pos.inner(), None);
        if moves.is_empty() {
            return Some(-SCORE_MATE + ply as Score);
        }

        let mut best_score = -SCORE_INFINITY;
        for scored_move in &moves {
            let score = {
                let mut guard = pos.push_guarded(scored_move.mv.clone());
                quiescence(&mut guard, ctx, ply + 1, -beta, -alpha).map(|s| -s)
            };

            let Some(score) = score else { return None };

            if score > best_score {
                best_score = score;
            }
            if score > alpha {
                alpha = score;
            }
            if alpha >= beta {
                return Some(best_score);
            }
        }
        return Some(best_score);
    }

    let stand_pat = evaluate(pos.inner());
    let mut best_score = stand_pat;

    if stand_pat >= beta {
        return Some(best_score);
    }
    if stand_pat > alpha {
        alpha = stand_pat;
    }

    let captures = order_captures(pos.inner());
    for scored_move in &captures {
        let score = {
            let mut guard = pos.push_guarded(scored_move.mv.clone());
            quiescence(&mut guard, ctx, ply + 1, -beta, -alpha).map(|s| -s)
        };

        let Some(score) = score else { return None };

        if score > best_score {
            best_score = score;
        }
        if score > alpha {
            alpha = score;
        }
        if alpha >= beta {
            return Some(best_score);
        }
    }

    Some(best_score)
}

/// Format a score for UCI output (centipawns or mate-in-N).
pub fn format_score(score: Score) -> String {
    if crate::types::is_mate_score(score) {
        let mate_ply = SCORE_MATE - score.abs();
        let mate_moves = (mate_ply + 1) / 2;
        if score > 0 {
            format!("score mate {}", mate_moves)
        } else {
            format!("score mate -{}", mate_moves)
        }
    } else {
        format!("score cp {}", score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::position::move_to_uci;
    use crate::tt::TranspositionTable;

    fn run(pos: &mut Position, max_depth: u8) -> SearchResult {
        let mut tt = TranspositionTable::new(1);
        let mut ctx = SearchContext::new(&mut tt, Arc::new(AtomicBool::new(false)), None, true);
        let config = EngineConfig {
            max_depth,
            ..EngineConfig::default()
        };
        iterative_deepening(pos, &mut ctx, &config, |_| {})
    }

    #[test]
    fn finds_a_move_from_the_start_position() {
        let mut pos = Position::startpos();
        let result = run(&mut pos, 3);
        assert!(result.best_move.is_some());
    }

    #[test]
    fn finds_mate_in_one() {
        let mut pos =
            Position::from_fen("r1bqkb1r/pppp1ppp/2n2n2/4p2Q/2B1P3/8/PPPP1PPP/RNB1K1NR w KQkq - 4 4")
                .unwrap();
        let result = run(&mut pos, 2);
        let best = result.best_move.unwrap();
        assert_eq!(
            move_to_uci(&best),
            "h5f7",
            "expected Qxf7#, got {}",
            move_to_uci(&best)
        );
    }

    #[test]
    fn checkmate_score_is_very_negative_for_side_to_move() {
        let mut pos = Position::from_fen(
            "rnbqkbnr/pppp1ppp/4p3/8/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3",
        )
        .unwrap();
        let mut tt = TranspositionTable::new(1);
        let mut ctx = SearchContext::new(&mut tt, Arc::new(AtomicBool::new(false)), None, true);
        let score = negamax(&mut pos, &mut ctx, 1, 0, -SCORE_INFINITY, SCORE_INFINITY).unwrap();
        assert!(score < -SCORE_MATE + 200);
    }

    #[test]
    fn repeated_search_with_primed_tt_never_needs_more_nodes() {
        let mut pos = Position::startpos();
        let mut tt = TranspositionTable::new(4);
        let config = EngineConfig {
            max_depth: 4,
            ..EngineConfig::default()
        };

        let mut ctx = SearchContext::new(&mut tt, Arc::new(AtomicBool::new(false)), None, true);
        iterative_deepening(&mut pos, &mut ctx, &config, |_| {});
        let nodes_first = ctx.stats.nodes;

        let mut ctx2 = SearchContext::new(&mut tt, Arc::new(AtomicBool::new(false)), None, true);
        iterative_deepening(&mut pos, &mut ctx2, &config, |_| {});
        let nodes_second = ctx2.stats.nodes;

        assert!(
            nodes_second <= nodes_first,
            "second search ({nodes_second}) should not need more nodes than the first ({nodes_first})"
        );
    }

    #[test]
    fn quiescence_in_check_returns_mate_score() {
        let mut pos = Position::from_fen(
            "rnbqkbnr/pppp1ppp/4p3/8/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3",
        )
        .unwrap();
        let mut tt = TranspositionTable::new(1);
        let mut ctx = SearchContext::new(&mut tt, Arc::new(AtomicBool::new(false)), None, true);
        let score = quiescence(&mut pos, &mut ctx, 0, -SCORE_INFINITY, SCORE_INFINITY).unwrap();
        assert!(score < -SCORE_MATE + 200);
    }

    #[test]
    fn stop_flag_preserves_the_last_completed_iteration() {
        let mut pos = Position::startpos();
        let mut tt = TranspositionTable::new(1);
        let mut ctx = SearchContext::new(&mut tt, Arc::new(AtomicBool::new(false)), Some(1), true);
        let config = EngineConfig {
            max_depth: 30,
            ..EngineConfig::default()
        };
        let result = iterative_deepening(&mut pos, &mut ctx, &config, |_| {});
        assert!(result.best_move.is_some());
    }

    #[test]
    fn pv_extraction_restores_the_original_position() {
        let mut pos = Position::startpos();
        let before = pos.zobrist_key();
        run(&mut pos, 4);
        assert_eq!(pos.zobrist_key(), before);
    }

    #[test]
    fn mate_score_formatting() {
        assert_eq!(format_score(SCORE_MATE - 1), "score mate 1");
        assert_eq!(format_score(SCORE_MATE - 3), "score mate 2");
        assert_eq!(format_score(-(SCORE_MATE - 1)), "score mate -1");
        assert_eq!(format_score(-(SCORE_MATE - 3)), "score mate -2");
        assert_eq!(format_score(100), "score cp 100");
        assert_eq!(format_score(-50), "score cp -50");
    }

    #[test]
    fn disabling_quiescence_still_returns_a_move() {
        let mut pos = Position::startpos();
        let mut tt = TranspositionTable::new(1);
        let mut ctx = SearchContext::new(&mut tt, Arc::new(AtomicBool::new(false)), None, false);
        let config = EngineConfig {
            max_depth: 3,
            quiescence: false,
            ..EngineConfig::default()
        };
        let result = iterative_deepening(&mut pos, &mut ctx, &config, |_| {});
        assert!(result.best_move.is_some());
    }
}
