use arrayvec::ArrayVec;
use shakmaty::{Chess, Move, Position as ChessPosition, Role};

use crate::pst::MVV_VALUE;
use crate::types::Score;

pub struct ScoredMove {
    pub mv: Move,
    pub score: Score,
}

fn role_index(role: Role) -> usize {
    match role {
        Role::Pawn => 0,
        Role::Knight => 1,
        Role::Bishop => 2,
        Role::Rook => 3,
        Role::Queen => 4,
        Role::King => 5,
    }
}

/// MVV-LVA capture bonus plus a flat promotion bonus, shared by both
/// ordering passes below.
fn capture_and_promotion_bonus(mv: &Move) -> Score {
    let mut s: Score = 0;
    if mv.is_capture() {
        s += 10_000;
        let victim_idx = mv.capture().map(role_index).unwrap_or(role_index(Role::Pawn));
        let attacker_idx = role_index(mv.role());
        s += MVV_VALUE[victim_idx] * 10 - attacker_idx as Score;
    }
    if mv.promotion().is_some() {
        s += 9_000;
    }
    s
}

/// Generates and orders moves for a position.
/// Priority: (1) hash move, (2) captures and capture-promotions by MVV-LVA,
/// (3) remaining quiet moves in generator order.
pub fn order_moves(pos: &Chess, hash_move: Option<Move>) -> ArrayVec<ScoredMove, 256> {
    let mut scored: ArrayVec<ScoredMove, 256> = ArrayVec::new();

    for mv in pos.legal_moves() {
        let score = if hash_move.as_ref() == Some(&mv) {
            100_000
        } else {
            capture_and_promotion_bonus(&mv)
        };
        scored.push(ScoredMove { mv, score });
    }

    scored.sort_unstable_by(|a, b| b.score.cmp(&a.score));
    scored
}

/// Generates captures and non-capture promotions for quiescence search,
/// ordered by MVV-LVA. Non-capture promotions are folded into this tier
/// alongside captures: a pawn reaching the back rank is too significant a
/// material swing for quiescence to ignore just because the destination
/// square is empty.
pub fn order_captures(pos: &Chess) -> ArrayVec<ScoredMove, 256> {
    let mut scored: ArrayVec<ScoredMove, 256> = ArrayVec::new();

    for mv in pos.legal_moves() {
        if !mv.is_capture() && mv.promotion().is_none() {
            continue;
        }
        let score = capture_and_promotion_bonus(&mv);
        scored.push(ScoredMove { mv, score });
    }

    scored.sort_unstable_by(|a, b| b.score.cmp(&a.score));
    scored
}
