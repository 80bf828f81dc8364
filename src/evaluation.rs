//! Tapered material + piece-square evaluation, from the side-to-move's
//! perspective. No randomness, no time dependence, no knowledge of search —
//! terminal positions (mate/stalemate/draw) are scored by the search, not here.

use shakmaty::{Chess, Color, Position as ChessPosition, Role, Square};

use crate::pst::{self, EG_TABLE, EG_PIECE_VALUE, MG_TABLE, MG_PIECE_VALUE, PHASE_WEIGHT, TOTAL_PHASE};
use crate::types::Score;

fn role_index(role: Role) -> usize {
    match role {
        Role::Pawn => pst::PAWN,
        Role::Knight => pst::KNIGHT,
        Role::Bishop => pst::BISHOP,
        Role::Rook => pst::ROOK,
        Role::Queen => pst::QUEEN,
        Role::King => pst::KING,
    }
}

/// PST tables are stored a8-first; a White piece on `sq` (a1=0 LERF) reads
/// the rank-mirrored index, a Black piece reads `sq` directly.
fn pst_index(sq: Square, color: Color) -> usize {
    match color {
        Color::White => sq as usize ^ 56,
        Color::Black => sq as usize,
    }
}

/// Tapered material+PST evaluation of `pos`, in centipawns, from the
/// perspective of the side to move.
pub fn evaluate(pos: &Chess) -> Score {
    let board = pos.board();
    let mut mg_score: [Score; 2] = [0, 0];
    let mut eg_score: [Score; 2] = [0, 0];
    let mut phase: i32 = 0;

    for sq in Square::ALL {
        let Some(piece) = board.piece_at(sq) else {
            continue;
        };
        let idx = role_index(piece.role);
        let side = piece.color as usize;

        mg_score[side] += MG_PIECE_VALUE[idx];
        eg_score[side] += EG_PIECE_VALUE[idx];

        let pst_idx = pst_index(sq, piece.color);
        mg_score[side] += MG_TABLE[idx][pst_idx];
        eg_score[side] += EG_TABLE[idx][pst_idx];

        phase += PHASE_WEIGHT[idx];
    }

    let phase = phase.min(TOTAL_PHASE);

    let mg = mg_score[Color::White as usize] - mg_score[Color::Black as usize];
    let eg = eg_score[Color::White as usize] - eg_score[Color::Black as usize];

    // phase == TOTAL_PHASE: full midgame weight. phase == 0: full endgame weight.
    let score = (mg * phase + eg * (TOTAL_PHASE - phase)) / TOTAL_PHASE;

    if pos.turn() == Color::White {
        score
    } else {
        -score
    }
}
