//! Adapter between the search core and `shakmaty`, the rules-engine crate
//! consumed here as the out-of-scope "external library". The core never
//! reaches into `shakmaty` directly, only through this type.

use shakmaty::fen::Fen;
use shakmaty::zobrist::{Zobrist64, ZobristHash};
use shakmaty::{CastlingMode, Chess, Color, EnPassantMode, Move, Piece, Position as ChessPosition, Square};

/// Why a position is terminal (no further search is meaningful).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TerminalReason {
    Checkmate,
    Stalemate,
    InsufficientMaterial,
    FiftyMoveRule,
    Repetition,
}

impl TerminalReason {
    pub fn is_decisive(self) -> bool {
        matches!(self, TerminalReason::Checkmate)
    }
}

fn zobrist_of(pos: &Chess) -> u64 {
    pos.zobrist_hash::<Zobrist64>(EnPassantMode::Legal).0
}

/// Mutable position owned by the search. `push`/`pop` are exact inverses;
/// `undo_stack` lets `pop` restore the prior position without replaying
/// moves from the start.
pub struct Position {
    pos: Chess,
    undo_stack: Vec<Chess>,
    key_history: Vec<u64>,
}

impl Position {
    pub fn new(pos: Chess) -> Self {
        let key = zobrist_of(&pos);
        Self {
            pos,
            undo_stack: Vec::new(),
            key_history: vec![key],
        }
    }

    pub fn startpos() -> Self {
        Self::new(Chess::default())
    }

    pub fn from_fen(fen: &str) -> Result<Self, String> {
        let parsed: Fen = fen.parse().map_err(|e| format!("invalid FEN: {e}"))?;
        let pos: Chess = parsed
            .into_position(CastlingMode::Standard)
            .map_err(|e| format!("illegal position: {e}"))?;
        Ok(Self::new(pos))
    }

    /// The underlying `shakmaty` position, for the move generator and
    /// evaluator — the only two other places allowed to reach past this
    /// adapter and into the rules-engine crate's own types.
    pub fn inner(&self) -> &Chess {
        &self.pos
    }

    pub fn side_to_move(&self) -> Color {
        self.pos.turn()
    }

    pub fn zobrist_key(&self) -> u64 {
        *self.key_history.last().expect("key_history is never empty")
    }

    pub fn piece_at(&self, sq: Square) -> Option<Piece> {
        self.pos.board().piece_at(sq)
    }

    pub fn is_in_check(&self) -> bool {
        self.pos.is_check()
    }

    pub fn legal_moves(&self) -> Vec<Move> {
        self.pos.legal_moves().into_iter().collect()
    }

    pub fn is_legal(&self, mv: &Move) -> bool {
        self.pos.legal_moves().contains(mv)
    }

    pub fn parse_uci_move(&self, s: &str) -> Option<Move> {
        let uci: shakmaty::uci::Uci = s.parse().ok()?;
        uci.to_move(&self.pos).ok()
    }

    pub fn to_fen(&self) -> String {
        Fen::from_position(self.pos.clone(), EnPassantMode::Legal).to_string()
    }

    /// Push a move onto the position, recording enough state for an exact
    /// `pop()`. Does not validate legality — callers (search, UCI parsing)
    /// are expected to only push moves drawn from `legal_moves()` or
    /// validated with `is_legal`.
    pub fn push(&mut self, mv: Move) {
        self.undo_stack.push(self.pos.clone());
        self.pos.play_unchecked(&mv);
        self.key_history.push(zobrist_of(&self.pos));
    }

    /// Undo the most recent `push`. Panics if called without a matching
    /// push — that would be a programming bug (an invariant violation per
    /// the error-handling design), not a recoverable runtime condition.
    pub fn pop(&mut self) {
        self.pos = self
            .undo_stack
            .pop()
            .expect("pop() called without a matching push()");
        self.key_history.pop();
    }

    /// RAII guard: pushes now, pops on drop. Keeps push/pop paired across
    /// early returns (cancellation, `?`) without manual bookkeeping at each
    /// call site — this is what `negamax`/`quiescence` push moves through.
    pub fn push_guarded(&mut self, mv: Move) -> PositionGuard<'_> {
        self.push(mv);
        PositionGuard { pos: self }
    }

    fn is_repetition(&self) -> bool {
        let current = self.zobrist_key();
        // Exclude the current entry itself; look for any earlier occurrence.
        self.key_history[..self.key_history.len() - 1]
            .iter()
            .any(|&k| k == current)
    }

    pub fn is_terminal(&self) -> Option<TerminalReason> {
        if self.pos.is_checkmate() {
            return Some(TerminalReason::Checkmate);
        }
        if self.pos.is_stalemate() {
            return Some(TerminalReason::Stalemate);
        }
        if self.pos.is_insufficient_material() {
            return Some(TerminalReason::InsufficientMaterial);
        }
        if self.pos.halfmoves() >= 100 {
            return Some(TerminalReason::FiftyMoveRule);
        }
        if self.is_repetition() {
            return Some(TerminalReason::Repetition);
        }
        None
    }
}

/// Convert a move to its long algebraic (UCI) text.
pub fn move_to_uci(mv: &Move) -> String {
    mv.to_uci(CastlingMode::Standard).to_string()
}

/// Scoped push: pops automatically when dropped, including on early return
/// from the recursive search (cancellation) or a panic unwind.
pub struct PositionGuard<'a> {
    pos: &'a mut Position,
}

impl std::ops::Deref for PositionGuard<'_> {
    type Target = Position;
    fn deref(&self) -> &Position {
        self.pos
    }
}

impl std::ops::DerefMut for PositionGuard<'_> {
    fn deref_mut(&mut self) -> &mut Position {
        self.pos
    }
}

impl Drop for PositionGuard<'_> {
    fn drop(&mut self) {
        self.pos.pop();
    }
}
