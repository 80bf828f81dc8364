use corvid::evaluation::evaluate;
use criterion::{criterion_group, criterion_main, Criterion};
use shakmaty::fen::Fen;
use shakmaty::{CastlingMode, Chess, Position as ChessPosition};

fn parse(fen: &str) -> Chess {
    let f: Fen = fen.parse().unwrap();
    f.into_position(CastlingMode::Standard).unwrap()
}

fn bench_evaluation(c: &mut Criterion) {
    let positions = vec![
        ("startpos", Chess::default()),
        ("middlegame", parse("r1bqkb1r/pppp1ppp/2n2n2/4p3/2B1P3/5N2/PPPP1PPP/RNBQK2R w KQkq - 4 4")),
        ("endgame", parse("8/5k2/8/8/8/8/4K3/4R3 w - - 0 1")),
        ("complex", parse("r1bq1rk1/pp2ppbp/2np2p1/2n5/P3PP2/N1P2N2/1PB3PP/R1B1QRK1 b - - 0 10")),
    ];
    for (name, board) in &positions {
        c.bench_function(&format!("eval_{}", name), |b| {
            b.iter(|| evaluate(board))
        });
    }
}

criterion_group!(benches, bench_evaluation);
criterion_main!(benches);
