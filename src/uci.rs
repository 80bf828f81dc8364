//! A thin line-oriented UCI loop: tokenize, dispatch to [`Engine`], format
//! the result back out. No chess logic lives here.

use std::io::{self, BufRead};
use std::thread;

use shakmaty::Color;

use crate::engine::Engine;
use crate::position::move_to_uci;
use crate::search::format_score;
use crate::time::ClockReport;
use crate::types::IterationInfo;

pub fn run(engine: Engine) {
    let stdin = io::stdin();
    let mut engine: Option<Engine> = Some(engine);
    let mut search_thread: Option<thread::JoinHandle<Engine>> = None;

    for line in stdin.lock().lines() {
        let Ok(line) = line else { break };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let tokens: Vec<&str> = line.split_whitespace().collect();

        match tokens[0] {
            "uci" => {
                println!("id name corvid");
                println!("id author corvid contributors");
                println!("option name Hash type spin default 128 min 1 max 4096");
                println!("option name MaxDepth type spin default 6 min 1 max 64");
                println!("option name Quiescence type check default true");
                println!("option name Threads type spin default 1 min 1 max 1");
                println!("uciok");
            }
            "isready" => {
                join_search(&mut search_thread, &mut engine);
                println!("readyok");
            }
            "ucinewgame" => {
                join_search(&mut search_thread, &mut engine);
                if let Some(e) = engine.as_mut() {
                    e.new_game();
                }
            }
            "position" => {
                join_search(&mut search_thread, &mut engine);
                if let Some(e) = engine.as_mut() {
                    apply_position(e, &tokens);
                }
            }
            "go" => {
                join_search(&mut search_thread, &mut engine);
                if let Some(e) = engine.take() {
                    let clock = parse_go(&tokens, e.side_to_move());
                    search_thread = Some(spawn_search(e, clock));
                }
            }
            "stop" => {
                if let Some(e) = engine.as_ref() {
                    e.stop();
                }
                join_search(&mut search_thread, &mut engine);
            }
            "setoption" => {
                join_search(&mut search_thread, &mut engine);
                if let Some(e) = engine.as_mut() {
                    apply_setoption(e, &tokens);
                }
            }
            "quit" => {
                if let Some(e) = engine.as_ref() {
                    e.stop();
                }
                join_search(&mut search_thread, &mut engine);
                break;
            }
            "d" | "print" => {
                if let Some(e) = engine.as_ref() {
                    println!("{}", e.current_position_fen());
                }
            }
            _ => {}
        }
    }
}

/// Wait for an in-flight search thread, if any, and recover its `Engine`.
fn join_search(handle: &mut Option<thread::JoinHandle<Engine>>, engine: &mut Option<Engine>) {
    if let Some(h) = handle.take() {
        if let Ok(recovered) = h.join() {
            *engine = Some(recovered);
        }
        // A panicked search thread leaves `engine` as `None`; the loop's
        // remaining commands become no-ops, which is preferable to
        // panicking the whole process over one bad search.
    }
}

fn spawn_search(mut engine: Engine, clock: ClockReport) -> thread::JoinHandle<Engine> {
    thread::spawn(move || {
        let result = engine.choose_move(&clock, |info: &IterationInfo| {
            let pv_str: String = info.pv.iter().map(move_to_uci).collect::<Vec<_>>().join(" ");
            println!(
                "info depth {} {} nodes {} time {} nps {} pv {}",
                info.depth,
                format_score(info.score),
                info.nodes,
                info.elapsed_ms,
                info.nps,
                pv_str
            );
        });

        match result.best_move {
            Some(mv) => println!("bestmove {}", move_to_uci(&mv)),
            None => println!("bestmove 0000"),
        }

        engine
    })
}

fn apply_position(engine: &mut Engine, tokens: &[&str]) {
    if tokens.len() < 2 {
        return;
    }

    let mut idx = 1;
    let fen_or_startpos;

    if tokens[idx] == "startpos" {
        fen_or_startpos = "startpos".to_string();
        idx += 1;
    } else if tokens[idx] == "fen" {
        idx += 1;
        let mut fen_parts: Vec<&str> = Vec::new();
        while idx < tokens.len() && tokens[idx] != "moves" && fen_parts.len() < 6 {
            fen_parts.push(tokens[idx]);
            idx += 1;
        }
        if fen_parts.len() < 4 {
            return;
        }
        fen_or_startpos = fen_parts.join(" ");
    } else {
        return;
    }

    let moves: Vec<String> = if idx < tokens.len() && tokens[idx] == "moves" {
        tokens[idx + 1..].iter().map(|s| s.to_string()).collect()
    } else {
        Vec::new()
    };

    if let Err(err) = engine.set_position(&fen_or_startpos, &moves) {
        tracing::warn!(%err, "position command partially applied");
    }
}

fn parse_go(tokens: &[&str], side: Color) -> ClockReport {
    let mut report = ClockReport::default();
    let (mut wtime, mut btime, mut winc, mut binc) = (None, None, None, None);
    let mut i = 1;

    while i < tokens.len() {
        match tokens[i] {
            "depth" => {
                i += 1;
                if i < tokens.len() {
                    report.fixed_depth = tokens[i].parse().ok();
                }
            }
            "movetime" => {
                i += 1;
                if i < tokens.len() {
                    report.movetime_ms = tokens[i].parse().ok();
                }
            }
            "wtime" => {
                i += 1;
                if i < tokens.len() {
                    wtime = tokens[i].parse().ok();
                }
            }
            "btime" => {
                i += 1;
                if i < tokens.len() {
                    btime = tokens[i].parse().ok();
                }
            }
            "winc" => {
                i += 1;
                if i < tokens.len() {
                    winc = tokens[i].parse().ok();
                }
            }
            "binc" => {
                i += 1;
                if i < tokens.len() {
                    binc = tokens[i].parse().ok();
                }
            }
            "movestogo" => {
                i += 1;
                if i < tokens.len() {
                    report.movestogo = tokens[i].parse().ok();
                }
            }
            "infinite" => {
                report.infinite = true;
            }
            _ => {}
        }
        i += 1;
    }

    let (remaining, inc) = match side {
        Color::White => (wtime, winc),
        Color::Black => (btime, binc),
    };
    report.remaining_ms = remaining;
    report.increment_ms = inc;

    report
}

fn apply_setoption(engine: &mut Engine, tokens: &[&str]) {
    let name_idx = tokens.iter().position(|&t| t == "name");
    let value_idx = tokens.iter().position(|&t| t == "value");

    let (Some(ni), Some(vi)) = (name_idx, value_idx) else {
        return;
    };

    let name: String = tokens[ni + 1..vi].join(" ");
    let value: String = tokens[vi + 1..].join(" ");

    match name.to_lowercase().as_str() {
        "hash" => {
            if let Ok(mb) = value.parse::<usize>() {
                engine.set_hash_size(mb.clamp(1, 4096));
            }
        }
        "maxdepth" => {
            if let Ok(depth) = value.parse::<u8>() {
                engine.set_max_depth(depth);
            }
        }
        "quiescence" => {
            if let Ok(enabled) = value.parse::<bool>() {
                engine.set_quiescence(enabled);
            }
        }
        "threads" | "moveoverhead" => {
            // Reported in `uci` but fixed; nothing to apply.
        }
        other => engine.unknown_option(other),
    }
}
