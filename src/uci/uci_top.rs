//! UCI protocol front-end and command loop.
//!
//! Parses UCI commands, maintains current position state, routes `go`
//! requests to the root search driver, and emits protocol-compliant output.
//! The loop is synchronous: `go` blocks until the driver returns, matching
//! the blocking dispatch model underneath.

use std::io::{self, BufRead, Write};

use log::error;

use crate::compute::backend::ComputeError;
use crate::compute::cpu::CpuBackend;
use crate::compute::session::ComputeSession;
use crate::config::EngineConfig;
use crate::position::moves::{format_move, parse_move};
use crate::position::piece::Color;
use crate::search::driver::{EngineSession, SearchReport};
use crate::search::time_control::{ClockState, TimeControl};

const UCI_ENGINE_NAME: &str = "Photon Chess";
const UCI_ENGINE_AUTHOR: &str = "the photon developers";

const DEFAULT_DEPTH_LIMIT: u8 = 64;

pub fn run_stdio_loop(config: &EngineConfig) -> io::Result<()> {
    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut uci = match UciState::new(config) {
        Ok(uci) => uci,
        Err(err) => {
            error!("could not start a compute session: {err}");
            writeln!(stdout, "info string compute session error: {err}")?;
            return Ok(());
        }
    };

    for line in stdin.lock().lines() {
        let line = line?;
        let should_quit = uci.handle_command(&line, &mut stdout)?;
        stdout.flush()?;
        if should_quit {
            break;
        }
    }
    uci.engine.shutdown();

    Ok(())
}

struct UciState {
    engine: EngineSession<CpuBackend>,
    depth_limit: u8,
}

impl UciState {
    fn new(config: &EngineConfig) -> Result<Self, ComputeError> {
        let mut session = ComputeSession::new(CpuBackend::new());
        session.bind(
            config.device,
            config.geometry,
            config.tt1_memory_bytes,
            config.tt2_memory_bytes,
        )?;
        let mut engine = EngineSession::new(session);
        engine.set_nodes_per_second(config.nodes_per_second);
        Ok(Self {
            engine,
            depth_limit: DEFAULT_DEPTH_LIMIT,
        })
    }

    fn handle_command(&mut self, line: &str, out: &mut impl Write) -> io::Result<bool> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(false);
        }

        let mut parts = trimmed.split_whitespace();
        let cmd = parts.next().unwrap_or_default();

        match cmd {
            "uci" => {
                writeln!(out, "id name {}", UCI_ENGINE_NAME)?;
                writeln!(out, "id author {}", UCI_ENGINE_AUTHOR)?;
                writeln!(out, "option name Depth type spin default 64 min 1 max 64")?;
                writeln!(out, "uciok")?;
            }
            "isready" => {
                writeln!(out, "readyok")?;
            }
            "setoption" => {
                if let Err(err) = self.handle_setoption(trimmed) {
                    writeln!(out, "info string setoption error: {}", err)?;
                }
            }
            "ucinewgame" => {
                self.engine.new_game();
            }
            "position" => {
                if let Err(err) = self.handle_position(trimmed) {
                    writeln!(out, "info string position error: {}", err)?;
                }
            }
            "go" => {
                if let Err(err) = self.handle_go(trimmed, out) {
                    // A device failure tore the session down; nothing more
                    // can be searched this run.
                    error!("search failed: {err}");
                    writeln!(out, "info string go error: {}", err)?;
                    writeln!(out, "bestmove 0000")?;
                    return Ok(true);
                }
            }
            "stop" | "ponderhit" | "debug" | "register" => {
                // Search is synchronous; nothing to interrupt.
            }
            "quit" => {
                return Ok(true);
            }
            _ => {
                // Unknown commands are ignored for UCI compatibility.
            }
        }

        Ok(false)
    }

    fn handle_setoption(&mut self, line: &str) -> Result<(), String> {
        let mut tokens = line.split_whitespace();
        let _ = tokens.next(); // setoption

        let mut name_tokens = Vec::<String>::new();
        let mut value_tokens = Vec::<String>::new();
        let mut mode = "";
        for tok in tokens {
            match tok {
                "name" => mode = "name",
                "value" => mode = "value",
                _ if mode == "name" => name_tokens.push(tok.to_owned()),
                _ if mode == "value" => value_tokens.push(tok.to_owned()),
                _ => {}
            }
        }
        let name = name_tokens.join(" ");
        let value = value_tokens.join(" ");

        if name.eq_ignore_ascii_case("Depth") {
            let parsed = value
                .parse::<u8>()
                .map_err(|_| format!("invalid Depth value '{}'", value))?;
            self.depth_limit = parsed.clamp(1, DEFAULT_DEPTH_LIMIT);
            Ok(())
        } else {
            Err(format!("unknown option '{}'", name))
        }
    }

    fn handle_position(&mut self, line: &str) -> Result<(), String> {
        let mut tokens = line.split_whitespace().peekable();
        let _ = tokens.next(); // position

        match tokens.next() {
            Some("startpos") => {
                self.engine.new_game();
            }
            Some("fen") => {
                let mut fen_tokens = Vec::new();
                while let Some(&tok) = tokens.peek() {
                    if tok == "moves" {
                        break;
                    }
                    fen_tokens.push(tok);
                    tokens.next();
                }
                let fen = fen_tokens.join(" ");
                self.engine
                    .set_position_fen(&fen)
                    .map_err(|err| err.to_string())?;
            }
            other => return Err(format!("expected startpos or fen, got {:?}", other)),
        }

        if tokens.next() == Some("moves") {
            for text in tokens {
                let mv = parse_move(text, self.engine.board(), self.engine.side_to_move())
                    .map_err(|err| format!("move '{}': {}", text, err))?;
                self.engine.play_move(mv);
            }
        }
        Ok(())
    }

    fn handle_go(&mut self, line: &str, out: &mut impl Write) -> io::Result<()> {
        let mut depth = self.depth_limit;
        let mut movetime: Option<u64> = None;
        let mut wtime: Option<u64> = None;
        let mut btime: Option<u64> = None;
        let mut winc = 0u64;
        let mut binc = 0u64;
        let mut movestogo: Option<u32> = None;
        let mut perft_depth: Option<u8> = None;

        let mut tokens = line.split_whitespace();
        let _ = tokens.next(); // go
        // Only keywords that carry a value consume the next token;
        // valueless flags like `infinite` and `ponder` must not swallow
        // the keyword that follows them.
        while let Some(tok) = tokens.next() {
            match tok {
                "depth" => {
                    if let Some(v) = tokens.next().and_then(|s| s.parse::<u8>().ok()) {
                        depth = v.clamp(1, DEFAULT_DEPTH_LIMIT);
                    }
                }
                "perft" => perft_depth = tokens.next().and_then(|s| s.parse::<u8>().ok()),
                "movetime" => movetime = tokens.next().and_then(|s| s.parse::<u64>().ok()),
                "wtime" => wtime = tokens.next().and_then(|s| s.parse::<u64>().ok()),
                "btime" => btime = tokens.next().and_then(|s| s.parse::<u64>().ok()),
                "winc" => winc = tokens.next().and_then(|s| s.parse::<u64>().ok()).unwrap_or(0),
                "binc" => binc = tokens.next().and_then(|s| s.parse::<u64>().ok()).unwrap_or(0),
                "movestogo" => movestogo = tokens.next().and_then(|s| s.parse::<u32>().ok()),
                _ => {}
            }
        }

        if let Some(depth) = perft_depth {
            let nodes = match self.engine.perft(depth) {
                Ok(nodes) => nodes,
                Err(err) => {
                    writeln!(out, "info string perft error: {}", err)?;
                    return Ok(());
                }
            };
            writeln!(out, "info string perft {} nodes {}", depth, nodes)?;
            return Ok(());
        }

        self.engine.set_clock(clock_from_go(
            self.engine.side_to_move() == Color::Light,
            movetime,
            wtime,
            btime,
            winc,
            binc,
            movestogo,
        ));

        match self.engine.root_search(depth) {
            Ok(report) => {
                write_report(out, &report)?;
                Ok(())
            }
            Err(err) => Err(io::Error::other(err.to_string())),
        }
    }
}

fn clock_from_go(
    side_is_light: bool,
    movetime: Option<u64>,
    wtime: Option<u64>,
    btime: Option<u64>,
    winc: u64,
    binc: u64,
    movestogo: Option<u32>,
) -> ClockState {
    if let Some(ms) = movetime {
        return ClockState::new(TimeControl::FixedPerMove { ms: ms.max(1) });
    }
    let (time, inc) = if side_is_light {
        (wtime, winc)
    } else {
        (btime, binc)
    };
    match (time, movestogo) {
        (Some(base_ms), Some(moves)) => ClockState::new(TimeControl::Conventional {
            moves_per_session: moves.max(1),
            session_ms: base_ms,
            increment_ms: inc,
        }),
        (Some(base_ms), None) => ClockState::new(TimeControl::Incremental {
            base_ms,
            increment_ms: inc,
        }),
        // No clock information at all: a generous fixed budget.
        (None, _) => ClockState::default(),
    }
}

fn write_report(out: &mut impl Write, report: &SearchReport) -> io::Result<()> {
    let score = match report.mate_in {
        Some(moves) => format!("mate {}", moves),
        None => format!("cp {}", report.score),
    };
    let pv: Vec<String> = report.pv.iter().map(|&mv| format_move(mv)).collect();
    writeln!(
        out,
        "info depth {} score {} nodes {} time {} pv {}",
        report.depth,
        score,
        report.nodes,
        report.elapsed_ms,
        pv.join(" ")
    )?;
    if report.best_move == crate::position::moves::MOVE_NONE {
        writeln!(out, "bestmove 0000")
    } else {
        writeln!(out, "bestmove {}", format_move(report.best_move))
    }
}

#[cfg(test)]
mod tests {
    use super::{clock_from_go, UciState};
    use crate::config::EngineConfig;
    use crate::position::moves::format_move;

    fn state() -> UciState {
        UciState::new(&EngineConfig::default()).expect("cpu session should bind")
    }

    fn run(state: &mut UciState, line: &str) -> String {
        let mut out = Vec::new();
        state
            .handle_command(line, &mut out)
            .expect("command should be handled");
        String::from_utf8(out).expect("output is UTF-8")
    }

    #[test]
    fn uci_handshake_identifies_the_engine() {
        let mut state = state();
        let out = run(&mut state, "uci");
        assert!(out.contains("id name Photon Chess"));
        assert!(out.ends_with("uciok\n"));
        assert_eq!(run(&mut state, "isready"), "readyok\n");
    }

    #[test]
    fn position_command_applies_moves() {
        let mut state = state();
        run(&mut state, "position startpos moves e2e4 e7e5 g1f3");
        // Three plies in; knight on f3 means white played g1f3 legally.
        assert_eq!(state.engine.fullmove_number(), 2);
    }

    #[test]
    fn go_depth_emits_info_and_bestmove() {
        let mut state = state();
        run(&mut state, "position startpos");
        let out = run(&mut state, "go depth 2");
        assert!(out.contains("info depth"));
        assert!(out.contains("bestmove "));
        assert!(!out.contains("bestmove 0000"));
    }

    #[test]
    fn go_perft_reports_leaf_counts() {
        let mut state = state();
        run(&mut state, "position startpos");
        let out = run(&mut state, "go perft 3");
        assert!(out.contains("nodes 8902"), "{out}");
    }

    #[test]
    fn go_mate_score_is_reported_in_moves() {
        let mut state = state();
        run(
            &mut state,
            "position fen 6k1/5ppp/8/8/8/8/8/R5K1 w - - 0 1",
        );
        let out = run(&mut state, "go depth 4");
        assert!(out.contains("score mate 1"), "{out}");
        assert!(out.contains(&format!("bestmove {}", "a1a8")));
    }

    #[test]
    fn clocks_map_onto_the_three_time_controls() {
        let fixed = clock_from_go(true, Some(1500), None, None, 0, 0, None);
        assert_eq!(fixed.allocate_ms(), 1500);

        let conventional = clock_from_go(true, None, Some(60_000), None, 500, 0, Some(30));
        assert!(conventional.allocate_ms() <= 60_000);

        let incremental = clock_from_go(false, None, Some(1), Some(30_000), 0, 1_000, None);
        assert!(incremental.allocate_ms() <= 30_000);
    }

    #[test]
    fn valueless_go_flags_do_not_swallow_clock_fields() {
        let mut state = state();
        run(&mut state, "position startpos");
        let out = run(&mut state, "go infinite movetime 1234 depth 2");
        assert!(out.contains("bestmove "), "{out}");
        // `infinite` carries no value, so `movetime 1234` must still land.
        assert_eq!(state.engine.clock().allocate_ms(), 1234);
    }

    #[test]
    fn bad_position_is_reported_not_fatal() {
        let mut state = state();
        let out = run(&mut state, "position fen not a fen at all");
        assert!(out.contains("info string position error"));
        // The engine still answers on its previous position.
        let report = state.engine.root_search(1).expect("search should run");
        assert!(!format_move(report.best_move).is_empty());
    }
}
