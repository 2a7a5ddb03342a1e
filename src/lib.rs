//! Crate root module declarations for the Photon Chess engine project.
//!
//! This file exposes all top-level subsystems (position model, move
//! generation, hash tables, compute session, search driver, tuner, and UCI
//! protocol handling) so binaries, tests, and external tooling can import
//! stable module paths.

pub mod position {
    pub mod board;
    pub mod fen;
    pub mod history;
    pub mod moves;
    pub mod piece;
    pub mod zobrist;
}

pub mod movegen {
    pub mod attacks;
    pub mod generator;
    pub mod perft;
}

pub mod tt {
    pub mod abdada;
    pub mod sizing;
    pub mod table;
}

pub mod compute {
    pub mod backend;
    pub mod cpu;
    pub mod device;
    pub mod session;
}

pub mod search {
    pub mod driver;
    pub mod score;
    pub mod time_control;
}

pub mod tuner {
    pub mod autotune;
    pub mod bench;
    pub mod probe;
}

pub mod uci {
    pub mod uci_top;
}

pub mod config;
pub mod errors;
