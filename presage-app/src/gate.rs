//! On-Demand operator input from the terminal.

use std::io::{self, BufRead};
use std::thread;

use anyhow::Result;
use log::warn;
use presage_experiment::{ChannelGate, OperatorDecision};
use tokio::sync::mpsc;

const INPUT_BUFFER: usize = 32;

pub fn parse_decision(line: &str) -> Option<OperatorDecision> {
    match line.trim().to_ascii_lowercase().as_str() {
        "c" | "continue" => Some(OperatorDecision::Continue),
        "a" | "abort" => Some(OperatorDecision::Abort),
        _ => None,
    }
}

/// Forward decisions typed on `input` until it ends or the gate is dropped.
pub fn relay<R: BufRead>(input: R, tx: &mpsc::Sender<OperatorDecision>) {
    for line in input.lines() {
        let Ok(line) = line else { break };
        if line.trim().is_empty() {
            continue;
        }
        match parse_decision(&line) {
            Some(decision) => {
                if tx.blocking_send(decision).is_err() {
                    break;
                }
            }
            None => warn!("unrecognised input {line:?}: type c to continue or a to abort"),
        }
    }
}

/// Gate answered from stdin by a dedicated reader thread.
///
/// Lines typed while a trial runs are buffered, then dropped when the gate
/// opens, so only a fresh `c` starts the next trial.
pub fn stdin_gate() -> Result<ChannelGate> {
    let (tx, gate) = ChannelGate::channel(INPUT_BUFFER);
    let gate = gate.discarding_early_input();
    thread::Builder::new()
        .name("presage-operator".into())
        .spawn(move || relay(io::stdin().lock(), &tx))?;
    Ok(gate)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn parses_short_and_long_forms() {
        assert_eq!(parse_decision(" C "), Some(OperatorDecision::Continue));
        assert_eq!(parse_decision("abort"), Some(OperatorDecision::Abort));
        assert_eq!(parse_decision("x"), None);
    }

    #[test]
    fn relays_known_lines_in_order() {
        let (tx, mut rx) = mpsc::channel(8);
        relay(Cursor::new("c\n\nwhat\na\n"), &tx);
        drop(tx);
        assert_eq!(rx.blocking_recv(), Some(OperatorDecision::Continue));
        assert_eq!(rx.blocking_recv(), Some(OperatorDecision::Abort));
        assert_eq!(rx.blocking_recv(), None);
    }
}
