//! `pnp-sim`: drives the M-code pipeline against an in-memory machine.
//!
//! Reads command lines from stdin (`M42 P1 S1`, `M114 D`, ...), runs them
//! through the dispatch chain, and prints whatever the extension writes to
//! the host stream. The word tokenizing here is simulator glue; in firmware
//! the interpreter's parser produces the block.

use std::io::{self, BufRead, Write as _};

use anyhow::Result;
use clap::Parser;

use pnp_mcodes::config::Args;
use pnp_mcodes::gcode::{Mcode, ParsedBlock, RunState, Word, MAX_AXES};
use pnp_mcodes::hal::{
    CommandStream, IoPorts, MotionPlanner, PortDirection, PortKind, SettingsStore, SystemContext,
    WaitMode,
};
use pnp_mcodes::{Dispatcher, ExtensionConfig, OpenPnpCodes, Status};

/// Simulated port bank: logs digital writes, serves synthetic analog
/// readings.
struct SimIo;

impl IoPorts for SimIo {
    fn digital_out(&mut self, port: u8, on: bool) {
        log::info!("digital out {} <- {}", port, if on { "on" } else { "off" });
    }

    fn analog_in(&mut self, port: u8, _mode: WaitMode) -> f64 {
        // Deterministic per-port reading so scaled reports are checkable.
        500.0 + f64::from(port)
    }

    fn unclaimed(&self, kind: PortKind, direction: PortDirection) -> u8 {
        match (kind, direction) {
            (PortKind::Digital, PortDirection::Output) => 8,
            (PortKind::Analog, PortDirection::Input) => 4,
            _ => 0,
        }
    }
}

struct SimMotion {
    steps_per_mm: f64,
}

impl MotionPlanner for SimMotion {
    fn synchronize(&mut self) {
        log::debug!("motion buffer drained");
    }

    fn step_position(&self) -> [i64; MAX_AXES] {
        [800, 400, 0, 0, 0, 0, 0, 0]
    }

    fn steps_to_machine(&self, steps: &[i64; MAX_AXES]) -> [f64; MAX_AXES] {
        let mut position = [0.0; MAX_AXES];
        for (out, steps) in position.iter_mut().zip(steps) {
            *out = *steps as f64 / self.steps_per_mm;
        }
        position
    }

    fn commanded_position(&self) -> [f64; MAX_AXES] {
        [10.0, 5.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0]
    }

    fn work_offset(&self, _axis: usize) -> f64 {
        0.0
    }
}

struct SimSettings;

impl SettingsStore for SimSettings {
    fn override_acceleration(&mut self, axis: usize, value: f64) {
        log::info!("acceleration override axis {} <- {}", axis, value);
    }

    fn override_jerk(&mut self, axis: usize, value: f64) {
        log::info!("jerk override axis {} <- {}", axis, value);
    }
}

struct StdoutStream;

impl CommandStream for StdoutStream {
    fn write(&mut self, text: &str) {
        print!("{}", text);
        let _ = io::stdout().flush();
    }
}

/// Tokenize a command line into a parsed block.
///
/// Returns None for empty lines and lines that do not start with an M-word.
/// A word letter with an unparseable number stays present with a NaN value,
/// which the validator reports as a bad number format.
fn parse_line(line: &str) -> Option<ParsedBlock> {
    let mut tokens = line.split_whitespace();

    let mcode_text = tokens.next()?;
    let code = mcode_text
        .strip_prefix('M')
        .or_else(|| mcode_text.strip_prefix('m'))?
        .parse::<u16>()
        .ok()?;

    let mut block = ParsedBlock::new(Mcode(code));
    for token in tokens {
        let mut chars = token.chars();
        let letter = match chars.next() {
            Some(letter) => letter,
            None => continue,
        };
        let word = match Word::from_letter(letter) {
            Some(word) => word,
            None => {
                log::warn!("ignoring unknown word letter '{}'", letter);
                continue;
            }
        };

        let rest: String = chars.collect();
        block = if rest.is_empty() {
            block.with_flag(word)
        } else {
            block.with_word(word, rest.parse::<f64>().unwrap_or(f64::NAN))
        };
    }

    Some(block)
}

fn status_reply(status: Status) -> &'static str {
    match status {
        Status::Ok | Status::Unvalidated => "ok",
        Status::ValueWordMissing => "error: value word missing",
        Status::BadNumberFormat => "error: bad number format",
        Status::InvalidStatement => "error: invalid statement",
        Status::Unhandled => "error: unsupported command",
    }
}

fn main() -> Result<()> {
    let args = Args::parse();

    env_logger::Builder::new()
        .parse_filters(&args.log_level)
        .init();

    let config = match &args.config {
        Some(path) => ExtensionConfig::from_file(path)?,
        None => ExtensionConfig::default(),
    };

    let mut ctx = SystemContext::new(
        Box::new(SimIo),
        Box::new(SimMotion { steps_per_mm: 80.0 }),
        Box::new(SimSettings),
        Box::new(StdoutStream),
        args.axes.clamp(1, MAX_AXES),
    );

    let mut dispatcher = Dispatcher::new(config.unhandled);
    dispatcher.install(|next| Box::new(OpenPnpCodes::new(next, config)));
    dispatcher.activate(&ctx);
    dispatcher.report_options(&mut ctx, false);

    let stdin = io::stdin();
    for line in stdin.lock().lines() {
        let line = line?;
        let mut block = match parse_line(&line) {
            Some(block) => block,
            None => {
                if !line.trim().is_empty() {
                    log::warn!("not an M-code line: {}", line.trim());
                }
                continue;
            }
        };

        let status = dispatcher.dispatch(&mut ctx, RunState::Normal, &mut block);
        println!("{}", status_reply(status));
    }

    Ok(())
}
