//! Report line formatting.
//!
//! Pure text construction for everything the executor writes to the host
//! stream. The pick-and-place host matches these lines with regular
//! expressions, so spacing, separators, and decimal precision are part of
//! the contract.

use std::fmt::Write;

use crate::config::FirmwareIdentity;
use crate::gcode::AXIS_LETTERS;

/// Line terminator on the host stream.
pub const EOL: &str = "\r\n";

/// Coordinate values are always reported in mm with this many decimals,
/// regardless of the interpreter's active unit mode.
const COORD_DECIMALS: usize = 3;

/// Analog readings are reported with two decimals.
const ADC_DECIMALS: usize = 2;

/// Position report line: `X:10.000 Y:0.000 ...` in fixed axis order.
pub fn position_line(positions: &[f64]) -> String {
    let mut line = String::new();
    for (idx, value) in positions.iter().enumerate() {
        if idx > 0 {
            line.push(' ');
        }
        let _ = write!(line, "{}:{:.*}", AXIS_LETTERS[idx], COORD_DECIMALS, value);
    }
    line.push_str(EOL);
    line
}

/// Detailed-report second line: raw step counts labeled `Count`.
pub fn count_line(steps: &[i64]) -> String {
    let mut line = String::from("Count ");
    for (idx, value) in steps.iter().enumerate() {
        if idx > 0 {
            line.push(' ');
        }
        let _ = write!(line, "{}:{}", AXIS_LETTERS[idx], value);
    }
    line.push_str(EOL);
    line
}

/// Analog reading report: `A<port>:<value>`.
pub fn adc_line(port: u8, value: f64) -> String {
    format!("A{}:{:.*}{}", port, ADC_DECIMALS, value, EOL)
}

/// Firmware identification, space-separated `KEY:VALUE` tokens.
pub fn firmware_info_line(identity: &FirmwareIdentity) -> String {
    format!(
        "FIRMWARE_NAME:{} FIRMWARE_URL:{} FIRMWARE_VERSION:{} FIRMWARE_BUILD:{}{}",
        identity.name, identity.url, identity.version, identity.build, EOL
    )
}

/// Plugin self-identification appended to the host's option report.
pub fn plugin_ident_line(name: &str, version: &str) -> String {
    format!("[PLUGIN:{} v{}]{}", name, version, EOL)
}
