//! Error type shared by every part of the converter.

use compact_str::CompactString;
use thiserror::Error;
use crate::hwpath::HwPath;

pub type GlueResult<T> = Result<T, GlueError>;

#[derive(Error, Debug)]
pub enum GlueError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("iospec line {line}: {reason}")]
    IoSpecFormat { line: usize, reason: String },
    #[error("glue file line {line}: {reason}")]
    GlueFormat { line: usize, reason: String },
    #[error("ascii wave line {line}: {reason}")]
    AsciiFormat { line: usize, reason: String },
    #[error("signal {0} is not in the iospec")]
    UnknownSignal(CompactString),
    #[error("timestep {t} out of range for wave of length {len}")]
    TimestepOutOfRange { t: usize, len: usize },
    #[error("bit position {0} does not fit in a glue vector element")]
    BitOutOfRange(u32),
    #[error("signal {signal} belongs to {found}, expected {expected}")]
    HardwareMismatch {
        signal: CompactString,
        expected: HwPath,
        found: HwPath
    },
    #[error("multiplexed pin {hardware}[{bit_pos}] is driven by more than one signal: {}",
            .signals.join(", "))]
    AmbiguousMux {
        hardware: HwPath,
        bit_pos: u32,
        signals: Vec<CompactString>
    },
    #[error("multiplexed pins are not supported for VCD import: {}",
            .signals.join(", "))]
    MultiplexedPins { signals: Vec<CompactString> },
    #[error("no signals to convert")]
    NoSignals,
    #[error("wave has no hardware group")]
    NoHardware,
    #[error("invalid strobe period {0} ps")]
    InvalidStrobe(f64),
    #[error("VCD error: {0}")]
    Vcd(String),
}
