//! Read-only queries over one or two Glue waves.

use compact_str::CompactString;
use serde::{ Serialize, Deserialize };
use std::fmt;
use crate::error::GlueResult;
use crate::iospec::{ Direction, IoSpec, SignalSpec };
use crate::wave::GlueWave;

/// Per-signal line of a `compare` report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalComparison {
    pub name: CompactString,
    pub direction: Direction,
    /// Fraction of timesteps with the bit set, in wave 1.
    pub duty1: f64,
    /// Same for wave 2.
    pub duty2: f64,
    /// The two waves agree on every common timestep.
    pub passthrough: bool,
}

/// Result of comparing two waves signal by signal.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompareReport {
    pub len1: usize,
    pub len2: usize,
    pub signals: Vec<SignalComparison>,
}

/// Three traces for one signal: wave 1, wave 2, and where they differ.
#[derive(Debug, Clone, PartialEq)]
pub struct DiffTraces {
    pub name: CompactString,
    pub first: Vec<bool>,
    pub second: Vec<bool>,
    pub xor: Vec<bool>,
}

#[inline]
fn duty_cycle(trace: &[bool]) -> f64 {
    if trace.is_empty() {
        return 0.;
    }
    trace.iter().filter(|b| **b).count() as f64 / trace.len() as f64
}

/// Signals `wave` carries: its hardware group's, or all of them when
/// the wave is not bound to a group.
pub fn wave_signals<'a>(
    spec: &'a IoSpec, wave: &'a GlueWave
) -> Box<dyn Iterator<Item = &'a SignalSpec> + 'a> {
    match &wave.hardware {
        Some(hw) => Box::new(spec.signals_in(hw)),
        None => Box::new(spec.signals())
    }
}

/// Duty cycle and bit-for-bit agreement of every signal of `wave1`'s
/// hardware group.
pub fn compare(spec: &IoSpec, wave1: &GlueWave, wave2: &GlueWave) -> CompareReport {
    let common = wave1.len().min(wave2.len());
    let signals = wave_signals(spec, wave1).map(|s| {
        let t1 = wave1.get_trace(s.bit_pos);
        let t2 = wave2.get_trace(s.bit_pos);
        SignalComparison {
            name: s.name.clone(),
            direction: s.direction,
            duty1: duty_cycle(&t1),
            duty2: duty_cycle(&t2),
            passthrough: t1[..common] == t2[..common]
        }
    }).collect();
    CompareReport { len1: wave1.len(), len2: wave2.len(), signals }
}

/// Per-signal traces of both waves and their XOR over the common length.
pub fn diff<S: AsRef<str>>(
    spec: &IoSpec, wave1: &GlueWave, wave2: &GlueWave, names: &[S]
) -> GlueResult<Vec<DiffTraces>> {
    let common = wave1.len().min(wave2.len());
    names.iter().map(|n| {
        let s = spec.require(n.as_ref())?;
        let mut first = wave1.get_trace(s.bit_pos);
        let mut second = wave2.get_trace(s.bit_pos);
        first.truncate(common);
        second.truncate(common);
        let xor = first.iter().zip(&second).map(|(a, b)| a ^ b).collect();
        Ok(DiffTraces { name: s.name.clone(), first, second, xor })
    }).collect()
}

/// One signal's bit across the whole wave.
pub fn get_bitstream(
    spec: &IoSpec, wave: &GlueWave, name: &str
) -> GlueResult<Vec<bool>> {
    Ok(wave.get_trace(spec.require(name)?.bit_pos))
}

/// Sample `data` on every rising edge of `clock`, taking the value held
/// one timestep before the edge. Timestep 0 never counts as an edge.
pub fn get_clocked_bitstream(
    spec: &IoSpec, wave: &GlueWave, clock: &str, data: &str
) -> GlueResult<Vec<bool>> {
    let clk = wave.get_trace(spec.require(clock)?.bit_pos);
    let dat = wave.get_trace(spec.require(data)?.bit_pos);
    Ok((1..clk.len())
       .filter(|&i| clk[i] && !clk[i - 1])
       .map(|i| dat[i - 1])
       .collect())
}

impl fmt::Display for CompareReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Wave 1 len: {}", self.len1)?;
        writeln!(f, "Wave 2 len: {}", self.len2)?;
        writeln!(f, "{:<15}\tDir.\tDC1    \tDC2    \tIn=Out?", "I/O")?;
        for s in &self.signals {
            writeln!(f, "{:<15}\t{}\t{:.5}\t{:.5}\t{}",
                     s.name, s.direction.letter(),
                     s.duty1, s.duty2, s.passthrough)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GlueError;
    use crate::hwpath::HwPath;

    const SPEC: &str = "\
HARDWARE PXI1Slot5/NI6583/se_io BEGIN
A,I,0
B,I,1
C,O,2
END
";

    fn wave(v: Vec<u64>) -> GlueWave {
        GlueWave::new(v, 1000.0, Some(HwPath::parse("PXI1Slot5/NI6583/se_io")))
    }

    fn bits(v: &[u8]) -> Vec<bool> {
        v.iter().map(|b| *b == 1).collect()
    }

    #[test]
    fn clocked_bitstream_samples_before_edge() {
        let spec = IoSpec::parse(SPEC).unwrap();
        let w = wave(vec![2, 3, 0, 5, 4, 5, 6, 7]);
        assert_eq!(get_clocked_bitstream(&spec, &w, "A", "B").unwrap(),
                   bits(&[1, 0, 0, 1]));
    }

    #[test]
    fn clock_high_at_start_is_not_an_edge() {
        let spec = IoSpec::parse(SPEC).unwrap();
        let w = wave(vec![3, 0, 1]);
        assert_eq!(get_clocked_bitstream(&spec, &w, "A", "B").unwrap(),
                   bits(&[0]));
    }

    #[test]
    fn bitstream_by_name() {
        let spec = IoSpec::parse(SPEC).unwrap();
        let w = wave(vec![2, 3, 0, 5, 4, 5, 6, 7]);
        assert_eq!(get_bitstream(&spec, &w, "C").unwrap(),
                   bits(&[0, 0, 0, 1, 1, 1, 1, 1]));
        assert!(matches!(get_bitstream(&spec, &w, "Z"),
                         Err(GlueError::UnknownSignal(_))));
    }

    #[test]
    fn compare_identical_waves() {
        let spec = IoSpec::parse(SPEC).unwrap();
        let w = wave(vec![2, 3, 0, 5, 4, 5, 6, 7]);
        let report = compare(&spec, &w, &w);
        assert_eq!(report.signals.len(), 3);
        assert!(report.signals.iter().all(|s| s.passthrough));
        assert_eq!(report.signals[0].duty1, 0.5);
        assert_eq!(report.signals[2].duty2, 0.625);
    }

    #[test]
    fn compare_uses_common_length() {
        let spec = IoSpec::parse(SPEC).unwrap();
        let w1 = wave(vec![1, 1, 0, 0]);
        let w2 = wave(vec![1, 1, 4]);
        let report = compare(&spec, &w1, &w2);
        // A only differs past the common length
        assert!(report.signals[0].passthrough);
        let c = &report.signals[2];
        assert!(!c.passthrough);
        assert!(report.signals[1].passthrough);
        assert_eq!((report.len1, report.len2), (4, 3));
    }

    #[test]
    fn diff_marks_differences() {
        let spec = IoSpec::parse(SPEC).unwrap();
        let w1 = wave(vec![1, 0, 1, 0, 1]);
        let w2 = wave(vec![1, 1, 1, 0]);
        let d = diff(&spec, &w1, &w2, &["A"]).unwrap();
        assert_eq!(d.len(), 1);
        assert_eq!(d[0].first, bits(&[1, 0, 1, 0]));
        assert_eq!(d[0].second, bits(&[1, 1, 1, 0]));
        assert_eq!(d[0].xor, bits(&[0, 1, 0, 0]));
    }
}
