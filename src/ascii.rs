//! Human-readable `name:\tbitstring` waves.
//!
//! Each character of a bitstring is one logical edit event, not one
//! timestep. Every edit keeps all signals at equal length: a signal
//! not touched by the edit holds its last value.

use compact_str::CompactString;
use indexmap::IndexMap;
use std::fmt;
use std::fs;
use std::path::Path;
use crate::error::{ GlueError, GlueResult };

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AsciiWave {
    /// Signal name to a string of `'0'`/`'1'`.
    signals: IndexMap<CompactString, String>,
}

#[inline]
fn bit_char(value: bool) -> char {
    if value { '1' } else { '0' }
}

impl AsciiWave {
    #[inline]
    pub fn new() -> AsciiWave {
        AsciiWave::default()
    }

    /// Start a wave with one character per signal.
    pub fn init_signals<'a>(
        names: impl IntoIterator<Item = &'a str>, value: bool
    ) -> AsciiWave {
        let mut w = AsciiWave::new();
        for n in names {
            w.signals.insert(n.into(), bit_char(value).to_string());
        }
        w
    }

    /// Build from explicit per-signal traces. Shorter traces are held
    /// at their last value up to the longest one.
    pub fn from_traces<'a>(
        traces: impl IntoIterator<Item = (&'a str, &'a [bool])>
    ) -> AsciiWave {
        let mut w = AsciiWave::new();
        for (name, trace) in traces {
            w.signals.insert(
                name.into(), trace.iter().map(|&b| bit_char(b)).collect());
        }
        w.hold_all();
        w
    }

    /// Length in edit events.
    #[inline]
    pub fn len(&self) -> usize {
        self.signals.values().map(|s| s.len()).max().unwrap_or(0)
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    pub fn names(&self) -> impl Iterator<Item = &CompactString> + '_ {
        self.signals.keys()
    }

    #[inline]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.signals.get(name).map(|s| s.as_str())
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.signals.contains_key(name)
    }

    /// Bitstring of a signal, creating it back-filled with `0`.
    fn entry(&mut self, name: &str) -> &mut String {
        let len = self.len();
        self.signals.entry(name.into())
            .or_insert_with(|| "0".repeat(len))
    }

    /// Pad every signal to the longest length with its last character.
    fn hold_all(&mut self) {
        let len = self.len();
        for s in self.signals.values_mut() {
            let last = s.chars().last().unwrap_or('0');
            while s.len() < len {
                s.push(last);
            }
        }
    }

    /// Append one event setting `name` to `value`.
    pub fn set_signal(&mut self, name: &str, value: bool) {
        self.set_signals(&[(name, value)]);
    }

    /// Append one event setting several signals at once.
    pub fn set_signals(&mut self, values: &[(&str, bool)]) {
        self.hold_all();
        let len = self.len();
        for &(name, value) in values {
            let s = self.entry(name);
            s.truncate(len);
            s.push(bit_char(value));
        }
        self.hold_all();
    }

    /// Drive `name` to the opposite of its current value for `width`
    /// events, then back.
    pub fn pulse(&mut self, name: &str, width: usize) {
        self.hold_all();
        let s = self.entry(name);
        let rest = s.chars().last().unwrap_or('0');
        let active = if rest == '1' { '0' } else { '1' };
        for _ in 0..width {
            s.push(active);
        }
        s.push(rest);
        self.hold_all();
    }

    /// Append an explicit bitstring to `name`.
    pub fn custom_wave(&mut self, name: &str, bits: &str) -> GlueResult<()> {
        if let Some(c) = bits.chars().find(|c| *c != '0' && *c != '1') {
            return Err(GlueError::AsciiFormat {
                line: 0,
                reason: format!("bad character {:?} in wave for {}", c, name)
            });
        }
        self.hold_all();
        self.entry(name).push_str(bits);
        self.hold_all();
        Ok(())
    }

    /// Expand to one boolean per output timestep, each event lasting
    /// `ticks_per_bit` timesteps. Every trace has the same length.
    pub fn expand(&self, ticks_per_bit: usize) -> IndexMap<CompactString, Vec<bool>> {
        let len = self.len() * ticks_per_bit;
        self.signals.iter().map(|(name, bits)| {
            let mut trace = Vec::with_capacity(len);
            for c in bits.chars() {
                trace.extend(std::iter::repeat(c == '1').take(ticks_per_bit));
            }
            let last = trace.last().copied().unwrap_or(false);
            trace.resize(len, last);
            (name.clone(), trace)
        }).collect()
    }

    /// Parse `name:\tbitstring` lines. `//` comments and blank lines
    /// are skipped. Unequal lengths are accepted as-is.
    pub fn parse(text: &str) -> GlueResult<AsciiWave> {
        let mut w = AsciiWave::new();
        for (idx, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() || line.starts_with("//") {
                continue;
            }
            let err = |reason: String| GlueError::AsciiFormat {
                line: idx + 1, reason
            };
            let (name, bits) = line.split_once(':')
                .ok_or_else(|| err(format!("no ':' in \"{}\"", line)))?;
            let (name, bits) = (name.trim(), bits.trim());
            if name.is_empty() {
                return Err(err("empty signal name".into()));
            }
            if let Some(c) = bits.chars().find(|c| *c != '0' && *c != '1') {
                return Err(err(format!("bad character {:?} for {}", c, name)));
            }
            if w.signals.insert(name.into(), bits.to_string()).is_some() {
                return Err(err(format!("duplicate signal {}", name)));
            }
        }
        Ok(w)
    }

    pub fn read(path: impl AsRef<Path>) -> GlueResult<AsciiWave> {
        AsciiWave::parse(&fs::read_to_string(path)?)
    }

    pub fn write(&self, path: impl AsRef<Path>) -> GlueResult<()> {
        fs::write(path, self.to_string())?;
        Ok(())
    }
}

impl fmt::Display for AsciiWave {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (name, bits) in &self.signals {
            writeln!(f, "{}:\t{}", name, bits)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edits_hold_untouched_signals() {
        let mut w = AsciiWave::init_signals(["clk", "data", "rst"], false);
        w.set_signal("rst", true);
        w.set_signals(&[("clk", true), ("data", true)]);
        w.pulse("rst", 2);
        w.custom_wave("data", "0101").unwrap();
        assert_eq!(w.get("clk"), Some("0011111111"));
        assert_eq!(w.get("data"), Some("0011110101"));
        assert_eq!(w.get("rst"), Some("0110011111"));
        assert!(w.names().all(|n| w.get(n).unwrap().len() == w.len()));
    }

    #[test]
    fn new_signal_is_backfilled() {
        let mut w = AsciiWave::init_signals(["a"], true);
        w.set_signal("a", false);
        w.set_signal("b", true);
        assert_eq!(w.get("a"), Some("100"));
        assert_eq!(w.get("b"), Some("001"));
    }

    #[test]
    fn parse_and_display() {
        let text = "A:\t01010101\nB:\t11000011\n// note\n\nC:\t00011111\n";
        let w = AsciiWave::parse(text).unwrap();
        assert_eq!(w.len(), 8);
        assert_eq!(w.to_string(), "A:\t01010101\nB:\t11000011\nC:\t00011111\n");
    }

    #[test]
    fn parse_rejects_bad_lines() {
        assert!(matches!(AsciiWave::parse("A 0101\n"),
                         Err(GlueError::AsciiFormat { line: 1, .. })));
        assert!(matches!(AsciiWave::parse("A:\t01\nB:\t0x1\n"),
                         Err(GlueError::AsciiFormat { line: 2, .. })));
    }

    #[test]
    fn expand_holds_short_signals() {
        let w = AsciiWave::parse("a:\t10\nb:\t011\n").unwrap();
        let x = w.expand(2);
        assert_eq!(x["a"], [true, true, false, false, false, false]);
        assert_eq!(x["b"], [false, false, true, true, true, true]);
    }
}
