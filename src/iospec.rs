//! The IOSpec table: which named signal lives at which bit of which
//! hardware group.
//!
//! The text format is line oriented:
//!
//! ```text
//! // comment
//! HARDWARE PXI1Slot5/NI6583/se_io BEGIN
//! A,I,2
//! B,I,0,1
//! C,O,1
//! END
//! ```
//!
//! Each data line is `{name},{I|O},{bit position}[,{default value}]`.

use compact_str::CompactString;
use indexmap::IndexMap;
use serde::{ Serialize, Deserialize };
use std::fs;
use std::path::Path;
use crate::error::{ GlueError, GlueResult };
use crate::hwpath::HwPath;

/// Direction of a signal, relative to the device under test.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Input,
    Output
}

impl Direction {
    #[inline]
    pub fn letter(self) -> char {
        match self {
            Direction::Input => 'I',
            Direction::Output => 'O'
        }
    }
}

/// One row of the IOSpec table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignalSpec {
    pub name: CompactString,
    pub direction: Direction,
    /// Bit index within the hardware group's vector.
    pub bit_pos: u32,
    /// Value used when the signal is absent from a source trace.
    pub default: bool,
    pub hardware: HwPath,
}

/// A set of two or more signals sharing one bit of one hardware group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MuxGroup {
    pub hardware: HwPath,
    pub bit_pos: u32,
    pub signals: Vec<CompactString>,
}

/// The parsed IOSpec table. Immutable once built.
#[derive(Debug, Clone)]
pub struct IoSpec {
    /// All signals in file order.
    signals: IndexMap<CompactString, SignalSpec>,
    /// Hardware groups in order of first appearance, with their
    /// member signals.
    groups: IndexMap<HwPath, Vec<CompactString>>,
    /// Multiplexed pins, computed once at load.
    mux_groups: Vec<MuxGroup>,
}

#[inline]
fn format_err(line: usize, reason: impl Into<String>) -> GlueError {
    GlueError::IoSpecFormat { line, reason: reason.into() }
}

impl IoSpec {
    /// Read and parse an IOSpec file.
    pub fn load(path: impl AsRef<Path>) -> GlueResult<IoSpec> {
        let text = fs::read_to_string(path.as_ref())?;
        let spec = IoSpec::parse(&text)?;
        clilog::info!(
            GC_IOSPEC,
            "loaded iospec {} with {} signals in {} hardware groups",
            path.as_ref().display(), spec.signals.len(), spec.groups.len()
        );
        Ok(spec)
    }

    /// Parse IOSpec text.
    ///
    /// Multiplexed pins are reported as warnings and kept; any caller
    /// that needs a single signal per bit must pick one explicitly.
    pub fn parse(text: &str) -> GlueResult<IoSpec> {
        let mut signals = IndexMap::new();
        let mut groups = IndexMap::<HwPath, Vec<CompactString>>::new();
        let mut current: Option<HwPath> = None;

        for (idx, raw) in text.lines().enumerate() {
            let lineno = idx + 1;
            let line = raw.trim();
            if line.is_empty() || line.starts_with("//") {
                continue;
            }
            let toks = line.split_whitespace().collect::<Vec<_>>();
            if toks[0] == "HARDWARE" {
                let hw = match toks[..] {
                    [_, p, "BEGIN"] => HwPath::parse(p),
                    _ => return Err(format_err(
                        lineno, "expected HARDWARE <path> BEGIN"))
                };
                if hw.is_empty() {
                    return Err(format_err(lineno, "empty hardware path"));
                }
                groups.entry(hw.clone()).or_default();
                current = Some(hw);
                continue;
            }
            if line == "END" {
                current = None;
                continue;
            }
            let hardware = match &current {
                Some(hw) => hw.clone(),
                None => return Err(format_err(
                    lineno,
                    format!("line \"{}\" has no hardware associated with it", line)
                ))
            };
            let sig = parse_signal_line(line, lineno, hardware)?;
            if signals.contains_key(&sig.name) {
                return Err(format_err(
                    lineno, format!("duplicate signal {}", sig.name)));
            }
            if let Some(members) = groups.get_mut(&sig.hardware) {
                members.push(sig.name.clone());
            }
            signals.insert(sig.name.clone(), sig);
        }

        let mux_groups = find_mux_groups(&signals, &groups);
        for mux in &mux_groups {
            clilog::warn!(
                GC_MUX_PIN,
                "multiplexed pin {}[{}] is shared by: {}",
                mux.hardware, mux.bit_pos, mux.signals.join(", ")
            );
        }
        Ok(IoSpec { signals, groups, mux_groups })
    }

    /// All signal names, in file order.
    #[inline]
    pub fn names(&self) -> impl Iterator<Item = &CompactString> + '_ {
        self.signals.keys()
    }

    #[inline]
    pub fn inputs(&self) -> impl Iterator<Item = &SignalSpec> + '_ {
        self.signals.values()
            .filter(|s| s.direction == Direction::Input)
    }

    #[inline]
    pub fn outputs(&self) -> impl Iterator<Item = &SignalSpec> + '_ {
        self.signals.values()
            .filter(|s| s.direction == Direction::Output)
    }

    #[inline]
    pub fn signals(&self) -> impl Iterator<Item = &SignalSpec> + '_ {
        self.signals.values()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.signals.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.signals.is_empty()
    }

    #[inline]
    pub fn signal(&self, name: &str) -> Option<&SignalSpec> {
        self.signals.get(name)
    }

    /// Look up a signal, failing with `UnknownSignal`.
    #[inline]
    pub fn require(&self, name: &str) -> GlueResult<&SignalSpec> {
        self.signals.get(name)
            .ok_or_else(|| GlueError::UnknownSignal(name.into()))
    }

    /// Hardware groups in order of first appearance.
    #[inline]
    pub fn hardware_groups(&self) -> impl Iterator<Item = &HwPath> + '_ {
        self.groups.keys()
    }

    /// Signals of one hardware group, in file order.
    pub fn signals_in<'a>(
        &'a self, hw: &'a HwPath
    ) -> impl Iterator<Item = &'a SignalSpec> + 'a {
        self.groups.get(hw).into_iter()
            .flat_map(|names| names.iter())
            .filter_map(|n| self.signals.get(n))
    }

    /// Number of bits a vector element of this group needs.
    pub fn width(&self, hw: &HwPath) -> u32 {
        self.signals_in(hw)
            .map(|s| s.bit_pos + 1)
            .max()
            .unwrap_or(0)
    }

    #[inline]
    pub fn mux_groups(&self) -> &[MuxGroup] {
        &self.mux_groups
    }

    /// The multiplexed-pin group a signal belongs to, if any.
    pub fn mux_group_of(&self, name: &str) -> Option<&MuxGroup> {
        self.mux_groups.iter()
            .find(|m| m.signals.iter().any(|s| s.as_str() == name))
    }
}

fn parse_signal_line(
    line: &str, lineno: usize, hardware: HwPath
) -> GlueResult<SignalSpec> {
    let toks = line.split(',').map(|t| t.trim()).collect::<Vec<_>>();
    if toks.len() < 3 {
        return Err(format_err(
            lineno,
            format!("expected name,I|O,position[,default], got \"{}\"", line)
        ));
    }
    let name = toks[0];
    if name.is_empty() {
        return Err(format_err(lineno, "empty signal name"));
    }
    let direction = match toks[1] {
        "I" => Direction::Input,
        "O" => Direction::Output,
        d => return Err(format_err(
            lineno, format!("unknown direction \"{}\" for {}", d, name)))
    };
    let bit_pos: u32 = toks[2].parse().map_err(|_| format_err(
        lineno, format!("bad bit position \"{}\" for {}", toks[2], name)
    ))?;
    if bit_pos >= u64::BITS {
        return Err(format_err(
            lineno, format!("bit position {} of {} exceeds 63", bit_pos, name)));
    }
    let default = match toks.get(3) {
        None | Some(&"") => false,
        Some(t) => match t.parse::<u8>() {
            Ok(0) => false,
            Ok(1) => true,
            _ => return Err(format_err(
                lineno, format!("bad default value \"{}\" for {}", t, name)))
        }
    };
    Ok(SignalSpec {
        name: name.into(),
        direction,
        bit_pos,
        default,
        hardware
    })
}

fn find_mux_groups(
    signals: &IndexMap<CompactString, SignalSpec>,
    groups: &IndexMap<HwPath, Vec<CompactString>>
) -> Vec<MuxGroup> {
    let mut ret = Vec::new();
    for (hw, names) in groups {
        let mut by_pos = IndexMap::<u32, Vec<CompactString>>::new();
        for n in names {
            by_pos.entry(signals[n].bit_pos).or_default().push(n.clone());
        }
        for (bit_pos, members) in by_pos {
            if members.len() > 1 {
                ret.push(MuxGroup {
                    hardware: hw.clone(),
                    bit_pos,
                    signals: members
                });
            }
        }
    }
    ret
}
