//! Sampled access to a VCD signal-change trace.
//!
//! The converter only needs three things from a trace: the value of a
//! scoped signal at a tick, the tick range, and the native timebase.
//! These are the `SignalTrace` trait; `VcdTrace` implements it on top
//! of `vcd_ng`.

use compact_str::CompactString;
use indexmap::IndexMap;
use std::fs::File;
use std::io::{ self, BufReader, Read };
use std::path::Path;
use vcd_ng::{ Parser, FastFlow, ScopeItem, Var, TimescaleUnit };
use crate::error::{ GlueError, GlueResult };

/// The value changes of one single-bit signal, sorted by tick.
#[derive(Debug, Clone, Default)]
pub struct SignalHistory {
    changes: Vec<(u64, bool)>,
}

impl SignalHistory {
    /// Build from `(tick, value)` pairs in tick order.
    #[inline]
    pub fn from_changes(changes: Vec<(u64, bool)>) -> SignalHistory {
        SignalHistory { changes }
    }

    #[inline]
    fn push(&mut self, tick: u64, value: bool) {
        match self.changes.last_mut() {
            Some(last) if last.0 == tick => last.1 = value,
            Some(last) if last.1 == value => {}
            _ => self.changes.push((tick, value))
        }
    }

    /// Value at or before `tick`. Before the first change it is 0.
    pub fn value_at(&self, tick: u64) -> bool {
        match self.changes.partition_point(|&(t, _)| t <= tick) {
            0 => false,
            i => self.changes[i - 1].1
        }
    }

    /// A sampler for monotonically increasing ticks.
    #[inline]
    pub fn cursor(&self) -> HistoryCursor<'_> {
        HistoryCursor { changes: &self.changes, pos: 0, value: false }
    }
}

/// Walks a `SignalHistory` forward in amortized constant time.
pub struct HistoryCursor<'a> {
    changes: &'a [(u64, bool)],
    pos: usize,
    value: bool,
}

impl HistoryCursor<'_> {
    /// Value at or before `tick`. Ticks must not decrease between calls.
    #[inline]
    pub fn value_at(&mut self, tick: u64) -> bool {
        while let Some(&(t, v)) = self.changes.get(self.pos) {
            if t > tick {
                break;
            }
            self.value = v;
            self.pos += 1;
        }
        self.value
    }
}

/// A parsed signal-change trace.
pub trait SignalTrace {
    /// History of a dot-scoped signal, e.g. `tb.dut.clk`.
    /// `None` when the trace has no such signal.
    fn history(&self, scoped_name: &str) -> Option<&SignalHistory>;
    fn start_tick(&self) -> u64;
    fn end_tick(&self) -> u64;
    /// Picoseconds per tick.
    fn timebase_ps(&self) -> f64;
    /// Name of the outermost scope (the testbench).
    fn top_scope(&self) -> Option<&str>;
}

/// A VCD file held in memory as per-signal histories.
#[derive(Debug, Clone, Default)]
pub struct VcdTrace {
    signals: IndexMap<CompactString, SignalHistory>,
    start_tick: u64,
    end_tick: u64,
    timebase_ps: f64,
    top_scope: Option<CompactString>,
}

/// Picoseconds in one timescale unit.
fn unit_ps(unit: TimescaleUnit) -> f64 {
    match unit {
        TimescaleUnit::S => 1e12,
        TimescaleUnit::MS => 1e9,
        TimescaleUnit::US => 1e6,
        TimescaleUnit::NS => 1e3,
        TimescaleUnit::PS => 1.,
        TimescaleUnit::FS => 1e-3,
    }
}

/// Visit every variable with its dot-joined hierarchical name.
fn enumerate_vars(
    items: &[ScopeItem], hier: &mut Vec<CompactString>,
    f: &mut impl FnMut(&Var, String)
) {
    for i in items {
        match i {
            ScopeItem::Var(var) => {
                hier.push(var.reference.as_str().into());
                f(var, hier.join("."));
                hier.pop();
            }
            ScopeItem::Scope(scope) => {
                hier.push(scope.identifier.as_str().into());
                enumerate_vars(&scope.children[..], hier, f);
                hier.pop();
            }
            _ => {}
        }
    }
}

impl VcdTrace {
    /// Load a VCD file.
    pub fn load(path: impl AsRef<Path>) -> GlueResult<VcdTrace> {
        let mut bytes = Vec::new();
        File::open(path.as_ref())?.read_to_end(&mut bytes)?;
        let trace = VcdTrace::from_bytes(&bytes)?;
        clilog::info!(
            GC_VCD_LOAD,
            "loaded {} with {} signals, ticks {}..{} at {} ps/tick",
            path.as_ref().display(), trace.signals.len(),
            trace.start_tick, trace.end_tick, trace.timebase_ps
        );
        Ok(trace)
    }

    /// Parse VCD text.
    pub fn from_bytes(bytes: &[u8]) -> GlueResult<VcdTrace> {
        let vcd_err = |e: io::Error| GlueError::Vcd(e.to_string());

        let mut rd = BufReader::new(bytes);
        let mut parser = Parser::new(&mut rd);
        let header = parser.parse_header().map_err(vcd_err)?;
        drop(parser);

        let timebase_ps = match header.timescale {
            Some((n, unit)) => n as f64 * unit_ps(unit),
            None => {
                clilog::warn!(GC_VCD_TIMESCALE, "VCD has no $timescale, assuming 1 ps");
                1.
            }
        };
        let top_scope = header.items.iter().find_map(|i| match i {
            ScopeItem::Scope(s) => Some(CompactString::from(s.identifier.as_str())),
            _ => None
        });

        // id code to (signal index, bit offset from MSB, var width)
        // of every bit carried by that code.
        let mut signals = IndexMap::<CompactString, SignalHistory>::new();
        let mut id2sigs = Vec::<Vec<(usize, usize, usize)>>::new();
        enumerate_vars(&header.items[..], &mut Vec::new(), &mut |var, name| {
            let id = var.code.0 as usize;
            if id2sigs.len() <= id {
                id2sigs.resize(id + 1, Vec::new());
            }
            let size = var.size as usize;
            if size == 1 {
                let (idx, _) = signals.insert_full(name.into(), Default::default());
                id2sigs[id].push((idx, 0, 1));
            }
            else {
                for b in 0..size {
                    let (idx, _) = signals.insert_full(
                        format!("{}[{}]", name, size - 1 - b).into(),
                        Default::default());
                    id2sigs[id].push((idx, b, size));
                }
            }
        });

        let mut flow = FastFlow::new(bytes, 65536);
        use vcd_ng::{ FastFlowToken, FFValueChange };
        let mut cur_tick = None;
        let mut first_tick = None;
        while let Some(tok) = flow.next_token().map_err(vcd_err)? {
            match tok {
                FastFlowToken::Timestamp(t) => {
                    first_tick.get_or_insert(t);
                    cur_tick = Some(t);
                }
                FastFlowToken::Value(FFValueChange { id, bits }) => {
                    let tick = cur_tick.unwrap_or(0);
                    let Some(targets) = id2sigs.get(id.0 as usize) else {
                        continue;
                    };
                    for &(idx, offset, size) in targets {
                        // vector changes may be left-truncated
                        let pad = size.saturating_sub(bits.len());
                        let value = offset >= pad &&
                            bits.get(offset - pad) == Some(&b'1');
                        signals[idx].push(tick, value);
                    }
                }
            }
        }

        Ok(VcdTrace {
            signals,
            start_tick: first_tick.unwrap_or(0),
            end_tick: cur_tick.unwrap_or(0),
            timebase_ps,
            top_scope
        })
    }

    #[inline]
    pub fn signal_names(&self) -> impl Iterator<Item = &CompactString> + '_ {
        self.signals.keys()
    }
}

impl SignalTrace for VcdTrace {
    #[inline]
    fn history(&self, scoped_name: &str) -> Option<&SignalHistory> {
        self.signals.get(scoped_name)
    }

    #[inline]
    fn start_tick(&self) -> u64 {
        self.start_tick
    }

    #[inline]
    fn end_tick(&self) -> u64 {
        self.end_tick
    }

    #[inline]
    fn timebase_ps(&self) -> f64 {
        self.timebase_ps
    }

    #[inline]
    fn top_scope(&self) -> Option<&str> {
        self.top_scope.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn history_holds_value() {
        let h = SignalHistory::from_changes(vec![(10, true), (20, false), (35, true)]);
        assert!(!h.value_at(0));
        assert!(h.value_at(10));
        assert!(h.value_at(19));
        assert!(!h.value_at(20));
        assert!(h.value_at(1000));
        let mut c = h.cursor();
        let sampled = [0, 10, 15, 20, 34, 35, 40].map(|t| c.value_at(t));
        assert_eq!(sampled, [false, true, true, false, false, true, true]);
    }

    #[test]
    fn push_collapses_same_tick_and_value() {
        let mut h = SignalHistory::default();
        h.push(0, false);
        h.push(0, true);
        h.push(5, true);
        h.push(7, false);
        assert_eq!(h.changes, [(0, true), (7, false)]);
    }
}
