//! ## `gluewave`: Glue waveform conversion
//!
//! This contains the core functionalities and data structures
//! for turning simulation traces into Glue test-pattern files
//! and for inspecting those files.
//!
//! A Glue wave is a sequence of bit-packed integers, one per strobe,
//! targeting one hardware group. The IOSpec tells which signal lives at
//! which bit of which group.
//!
//! See the binaries for example usage.

use compact_str::CompactString;
use indexmap::IndexMap;
use std::collections::HashSet;
use std::fs;
use std::path::{ Path, PathBuf };
use itertools::Itertools;

pub mod analysis;
pub mod ascii;
pub mod codec;
pub mod error;
pub mod hwpath;
pub mod iospec;
pub mod vcd;
pub mod wave;

pub use analysis::{ CompareReport, DiffTraces, SignalComparison };
pub use ascii::AsciiWave;
pub use error::{ GlueError, GlueResult };
pub use hwpath::HwPath;
pub use iospec::{ Direction, IoSpec, MuxGroup, SignalSpec };
pub use vcd::{ SignalHistory, SignalTrace, VcdTrace };
pub use wave::GlueWave;

/// Options of a VCD import.
#[derive(Debug, Clone)]
pub struct VcdImportOptions {
    /// Output timebase, i.e. the time one Glue element represents.
    pub strobe_ps: f64,
    /// Import inputs only (an input pattern), or inputs and outputs
    /// (a golden pattern).
    pub inputs_only: bool,
    /// Testbench scope. Defaults to the trace's outermost scope.
    pub tb_name: Option<String>,
    /// VCD tick length. Defaults to the trace's timescale.
    pub vcd_timebase_ps: Option<f64>,
}

impl VcdImportOptions {
    #[inline]
    pub fn new(strobe_ps: f64) -> VcdImportOptions {
        VcdImportOptions {
            strobe_ps,
            inputs_only: true,
            tb_name: None,
            vcd_timebase_ps: None
        }
    }
}

/// Metadata key recording the source VCD timebase.
pub const VCD_TIMEBASE_KEY: &str = "VCD_TIMEBASE_PICOSECONDS";
/// Metadata key recording the number of timesteps.
pub const TIMESTEPS_KEY: &str = "GLUE_TIMESTEPS";
/// Upper bound on the length of a VCD import.
pub const MAX_TIMESTEPS: u64 = 1 << 32;

#[inline]
fn check_strobe(strobe_ps: f64) -> GlueResult<()> {
    if !(strobe_ps.is_finite() && strobe_ps > 0.) {
        return Err(GlueError::InvalidStrobe(strobe_ps));
    }
    Ok(())
}

/// Output file for one hardware group of a multi-group conversion.
#[inline]
pub fn glue_file_name(tag: &str, hw: &HwPath) -> PathBuf {
    PathBuf::from(format!("{}_{}.glue", tag, hw.innermost()))
}

/// The converter: an IOSpec plus every operation that needs it.
#[derive(Debug, Clone)]
pub struct GlueConverter {
    iospec: IoSpec,
}

impl GlueConverter {
    #[inline]
    pub fn new(iospec: IoSpec) -> GlueConverter {
        GlueConverter { iospec }
    }

    /// Build a converter from an IOSpec file.
    #[inline]
    pub fn from_iospec_file(path: impl AsRef<Path>) -> GlueResult<GlueConverter> {
        Ok(GlueConverter::new(IoSpec::load(path)?))
    }

    #[inline]
    pub fn iospec(&self) -> &IoSpec {
        &self.iospec
    }

    /// Read a Glue file. Any failure is logged and yields `None`.
    pub fn read_glue(&self, path: impl AsRef<Path>) -> Option<GlueWave> {
        let path = path.as_ref();
        let wave = match codec::read_glue(path) {
            Ok(w) => w,
            Err(e) => {
                clilog::error!(
                    GC_GLUE_READ, "cannot read glue file {}: {}",
                    path.display(), e
                );
                return None;
            }
        };
        if let Some(hw) = &wave.hardware {
            if self.iospec.hardware_groups().all(|h| h != hw) {
                clilog::warn!(
                    GC_GLUE_READ, "{}: hardware {} is not in the iospec",
                    path.display(), hw
                );
            }
            else {
                let width = self.iospec.width(hw);
                if width < u64::BITS && wave.max_element() >> width != 0 {
                    clilog::warn!(
                        GC_GLUE_READ,
                        "{}: elements exceed the {} bits of {}",
                        path.display(), width, hw
                    );
                }
            }
        }
        Some(wave)
    }

    /// Write a wave to a Glue file.
    ///
    /// A wave whose strobe is not a positive finite number (as read
    /// back from a file without a strobe line) is refused.
    pub fn write_glue(
        &self, wave: &GlueWave, path: impl AsRef<Path>
    ) -> GlueResult<()> {
        check_strobe(wave.strobe_ps)?;
        codec::write_glue(wave, path.as_ref())?;
        clilog::debug!("wrote {} timesteps to {}",
                       wave.len(), path.as_ref().display());
        Ok(())
    }

    /// Resample a signal-change trace onto the strobe timebase, one
    /// wave per hardware group of the IOSpec.
    ///
    /// Signals missing from the trace are set to their IOSpec default
    /// across the whole wave. Multiplexed pins with more than one
    /// member in scope are refused, since nothing tells which
    /// testbench signal drives the pin.
    pub fn vcd2glue(
        &self, trace: &impl SignalTrace, opts: &VcdImportOptions
    ) -> GlueResult<IndexMap<HwPath, GlueWave>> {
        check_strobe(opts.strobe_ps)?;
        let timebase_ps = opts.vcd_timebase_ps.unwrap_or_else(|| trace.timebase_ps());
        if !(timebase_ps.is_finite() && timebase_ps > 0.) {
            return Err(GlueError::Vcd(format!("invalid VCD timebase {} ps", timebase_ps)));
        }
        let tb_name = opts.tb_name.as_deref().or_else(|| trace.top_scope());

        let in_scope = self.iospec.signals()
            .filter(|s| !opts.inputs_only || s.direction == Direction::Input)
            .collect::<Vec<_>>();
        let scope_names = in_scope.iter()
            .map(|s| s.name.as_str())
            .collect::<HashSet<_>>();
        let muxed = self.iospec.mux_groups().iter()
            .filter(|m| m.signals.iter()
                    .filter(|n| scope_names.contains(n.as_str())).count() > 1)
            .flat_map(|m| m.signals.iter().cloned())
            .collect::<Vec<_>>();
        if !muxed.is_empty() {
            return Err(GlueError::MultiplexedPins { signals: muxed });
        }

        // the ratio may be below 1 when the strobe is finer than the VCD.
        let ratio = opts.strobe_ps / timebase_ps;
        let (start, end) = (trace.start_tick(), trace.end_tick());
        let steps = (end.saturating_sub(start) as f64 / ratio).floor();
        if steps > MAX_TIMESTEPS as f64 {
            clilog::error!(
                GC_VCD_LEN,
                "strobe {} ps over ticks {}..{} gives {} timesteps, more than {}",
                opts.strobe_ps, start, end, steps, MAX_TIMESTEPS
            );
            return Err(GlueError::InvalidStrobe(opts.strobe_ps));
        }
        let len = steps as usize;
        // ties go to the even tick
        let ticks = (0..len)
            .map(|t| (t as f64 * ratio).round_ties_even() as u64 + start)
            .collect::<Vec<_>>();

        let mut waves = self.iospec.hardware_groups().map(|hw| {
            let mut w = GlueWave::zeros(len, opts.strobe_ps, hw.clone());
            w.metadata.insert(VCD_TIMEBASE_KEY.into(), format!("{:?}", timebase_ps));
            w.metadata.insert(TIMESTEPS_KEY.into(), len.to_string());
            (hw.clone(), w)
        }).collect::<IndexMap<_, _>>();

        for sig in in_scope {
            let Some(wave) = waves.get_mut(&sig.hardware) else {
                continue;
            };
            let scoped = match tb_name {
                Some(tb) => format!("{}.{}", tb, sig.name),
                None => sig.name.to_string()
            };
            match trace.history(&scoped) {
                Some(history) => {
                    let mut cursor = history.cursor();
                    for (t, &tick) in ticks.iter().enumerate() {
                        if cursor.value_at(tick) {
                            wave.set_bit(t, sig.bit_pos, true)?;
                        }
                    }
                }
                None => {
                    clilog::warn!(
                        GC_VCD_MISSING,
                        "{} is NOT FOUND in VCD, setting to default {}",
                        scoped, sig.default as u8
                    );
                    wave.stage_default(sig.bit_pos, sig.default)?;
                }
            }
        }
        for wave in waves.values_mut() {
            wave.commit_defaults();
        }

        clilog::info!(
            GC_VCD_DONE,
            "converted ticks {}..{} at {} ps/tick into {} timesteps of {} ps for {} hardware group(s)",
            start, end, timebase_ps, len, opts.strobe_ps, waves.len()
        );
        Ok(waves)
    }

    /// Write the waves of a multi-group conversion, one file per group
    /// named `{tag}_{interface}.glue`.
    pub fn write_waves(
        &self, waves: &IndexMap<HwPath, GlueWave>, tag: &str
    ) -> GlueResult<Vec<PathBuf>> {
        self.write_waves_with_progress(waves, tag, |_, _, _| {})
    }

    /// `write_waves`, calling `progress(hardware, done, total)` while
    /// long waves are written.
    pub fn write_waves_with_progress(
        &self, waves: &IndexMap<HwPath, GlueWave>, tag: &str,
        mut progress: impl FnMut(&HwPath, usize, usize)
    ) -> GlueResult<Vec<PathBuf>> {
        for wave in waves.values() {
            check_strobe(wave.strobe_ps)?;
        }
        let mut written = Vec::with_capacity(waves.len());
        for (hw, wave) in waves {
            let name = glue_file_name(tag, hw);
            clilog::info!("writing {} ...", name.display());
            codec::write_glue_file_with_progress(
                wave, &name, |done, total| progress(hw, done, total))?;
            written.push(name);
        }
        Ok(written)
    }

    /// Pack explicit per-signal traces into one wave.
    ///
    /// All known signals must share a hardware group. The output is as
    /// long as the longest trace; shorter ones hold their last value.
    /// Signals of the group absent from the input take their IOSpec
    /// default, except members of a multiplexed pin, which are dropped.
    pub fn dict2glue<'a>(
        &self,
        traces: impl IntoIterator<Item = (&'a str, &'a [bool])>,
        strobe_ps: f64
    ) -> GlueResult<GlueWave> {
        check_strobe(strobe_ps)?;
        let mut known = Vec::<(&SignalSpec, &[bool])>::new();
        for (name, trace) in traces {
            match self.iospec.signal(name) {
                Some(s) => known.push((s, trace)),
                None => {
                    clilog::warn!(
                        GC_UNKNOWN_SIG, "signal {} is not in the iospec, skipped", name
                    );
                }
            }
        }
        let hardware = match known.first() {
            Some((s, _)) => s.hardware.clone(),
            None => return Err(GlueError::NoSignals)
        };
        if let Some((s, _)) = known.iter().find(|(s, _)| s.hardware != hardware) {
            return Err(GlueError::HardwareMismatch {
                signal: s.name.clone(),
                expected: hardware,
                found: s.hardware.clone()
            });
        }
        let present = known.iter()
            .map(|(s, _)| s.name.as_str())
            .collect::<HashSet<_>>();
        self.check_mux(&present)?;

        let len = known.iter().map(|(_, t)| t.len()).max().unwrap_or(0);
        let mut wave = GlueWave::zeros(len, strobe_ps, hardware.clone());
        for (s, trace) in &known {
            let last = trace.last().copied().unwrap_or(false);
            for t in 0..len {
                if trace.get(t).copied().unwrap_or(last) {
                    wave.set_bit(t, s.bit_pos, true)?;
                }
            }
        }
        for s in self.iospec.signals_in(&hardware) {
            if present.contains(s.name.as_str()) {
                continue;
            }
            if self.iospec.mux_group_of(&s.name).is_some() {
                clilog::debug!("muxed signal {} not supplied, dropped", s.name);
                continue;
            }
            clilog::info!(
                GC_DEFAULT_SIG, "signal {} not supplied, using default {}",
                s.name, s.default as u8
            );
            wave.stage_default(s.bit_pos, s.default)?;
        }
        wave.commit_defaults();
        Ok(wave)
    }

    /// Refuse when more than one member of a multiplexed pin is present.
    fn check_mux(&self, present: &HashSet<&str>) -> GlueResult<()> {
        for mux in self.iospec.mux_groups() {
            let hits = mux.signals.iter()
                .filter(|n| present.contains(n.as_str()))
                .cloned()
                .collect::<Vec<_>>();
            if hits.len() > 1 {
                return Err(GlueError::AmbiguousMux {
                    hardware: mux.hardware.clone(),
                    bit_pos: mux.bit_pos,
                    signals: hits
                });
            }
        }
        Ok(())
    }

    /// Convert an ASCII wave, each character lasting `ticks_per_bit`
    /// timesteps.
    pub fn ascii2glue(
        &self, ascii: &AsciiWave, ticks_per_bit: usize, strobe_ps: f64
    ) -> GlueResult<GlueWave> {
        let expanded = ascii.expand(ticks_per_bit.max(1));
        self.dict2glue(expanded.iter().map(|(n, t)| (n.as_str(), &t[..])), strobe_ps)
    }

    /// Read and convert an ASCII wave file.
    pub fn ascii2glue_file(
        &self, path: impl AsRef<Path>, ticks_per_bit: usize, strobe_ps: f64
    ) -> GlueResult<GlueWave> {
        self.ascii2glue(&AsciiWave::read(path)?, ticks_per_bit, strobe_ps)
    }

    /// Render the signals of a wave's hardware group as an ASCII wave,
    /// one character per timestep.
    pub fn glue2ascii(&self, wave: &GlueWave) -> AsciiWave {
        let traces = self.signal_traces(wave, None);
        AsciiWave::from_traces(traces.iter().map(|(n, t)| (n.as_str(), &t[..])))
    }

    /// Named traces of a wave's hardware group, optionally limited to a
    /// `[start, end)` window in picoseconds. This is what a plotting
    /// sink consumes.
    pub fn signal_traces(
        &self, wave: &GlueWave, window_ps: Option<(f64, f64)>
    ) -> Vec<(CompactString, Vec<bool>)> {
        let (lo, hi) = match window_ps {
            Some((s, e)) if wave.strobe_ps > 0. => (
                ((s / wave.strobe_ps).max(0.) as usize).min(wave.len()),
                ((e / wave.strobe_ps).max(0.) as usize).min(wave.len())
            ),
            _ => (0, wave.len())
        };
        analysis::wave_signals(&self.iospec, wave).map(|s| {
            let trace = wave.get_trace(s.bit_pos);
            (s.name.clone(), trace[lo..hi.max(lo)].to_vec())
        }).collect()
    }

    /// Force one signal to a constant across the whole wave.
    pub fn force_signal(
        &self, wave: &mut GlueWave, name: &str, value: bool
    ) -> GlueResult<()> {
        let s = self.iospec.require(name)?;
        if let Some(hw) = &wave.hardware {
            if *hw != s.hardware {
                return Err(GlueError::HardwareMismatch {
                    signal: s.name.clone(),
                    expected: hw.clone(),
                    found: s.hardware.clone()
                });
            }
        }
        wave.stage_default(s.bit_pos, value)?;
        wave.commit_defaults();
        clilog::info!("forced {} to {}", name, value as u8);
        Ok(())
    }

    #[inline]
    pub fn compare(&self, wave1: &GlueWave, wave2: &GlueWave) -> CompareReport {
        analysis::compare(&self.iospec, wave1, wave2)
    }

    #[inline]
    pub fn diff<S: AsRef<str>>(
        &self, wave1: &GlueWave, wave2: &GlueWave, names: &[S]
    ) -> GlueResult<Vec<DiffTraces>> {
        analysis::diff(&self.iospec, wave1, wave2, names)
    }

    #[inline]
    pub fn get_bitstream(&self, wave: &GlueWave, name: &str) -> GlueResult<Vec<bool>> {
        analysis::get_bitstream(&self.iospec, wave, name)
    }

    #[inline]
    pub fn get_clocked_bitstream(
        &self, wave: &GlueWave, clock: &str, data: &str
    ) -> GlueResult<Vec<bool>> {
        analysis::get_clocked_bitstream(&self.iospec, wave, clock, data)
    }

    /// Write the clocked bitstream as comma-separated `0`/`1`.
    pub fn export_clocked_bitstream(
        &self, wave: &GlueWave, clock: &str, data: &str,
        path: impl AsRef<Path>
    ) -> GlueResult<Vec<bool>> {
        let bits = self.get_clocked_bitstream(wave, clock, data)?;
        fs::write(path.as_ref(), bits.iter().map(|&b| b as u8).join(","))?;
        clilog::info!("exported {} bits to {}", bits.len(), path.as_ref().display());
        Ok(bits)
    }
}
