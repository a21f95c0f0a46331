//! The Glue wave: one bit-packed vector element per strobe.

use compact_str::CompactString;
use indexmap::IndexMap;
use crate::error::{ GlueError, GlueResult };
use crate::hwpath::HwPath;

/// A bit-packed multi-signal waveform for one hardware group.
///
/// Each element of `vector` holds the value of every signal of the
/// group at one timestep, signal `s` living at bit `s.bit_pos`.
#[derive(Debug, Clone)]
pub struct GlueWave {
    /// One bit-packed element per timestep.
    pub vector: Vec<u64>,
    /// Simulated time one element represents, in picoseconds.
    pub strobe_ps: f64,
    /// Target hardware group; `None` applies to all groups.
    pub hardware: Option<HwPath>,
    /// Staged bits to set on every element by `commit_defaults`.
    pub mask: u64,
    /// Staged bits to clear on every element by `commit_defaults`.
    pub unmask: u64,
    /// Free-form metadata carried to the file, not interpreted.
    pub metadata: IndexMap<CompactString, String>,
}

#[inline]
fn check_bit(bit_pos: u32) -> GlueResult<u64> {
    if bit_pos >= u64::BITS {
        return Err(GlueError::BitOutOfRange(bit_pos));
    }
    Ok(1u64 << bit_pos)
}

impl GlueWave {
    #[inline]
    pub fn new(
        vector: Vec<u64>, strobe_ps: f64, hardware: Option<HwPath>
    ) -> GlueWave {
        GlueWave {
            vector,
            strobe_ps,
            hardware,
            mask: 0,
            unmask: 0,
            metadata: IndexMap::new()
        }
    }

    /// A zero-filled wave of `len` timesteps.
    #[inline]
    pub fn zeros(len: usize, strobe_ps: f64, hardware: HwPath) -> GlueWave {
        GlueWave::new(vec![0; len], strobe_ps, Some(hardware))
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.vector.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.vector.is_empty()
    }

    /// Set or clear one bit at timestep `t`.
    pub fn set_bit(
        &mut self, t: usize, bit_pos: u32, value: bool
    ) -> GlueResult<()> {
        let bit = check_bit(bit_pos)?;
        let len = self.vector.len();
        let v = self.vector.get_mut(t)
            .ok_or(GlueError::TimestepOutOfRange { t, len })?;
        if value {
            *v |= bit;
        }
        else {
            *v &= !bit;
        }
        Ok(())
    }

    /// Stage a bit to be forced to `value` across the whole wave.
    ///
    /// Nothing changes until `commit_defaults` is called, so any number
    /// of defaulted signals cost a single pass over the vector.
    pub fn stage_default(&mut self, bit_pos: u32, value: bool) -> GlueResult<()> {
        let bit = check_bit(bit_pos)?;
        if value {
            self.mask |= bit;
            self.unmask &= !bit;
        }
        else {
            self.unmask |= bit;
            self.mask &= !bit;
        }
        Ok(())
    }

    /// Apply every staged default to every element, then clear the stage.
    pub fn commit_defaults(&mut self) {
        if self.mask == 0 && self.unmask == 0 {
            return;
        }
        let (set, clear) = (self.mask, !self.unmask);
        for v in self.vector.iter_mut() {
            *v = (*v & clear) | set;
        }
        self.mask = 0;
        self.unmask = 0;
    }

    /// Alias of `stage_default`.
    #[inline]
    pub fn set_mask_bit(&mut self, bit_pos: u32, value: bool) -> GlueResult<()> {
        self.stage_default(bit_pos, value)
    }

    /// Alias of `commit_defaults`.
    #[inline]
    pub fn apply_mask(&mut self) {
        self.commit_defaults()
    }

    /// Project one bit across all timesteps.
    pub fn get_trace(&self, bit_pos: u32) -> Vec<bool> {
        if bit_pos >= u64::BITS {
            return vec![false; self.vector.len()];
        }
        self.vector.iter().map(|v| (v >> bit_pos) & 1 == 1).collect()
    }

    /// Largest element, or 0 for an empty wave.
    #[inline]
    pub fn max_element(&self) -> u64 {
        self.vector.iter().copied().max().unwrap_or(0)
    }
}

/// Metadata and staged mask bits are not part of a wave's identity.
impl PartialEq for GlueWave {
    fn eq(&self, other: &Self) -> bool {
        self.vector == other.vector &&
            self.hardware == other.hardware &&
            self.strobe_ps == other.strobe_ps
    }
}
