//! Hardware group path, e.g. `PXI1Slot5/NI6583/se_io`.

use compact_str::CompactString;
use serde::{ Serialize, Deserialize };
use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;
use itertools::Itertools;

/// A chassis/module/interface path naming the physical target of a wave.
///
/// The components are kept separately so the FPGA part and the
/// interface (FIFO) part can be addressed on their own.
#[derive(Hash, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct HwPath(pub Vec<CompactString>);

impl HwPath {
    /// Parse a slash-joined path. Empty components are dropped.
    #[inline]
    pub fn parse(s: &str) -> HwPath {
        HwPath(s.trim().split('/')
               .filter(|c| !c.is_empty())
               .map(CompactString::from)
               .collect())
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The chassis and module part, e.g. `PXI1Slot5/NI6583`.
    #[inline]
    pub fn fpga_name(&self) -> String {
        self.0.iter().take(2).join("/")
    }

    /// The innermost component (the interface or FIFO name).
    #[inline]
    pub fn innermost(&self) -> &str {
        self.0.last().map(|c| c.as_str()).unwrap_or("")
    }
}

impl FromStr for HwPath {
    type Err = std::convert::Infallible;

    #[inline]
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(HwPath::parse(s))
    }
}

impl fmt::Display for HwPath {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.iter().format("/"))
    }
}

impl fmt::Debug for HwPath {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self)
    }
}

// Vec<T> and [T] hash identically, so maps keyed by HwPath can be
// queried with a borrowed component slice.
impl Borrow<[CompactString]> for HwPath {
    #[inline]
    fn borrow(&self) -> &[CompactString] {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display() {
        let hw = HwPath::parse("PXI1Slot5/NI6583/se_io");
        assert_eq!(hw.0.len(), 3);
        assert_eq!(hw.to_string(), "PXI1Slot5/NI6583/se_io");
        assert_eq!(hw.fpga_name(), "PXI1Slot5/NI6583");
        assert_eq!(hw.innermost(), "se_io");
    }

    #[test]
    fn borrowed_lookup() {
        let mut m = indexmap::IndexMap::new();
        m.insert(HwPath::parse("a/b/c"), 1);
        let key = [CompactString::from("a"), "b".into(), "c".into()];
        assert_eq!(m.get(&key[..]), Some(&1));
    }
}
