//! Vendor priority ordering
//!
//! Vendor codes of a song are presented in a fixed order: the major chains
//! first, then every other vendor alphabetically.

use ktv_common::config::DEFAULT_VENDORS;
use ktv_common::VendorCode;
use std::cmp::Ordering;

/// Ordered vendor table; unlisted vendors rank after every listed one
#[derive(Debug, Clone)]
pub struct VendorPriority {
    vendors: Vec<String>,
}

impl Default for VendorPriority {
    fn default() -> Self {
        Self::new(DEFAULT_VENDORS.iter().map(|v| v.to_string()).collect())
    }
}

impl VendorPriority {
    pub fn new(vendors: Vec<String>) -> Self {
        Self { vendors }
    }

    /// Position in the table, or `usize::MAX` for unlisted vendors
    pub fn rank(&self, vendor: &str) -> usize {
        self.vendors
            .iter()
            .position(|v| v == vendor)
            .unwrap_or(usize::MAX)
    }

    /// Total order: table rank, then vendor name, then code
    pub fn compare(&self, a: &VendorCode, b: &VendorCode) -> Ordering {
        self.rank(&a.vendor)
            .cmp(&self.rank(&b.vendor))
            .then_with(|| a.vendor.cmp(&b.vendor))
            .then_with(|| a.code.cmp(&b.code))
    }

    pub fn sort(&self, codes: &mut [VendorCode]) {
        codes.sort_by(|a, b| self.compare(a, b));
    }
}
