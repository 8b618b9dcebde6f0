//! Pagination utilities shared by the service and HTTP layers
//!
//! Provides a simple `Pagination` struct and helpers to normalize inputs.

use serde::Deserialize;

/// Pagination parameters
#[derive(Clone, Copy, Debug, Deserialize)]
pub struct Pagination {
    /// 1-based page index
    #[serde(default = "default_page")]
    pub page: u32,
    /// items per page
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

fn default_page() -> u32 { 1 }
fn default_per_page() -> u32 { 20 }

impl Pagination {
    /// Clamp to sane defaults and convert to `u64`
    pub fn normalize(self) -> (u64, u64) {
        let page = if self.page == 0 { 1 } else { self.page };
        let per_page = self.per_page.clamp(1, 100);
        ((page - 1) as u64, per_page as u64)
    }

    /// Normalized 1-based page and page size, as echoed back to clients.
    pub fn echo(self) -> (u32, u32) {
        let (idx, per) = self.normalize();
        (idx as u32 + 1, per as u32)
    }
}

impl Default for Pagination {
    fn default() -> Self { Self { page: default_page(), per_page: default_per_page() } }
}
