/// Rolling-window stability analysis over a canonical table.
///
/// Submodules:
/// - `windows`   - two-pointer scan producing time windows over `datetime`.
/// - `stability` - applies the criteria table to every window.

pub mod stability;
pub mod windows;

pub use stability::test_stability;
pub use windows::{Window, rolling_windows};
