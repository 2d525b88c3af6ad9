//! Main binary entry point for `docsmith`.
//!
//! This binary simply delegates to the shared `entry_point::run_with_args()` function
//! so that both binaries behave the same way.

use anyhow::Result;

fn main() -> Result<()> {
    let code = docsmith::entry_point::run_with_args(std::env::args().skip(1).collect())?;
    std::process::exit(code);
}
