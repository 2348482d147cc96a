//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `semestra_core` linkage.
//! - Keep output deterministic for quick local sanity checks.

use semestra_core::db::migrations::latest_version;

fn main() {
    println!("semestra_core ping={}", semestra_core::ping());
    println!("semestra_core version={}", semestra_core::core_version());
    println!("semestra_core schema_version={}", latest_version());
}
