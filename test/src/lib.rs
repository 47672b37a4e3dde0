pub mod helpers;

pub use helpers::*;

/// Routes `log` output through the test harness. Safe to call from every
/// test
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
