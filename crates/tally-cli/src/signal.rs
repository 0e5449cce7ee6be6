//! SIGINT wiring
//!
//! The first Ctrl+C requests a graceful stop between attempts; the chunk in
//! flight is discarded and the checkpoint stays where it was. A second
//! Ctrl+C aborts the process immediately.

use tally_core::{InterruptManager, InterruptReason};

/// Exit code for an interrupted run (128 + SIGINT)
pub const INTERRUPTED_EXIT_CODE: u8 = 130;

/// Install the Ctrl+C handler for the given interrupt manager
pub fn install(interrupts: InterruptManager) {
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            eprintln!("\nStopping after the current call... (Ctrl+C again to abort)");
            interrupts.interrupt(InterruptReason::UserInterrupt);

            if tokio::signal::ctrl_c().await.is_ok() {
                std::process::exit(INTERRUPTED_EXIT_CODE as i32);
            }
        }
    });
}
