//! Host-facing simulation layer.
//!
//! Everything above the core lives here:
//! 1. **Loader:** ELF and raw-image placement into simulated memory.
//! 2. **Simulator:** The run loop and debugger-style state access.
//! 3. **Host services:** The software-interrupt bridge to host I/O.
//! 4. **Statistics:** Retirement and timing counters.

/// Program loading (ELF and raw images).
pub mod loader;

/// The host-facing run loop.
pub mod simulator;

/// Execution statistics.
pub mod stats;

/// The host service trap (software interrupt 255).
pub mod syscall;

pub use loader::LoadError;
pub use simulator::Simulator;
pub use stats::SimStats;
pub use syscall::HostIo;
