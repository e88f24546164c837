//! sysdefs (System Definitions) is a small crate meant exclusively to contain
//! definitions for simple, basic, or axiomatic system concepts: CPU
//! architectures, C libraries and the partition types the installer writes.
//!
//! As the name implies, the crate mainly provides definitions, and should
//! contain minimal or no behavior at all.

pub mod arch;
pub mod partition_types;
