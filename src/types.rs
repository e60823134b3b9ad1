//! Core type definitions for the runtime support layer.
//!
//! This module defines the fundamental identifier types shared by the
//! message queues and the registry tables.

/// Identifier of one scheduled unit of parallel evaluation work.
///
/// Task ids are assigned by the external scheduler and are numbered
/// consistently with the side-effect order the sequential semantics would
/// produce, so ordering deferred messages by task id reconstructs
/// deterministic behavior regardless of actual thread scheduling.
pub type TaskId = u32;

/// Sentinel task id meaning "no task is active on this thread".
///
/// Code running outside any scheduled unit (a top-level initial action, the
/// driver itself) carries this id; messages posted under it execute
/// synchronously instead of being queued.
pub const NO_TASK: TaskId = 0;

/// Identifier of a scope (a named unit of the simulated hierarchy, such as
/// a module instance).
pub type ScopeId = u64;

/// Wire encoding of a virtual file handle.
///
/// Bit 31 set: a single descriptor, index in the low bits. Bit 31 clear: a
/// multi-channel descriptor, a bitmask addressing up to 31 legacy channels.
/// The value `0` is invalid and is what failed opens return.
pub type FileToken = u32;
