//! Data-parallel forEach kernel dispatcher.
//!
//! A kernel is a function applied independently to every element of a 1D/2D/3D/array-indexed
//! buffer. This crate executes such a kernel over a (possibly clipped) iteration domain, either as
//! a plain nested loop on the calling thread or across a pool of workers that atomically claim
//! slices of the domain.
//!
//! # Pipeline overview
//!
//! 1. **Describe buffers**: borrow bytes as a [`BufferView`] / [`BufferViewMut`] with a
//!    [`StridedLayout`] (element stride, row stride, extents).
//! 2. **Describe the launch**: [`LaunchParams`] carries opaque user bytes and an optional
//!    [`ClipRange`].
//! 3. **Dispatch**: [`DispatchContext::dispatch`] resolves the [`IterationDomain`], picks the
//!    sequential or parallel path and blocks until every element has been visited exactly once.
//!
//! The key design constraints:
//!
//! - **No unsafe**: parallel workers receive disjoint output windows split up front.
//! - **No nested pool use**: a launch issued while another parallel launch holds the context runs
//!   sequentially.
//! - **Errors before work**: a malformed launch never partially executes.
#![forbid(unsafe_code)]
#![deny(missing_docs)]

mod buffer;
mod dispatch;
mod foundation;
mod kernel;
mod launch;
mod partition;
mod pool;
mod script;

/// Stock RGBA8 kernels.
pub mod builtin;

pub use buffer::view::{BufferView, BufferViewMut, StridedLayout};
pub use dispatch::context::{DispatchContext, DispatchOpts};
pub use dispatch::dispatcher::{DispatchStats, ExecutionMode};
pub use foundation::core::{AxisRange, Coord, Extents};
pub use foundation::error::{DispatchError, DispatchResult};
pub use kernel::{ElementArgs, FnKernel, Kernel, KernelInfo, KernelSignature, kernel_fn};
pub use launch::clip::{ClipRange, LaunchParams, ScriptCall};
pub use launch::domain::IterationDomain;
pub use partition::slicer::{
    ClaimedSlice, DEFAULT_OVERSUBSCRIPTION, SliceAxis, claim_next_slice, slice_count, slice_range,
    slice_size,
};
pub use pool::worker_pool::{InlinePool, RayonWorkerPool, WorkerPool};
pub use script::module::{ScriptModule, ScriptModuleBuilder};
