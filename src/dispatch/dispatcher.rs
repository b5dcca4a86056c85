use crate::buffer::view::{BufferView, BufferViewMut, StridedLayout};
use crate::dispatch::context::DispatchContext;
use crate::dispatch::state::DispatchState;
use crate::foundation::core::Coord;
use crate::foundation::error::{DispatchError, DispatchResult};
use crate::kernel::{ElementArgs, Kernel, KernelSignature};
use crate::launch::clip::LaunchParams;
use crate::launch::domain::IterationDomain;
use crate::partition::slicer::{SliceAxis, slice_size};

/// How a launch was executed.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    /// The clip collapsed the domain; no kernel invocation happened.
    Empty,
    /// Nested `array -> z -> y -> x` loop on the calling thread.
    Sequential,
    /// Row slices claimed by pool workers.
    ParallelRows,
    /// Column slices of a single row claimed by pool workers.
    ParallelColumns,
}

/// Outcome of one launch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
pub struct DispatchStats {
    /// Execution path taken.
    pub mode: ExecutionMode,
    /// Kernel invocations performed.
    pub elements: u64,
    /// Slices the domain was cut into (1 for sequential runs).
    pub slices: u64,
    /// Length of each slice along the sliced axis (0 when not sliced).
    pub slice_size: u32,
}

impl DispatchStats {
    fn empty() -> Self {
        Self {
            mode: ExecutionMode::Empty,
            elements: 0,
            slices: 0,
            slice_size: 0,
        }
    }
}

impl DispatchContext {
    /// Run `kernel` once for every coordinate of the launch domain.
    ///
    /// The domain comes from the input buffer's extents (the output's when no input is bound),
    /// clipped by `launch.clip`. The call blocks until every element has been processed. It goes
    /// parallel only when the pool has more than one worker, the kernel is threadable, the domain
    /// is a single plane and no other parallel launch holds this context; otherwise it runs the
    /// sequential loop on the calling thread.
    ///
    /// All failures are reported before the first kernel invocation.
    #[tracing::instrument(level = "debug", skip_all, fields(user_len = launch.user.len()))]
    pub fn dispatch<K: Kernel + ?Sized>(
        &self,
        kernel: &K,
        input: Option<BufferView<'_>>,
        output: Option<BufferViewMut<'_>>,
        launch: &LaunchParams<'_>,
    ) -> DispatchResult<DispatchStats> {
        let dims = match (&input, &output) {
            (Some(i), _) => i.layout().extents(),
            (None, Some(o)) => o.layout().extents(),
            (None, None) => return Err(DispatchError::MissingBuffer),
        };
        let info = kernel.info();
        check_signature(info.signature, input.is_some(), output.is_some())?;

        let Some(domain) = IterationDomain::resolve(dims, &launch.clip) else {
            tracing::debug!("launch range is empty");
            return Ok(DispatchStats::empty());
        };
        check_covers("input", input.as_ref().map(|v| v.layout()), &domain)?;
        check_covers("output", output.as_ref().map(|v| v.layout()), &domain)?;

        let workers = self.worker_count();
        if self.opts().allow_parallel
            && workers > 1
            && info.threadable
            && domain.is_single_plane()
            && let Some(_guard) = self.try_acquire_parallel()
        {
            return Ok(self.run_parallel(kernel, input, output, launch.user, domain));
        }

        tracing::debug!(
            workers,
            threadable = info.threadable,
            elements = domain.element_count(),
            "running launch sequentially"
        );
        Ok(run_sequential(kernel, input, output, launch.user, &domain))
    }

    fn run_parallel<K: Kernel + ?Sized>(
        &self,
        kernel: &K,
        input: Option<BufferView<'_>>,
        output: Option<BufferViewMut<'_>>,
        user: &[u8],
        domain: IterationDomain,
    ) -> DispatchStats {
        let axis = SliceAxis::choose(domain.dims);
        let extent = match axis {
            SliceAxis::Rows => domain.y.len(),
            SliceAxis::Columns => domain.x.len(),
        };
        let workers = self.worker_count();
        let size = slice_size(extent, workers, self.opts().oversubscription);

        let state = DispatchState::new(kernel, input, output, user, domain, axis, size);
        tracing::debug!(
            workers,
            ?axis,
            slice_size = size,
            slices = state.slice_count(),
            "running launch in parallel"
        );
        self.pool().run_on_all(&|worker| state.run_worker(worker));

        DispatchStats {
            mode: match axis {
                SliceAxis::Rows => ExecutionMode::ParallelRows,
                SliceAxis::Columns => ExecutionMode::ParallelColumns,
            },
            elements: domain.element_count(),
            slices: state.slice_count() as u64,
            slice_size: size,
        }
    }
}

fn run_sequential<K: Kernel + ?Sized>(
    kernel: &K,
    input: Option<BufferView<'_>>,
    mut output: Option<BufferViewMut<'_>>,
    user: &[u8],
    domain: &IterationDomain,
) -> DispatchStats {
    for coord in domain.coords() {
        kernel.invoke(ElementArgs {
            input: input.as_ref().map(|v| v.element(coord)),
            output: output.as_mut().map(|v| v.element_mut(coord)),
            user,
            coord,
        });
    }
    DispatchStats {
        mode: ExecutionMode::Sequential,
        elements: domain.element_count(),
        slices: 1,
        slice_size: 0,
    }
}

fn check_signature(sig: KernelSignature, has_input: bool, has_output: bool) -> DispatchResult<()> {
    if sig.is_any() {
        return Ok(());
    }
    if sig.contains(KernelSignature::IN) && !has_input {
        return Err(DispatchError::signature(
            "kernel reads an input element but no input buffer is bound",
        ));
    }
    if sig.contains(KernelSignature::OUT) && !has_output {
        return Err(DispatchError::signature(
            "kernel writes an output element but no output buffer is bound",
        ));
    }
    Ok(())
}

fn check_covers(
    role: &str,
    layout: Option<&StridedLayout>,
    domain: &IterationDomain,
) -> DispatchResult<()> {
    let Some(layout) = layout else {
        return Ok(());
    };
    let last = Coord::new(
        domain.x.end - 1,
        domain.y.end - 1,
        domain.z.end - 1,
        domain.array.end - 1,
    );
    if !layout.contains(last) {
        return Err(DispatchError::validation(format!(
            "{role} buffer extents {:?} do not cover the launch domain {:?}",
            layout.extents(),
            domain.ends()
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/dispatch/dispatcher.rs"]
mod tests;
