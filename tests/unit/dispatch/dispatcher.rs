use super::*;
use crate::dispatch::context::DispatchOpts;
use crate::foundation::core::Extents;
use crate::kernel::kernel_fn;
use crate::launch::clip::ClipRange;
use crate::pool::worker_pool::RayonWorkerPool;
use std::sync::atomic::{AtomicU64, Ordering};

fn pool_ctx(threads: usize) -> DispatchContext {
    DispatchContext::with_pool(
        RayonWorkerPool::new(Some(threads)).unwrap(),
        DispatchOpts::default(),
    )
    .unwrap()
}

fn counting_kernel(count: &AtomicU64) -> impl Kernel + '_ {
    kernel_fn(move |args: ElementArgs<'_>| {
        count.fetch_add(1, Ordering::Relaxed);
        if let Some(out) = args.output {
            out.fill(1);
        }
    })
}

#[test]
fn missing_buffers_are_rejected_without_work() {
    let count = AtomicU64::new(0);
    let ctx = pool_ctx(2);
    let err = ctx
        .dispatch(&counting_kernel(&count), None, None, &LaunchParams::new())
        .unwrap_err();
    assert!(matches!(err, DispatchError::MissingBuffer));
    assert_eq!(count.load(Ordering::Relaxed), 0);
}

#[test]
fn signature_requires_declared_buffers() {
    let ctx = DispatchContext::sequential();
    let mut out = vec![0u8; 4];
    let k = kernel_fn(|_| {}).with_signature(KernelSignature::IN | KernelSignature::OUT);
    let view = BufferViewMut::packed(&mut out, Extents::new_1d(4), 1).unwrap();
    let err = ctx
        .dispatch(&k, None, Some(view), &LaunchParams::new())
        .unwrap_err();
    assert!(matches!(err, DispatchError::SignatureMismatch(_)));

    let data = vec![0u8; 4];
    let k = kernel_fn(|_| {}).with_signature(KernelSignature::OUT);
    let view = BufferView::packed(&data, Extents::new_1d(4), 1).unwrap();
    let err = ctx
        .dispatch(&k, Some(view), None, &LaunchParams::new())
        .unwrap_err();
    assert!(err.to_string().contains("no output buffer"));
}

#[test]
fn empty_clip_is_a_successful_no_op() {
    let count = AtomicU64::new(0);
    let ctx = pool_ctx(4);
    let mut out = vec![0u8; 16];
    let view = BufferViewMut::packed(&mut out, Extents::new_2d(4, 4), 1).unwrap();
    let launch = LaunchParams::new().with_clip(ClipRange::default().x(3..3));
    let stats = ctx
        .dispatch(&counting_kernel(&count), None, Some(view), &launch)
        .unwrap();
    assert_eq!(stats.mode, ExecutionMode::Empty);
    assert_eq!(stats.elements, 0);
    assert_eq!(count.load(Ordering::Relaxed), 0);
    assert!(out.iter().all(|&b| b == 0));
}

#[test]
fn output_must_cover_the_input_domain() {
    let ctx = DispatchContext::sequential();
    let data = vec![0u8; 16];
    let mut out = vec![0u8; 8];
    let input = BufferView::packed(&data, Extents::new_2d(4, 4), 1).unwrap();
    let output = BufferViewMut::packed(&mut out, Extents::new_2d(4, 2), 1).unwrap();
    let err = ctx
        .dispatch(&kernel_fn(|_| {}), Some(input), Some(output), &LaunchParams::new())
        .unwrap_err();
    assert!(err.to_string().contains("output buffer extents"));

    // Clipping to rows the output has is fine.
    let input = BufferView::packed(&data, Extents::new_2d(4, 4), 1).unwrap();
    let output = BufferViewMut::packed(&mut out, Extents::new_2d(4, 2), 1).unwrap();
    let launch = LaunchParams::new().with_clip(ClipRange::default().y(0..2));
    assert!(
        ctx.dispatch(&kernel_fn(|_| {}), Some(input), Some(output), &launch)
            .is_ok()
    );
}

#[test]
fn parallel_path_is_chosen_for_threadable_plane() {
    let count = AtomicU64::new(0);
    let ctx = pool_ctx(2);
    let mut out = vec![0u8; 64 * 8];
    let view = BufferViewMut::packed(&mut out, Extents::new_2d(64, 8), 1).unwrap();
    let stats = ctx
        .dispatch(&counting_kernel(&count), None, Some(view), &LaunchParams::new())
        .unwrap();
    assert_eq!(stats.mode, ExecutionMode::ParallelRows);
    assert_eq!(stats.slice_size, 1);
    assert_eq!(stats.slices, 8);
    assert_eq!(stats.elements, 512);
    assert_eq!(count.load(Ordering::Relaxed), 512);
    assert!(out.iter().all(|&b| b == 1));
    assert!(!ctx.parallel_in_flight());
}

#[test]
fn one_dimensional_launch_slices_columns() {
    let ctx = pool_ctx(2);
    let mut out = vec![0u8; 100];
    let view = BufferViewMut::packed(&mut out, Extents::new_1d(100), 1).unwrap();
    let count = AtomicU64::new(0);
    let stats = ctx
        .dispatch(&counting_kernel(&count), None, Some(view), &LaunchParams::new())
        .unwrap();
    assert_eq!(stats.mode, ExecutionMode::ParallelColumns);
    assert_eq!(stats.slice_size, 12);
    assert_eq!(stats.slices, 9);
    assert_eq!(count.load(Ordering::Relaxed), 100);
}

#[test]
fn sequential_fallbacks() {
    let mut out = vec![0u8; 4 * 4 * 2];
    let count = AtomicU64::new(0);

    // Serial kernel.
    let ctx = pool_ctx(4);
    let serial = kernel_fn(|_| {}).serial();
    let view = BufferViewMut::packed(&mut out, Extents::new_2d(4, 4), 1).unwrap();
    let stats = ctx
        .dispatch(&serial, None, Some(view), &LaunchParams::new())
        .unwrap();
    assert_eq!(stats.mode, ExecutionMode::Sequential);

    // Single-worker pool.
    let ctx = pool_ctx(1);
    let view = BufferViewMut::packed(&mut out, Extents::new_2d(4, 4), 1).unwrap();
    let stats = ctx
        .dispatch(&counting_kernel(&count), None, Some(view), &LaunchParams::new())
        .unwrap();
    assert_eq!(stats.mode, ExecutionMode::Sequential);

    // Parallel disabled by options.
    let ctx = DispatchContext::with_pool(
        RayonWorkerPool::new(Some(4)).unwrap(),
        DispatchOpts {
            allow_parallel: false,
            ..DispatchOpts::default()
        },
    )
    .unwrap();
    let view = BufferViewMut::packed(&mut out, Extents::new_2d(4, 4), 1).unwrap();
    let stats = ctx
        .dispatch(&counting_kernel(&count), None, Some(view), &LaunchParams::new())
        .unwrap();
    assert_eq!(stats.mode, ExecutionMode::Sequential);

    // More than one plane.
    let ctx = pool_ctx(4);
    let view = BufferViewMut::packed(&mut out, Extents::new_3d(4, 4, 2), 1).unwrap();
    let stats = ctx
        .dispatch(&counting_kernel(&count), None, Some(view), &LaunchParams::new())
        .unwrap();
    assert_eq!(stats.mode, ExecutionMode::Sequential);
    assert_eq!(stats.elements, 32);
}

#[test]
fn held_flag_downgrades_to_sequential() {
    let ctx = pool_ctx(4);
    let _held = ctx.try_acquire_parallel().unwrap();
    let mut out = vec![0u8; 16];
    let view = BufferViewMut::packed(&mut out, Extents::new_2d(4, 4), 1).unwrap();
    let count = AtomicU64::new(0);
    let stats = ctx
        .dispatch(&counting_kernel(&count), None, Some(view), &LaunchParams::new())
        .unwrap();
    assert_eq!(stats.mode, ExecutionMode::Sequential);
    assert!(ctx.parallel_in_flight());
}

#[test]
fn user_bytes_reach_every_invocation() {
    let ctx = pool_ctx(3);
    let data: Vec<u8> = (0..30).collect();
    let mut out = vec![0u8; 30];
    let input = BufferView::packed(&data, Extents::new_2d(5, 6), 1).unwrap();
    let output = BufferViewMut::packed(&mut out, Extents::new_2d(5, 6), 1).unwrap();
    let k = kernel_fn(|args: ElementArgs<'_>| {
        let (Some(i), Some(o)) = (args.input, args.output) else {
            return;
        };
        o[0] = i[0].wrapping_add(args.user[0]);
    });
    let user = [100u8];
    ctx.dispatch(&k, Some(input), Some(output), &LaunchParams::new().with_user(&user))
        .unwrap();
    assert_eq!(out, (100..130).collect::<Vec<u8>>());
}
