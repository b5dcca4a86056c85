use super::*;
use crate::foundation::core::Extents;
use crate::kernel::kernel_fn;
use crate::launch::clip::ClipRange;

fn stamp_kernel() -> impl Kernel {
    kernel_fn(|args: ElementArgs<'_>| {
        if let Some(out) = args.output {
            out[0] = args.coord.x as u8;
            out[1] = args.coord.y as u8;
        }
    })
}

#[test]
fn row_windows_skip_padding_and_clipped_columns() {
    // 4x5 elements of 2 bytes, rows padded to 10 bytes.
    let layout = StridedLayout::new(Extents::new_2d(4, 5), 2, 10).unwrap();
    let mut buf = vec![0xeeu8; layout.byte_len()];
    let view = BufferViewMut::new(&mut buf, layout).unwrap();
    let clip = ClipRange::default().x(1..3).y(1..5);
    let domain = IterationDomain::resolve(layout.extents(), &clip).unwrap();

    let k = stamp_kernel();
    let state = DispatchState::new(&k, None, Some(view), &[], domain, SliceAxis::Rows, 3);
    assert_eq!(state.slice_count(), 2);
    state.run_worker(0);
    drop(state);

    for y in 0..5u32 {
        for x in 0..4u32 {
            let off = layout.offset(Coord::new(x, y, 0, 0));
            let inside = (1..3).contains(&x) && (1..5).contains(&y);
            if inside {
                assert_eq!(&buf[off..off + 2], &[x as u8, y as u8]);
            } else {
                assert_eq!(&buf[off..off + 2], &[0xee, 0xee], "({x},{y})");
            }
        }
        // Row padding stays untouched.
        let pad = y as usize * 10 + 8;
        if pad + 2 <= buf.len() {
            assert_eq!(&buf[pad..pad + 2], &[0xee, 0xee]);
        }
    }
}

#[test]
fn column_slices_cover_a_single_row() {
    let layout = StridedLayout::packed(Extents::new_1d(10), 2).unwrap();
    let mut buf = vec![0u8; layout.byte_len()];
    let view = BufferViewMut::new(&mut buf, layout).unwrap();
    let domain = IterationDomain::resolve(layout.extents(), &ClipRange::default()).unwrap();

    let k = stamp_kernel();
    let state = DispatchState::new(&k, None, Some(view), &[], domain, SliceAxis::Columns, 4);
    assert_eq!(state.slice_count(), 3);
    state.run_worker(0);
    drop(state);

    let xs: Vec<u8> = buf.chunks(2).map(|e| e[0]).collect();
    assert_eq!(xs, (0..10).collect::<Vec<u8>>());
}

#[test]
fn input_only_launch_reads_every_element() {
    let data: Vec<u8> = (0..12).collect();
    let view = BufferView::packed(&data, Extents::new_2d(3, 4), 1).unwrap();
    let domain = IterationDomain::resolve(view.layout().extents(), &ClipRange::default()).unwrap();

    let sum = std::sync::atomic::AtomicU32::new(0);
    let k = kernel_fn(|args: ElementArgs<'_>| {
        assert!(args.output.is_none());
        let v = u32::from(args.input.unwrap()[0]);
        sum.fetch_add(v, std::sync::atomic::Ordering::Relaxed);
    });
    let state = DispatchState::new(&k, Some(view), None, &[], domain, SliceAxis::Rows, 1);
    state.run_worker(0);
    assert_eq!(
        sum.load(std::sync::atomic::Ordering::Relaxed),
        (0..12).sum::<u32>()
    );
}

#[test]
fn workers_stop_after_the_counter_runs_out() {
    let layout = StridedLayout::packed(Extents::new_2d(2, 2), 2).unwrap();
    let mut buf = vec![0u8; layout.byte_len()];
    let view = BufferViewMut::new(&mut buf, layout).unwrap();
    let domain = IterationDomain::resolve(layout.extents(), &ClipRange::default()).unwrap();
    let k = stamp_kernel();
    let state = DispatchState::new(&k, None, Some(view), &[], domain, SliceAxis::Rows, 1);
    state.run_worker(0);
    // A late worker finds nothing left and returns immediately.
    state.run_worker(1);
}
