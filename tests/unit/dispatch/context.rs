use super::*;

#[test]
fn default_opts_match_documented_values() {
    let o = DispatchOpts::default();
    assert_eq!(o.threads, None);
    assert_eq!(o.oversubscription, 4);
    assert!(o.allow_parallel);
    assert!(o.validate().is_ok());
}

#[test]
fn opts_parse_with_defaults_for_missing_fields() {
    let o = DispatchOpts::from_json_str(r#"{"threads": 3}"#).unwrap();
    assert_eq!(o.threads, Some(3));
    assert_eq!(o.oversubscription, 4);

    let err = DispatchOpts::from_json_str(r#"{"oversubscription": 0}"#).unwrap_err();
    assert!(matches!(err, DispatchError::Validation(_)));

    let err = DispatchOpts::from_json_str("{not json").unwrap_err();
    assert!(matches!(err, DispatchError::Serde(_)));
}

#[test]
fn opts_load_from_file() {
    let dir = std::path::PathBuf::from("target").join("unit_dispatch_opts");
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("opts.json");
    std::fs::write(&path, r#"{"allow_parallel": false}"#).unwrap();
    let o = DispatchOpts::from_path(&path).unwrap();
    assert!(!o.allow_parallel);

    let err = DispatchOpts::from_path(dir.join("missing.json")).unwrap_err();
    assert!(err.to_string().contains("read dispatch opts"));
}

#[test]
fn new_rejects_zero_threads() {
    let opts = DispatchOpts {
        threads: Some(0),
        ..DispatchOpts::default()
    };
    assert!(DispatchContext::new(opts).is_err());
}

#[test]
fn guard_is_exclusive_and_released_on_drop() {
    let ctx = DispatchContext::sequential();
    assert!(!ctx.parallel_in_flight());

    let guard = ctx.try_acquire_parallel().unwrap();
    assert!(ctx.parallel_in_flight());
    assert!(ctx.try_acquire_parallel().is_none());
    drop(guard);

    assert!(!ctx.parallel_in_flight());
    assert!(ctx.try_acquire_parallel().is_some());
}

#[test]
fn guard_is_released_when_unwinding() {
    let ctx = DispatchContext::sequential();
    let res = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        let _g = ctx.try_acquire_parallel().unwrap();
        panic!("kernel trapped");
    }));
    assert!(res.is_err());
    assert!(!ctx.parallel_in_flight());
}

#[test]
fn context_reports_pool_size() {
    let ctx = DispatchContext::new(DispatchOpts {
        threads: Some(2),
        ..DispatchOpts::default()
    })
    .unwrap();
    assert_eq!(ctx.worker_count(), 2);
    assert_eq!(DispatchContext::sequential().worker_count(), 1);
}
