use super::*;

#[test]
fn script_call_zero_end_means_whole_axis() {
    let clip = ClipRange::from(ScriptCall {
        x_start: 3,
        x_end: 0,
        y_start: 1,
        y_end: 4,
        ..ScriptCall::default()
    });
    assert_eq!(clip.x, None);
    assert_eq!(clip.y, Some(1..4));
    assert_eq!(clip.z, None);
    assert_eq!(clip.array, None);
}

#[test]
fn script_call_deserializes_with_missing_fields() {
    let sc: ScriptCall = serde_json::from_str(r#"{"x_start":2,"x_end":6}"#).unwrap();
    assert_eq!(ClipRange::from(sc), ClipRange::default().x(2..6));
}

#[test]
fn launch_params_builder_keeps_user_bytes() {
    let user = [1u8, 2, 3];
    let p = LaunchParams::new()
        .with_user(&user)
        .with_clip(ClipRange::default().y(0..2));
    assert_eq!(p.user, &[1, 2, 3]);
    assert!(!p.clip.is_unclipped());
    assert!(LaunchParams::new().clip.is_unclipped());
}
