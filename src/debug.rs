use crate::step::MergeDirection;
use crate::units::Acceleration;
#[cfg(feature = "debug")]
use serde_json::json;

#[cfg(feature = "debug")]
thread_local!(
    static DEBUG_FRAME: std::cell::RefCell<Vec<serde_json::Value>> = Default::default();
);

/// Records the utilities a lane change decision was based on.
#[allow(unused)]
pub fn debug_utilities(
    straight: Acceleration,
    preferred: Option<Acceleration>,
    non_preferred: Option<Acceleration>,
    direction: MergeDirection,
) {
    #[cfg(feature = "debug")]
    DEBUG_FRAME.with(|frame| {
        // JSON has no infinities; those become null
        let value = |u: Option<Acceleration>| u.map(|u| u.si()).filter(|u| u.is_finite());
        frame.borrow_mut().push(json!({
            "type": "utilities",
            "straight": value(Some(straight)),
            "preferred": value(preferred),
            "nonPreferred": value(non_preferred),
            "direction": format!("{:?}", direction),
        }))
    })
}

#[cfg(feature = "debug")]
pub fn take_debug_frame() -> serde_json::Value {
    json!(DEBUG_FRAME.with(|frame| frame.take()))
}
