//! `GameSource`, the subtype of `Source` tracking game-capture state
//! (spec §3).

/// Extra state carried by a game capture source, layered on top of the
/// common `Source` fields.
#[derive(Debug, Clone)]
pub struct GameSource {
    pub process_id: u32,
    pub foreground: bool,
    pub compatibility_mode: bool,
    pub did_start_capture: bool,
    pub injection_failed: bool,
}

impl GameSource {
    pub fn new(process_id: u32, foreground: bool) -> Self {
        assert!(process_id > 0, "GameSource requires process_id > 0");
        Self {
            process_id,
            foreground,
            compatibility_mode: false,
            did_start_capture: false,
            injection_failed: false,
        }
    }
}
