//! `VisibilityPolicy`: a pure function from scene state to per-source
//! visibility and the "currently visible" source (spec §4.3).

use crate::sources::{SourceId, SourceKind, SourceSet};

/// Which base-layer source (if any) should be treated as visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VisibleSource {
    None,
    Game,
    Monitor,
    Window,
    Brb,
}

#[derive(Debug, Clone, Copy)]
pub struct PolicyInputs {
    pub game_in_foreground: bool,
    pub is_minimized: bool,
    pub keep_game_recording_on_lost_focus: bool,
}

#[derive(Debug, Clone, Default)]
pub struct PolicyOutput {
    /// Source ids that should be marked visible in the scene.
    pub visible_ids: Vec<SourceId>,
    pub new_visible_source: Option<SourceId>,
    pub new_visible_kind: Option<VisibleSource>,
    /// Whether the game source's `foreground` flag (as propagated to the
    /// engine) should be `true` — this can differ from the raw input when
    /// rule 1 (keep-on-lost-focus) applies.
    pub game_foreground_for_engine: bool,
    /// Overlay source ids that should move to the top of z-order.
    pub overlays_to_raise: Vec<SourceId>,
}

/// Computes visibility per spec §4.3. Pure: no engine calls, no mutation of
/// `sources` (the caller applies the result via `SourceSet::apply_visibility`
/// and `SourceSet::move_to_top`).
pub fn compute(sources: &SourceSet, inputs: PolicyInputs) -> PolicyOutput {
    let mut out = PolicyOutput::default();

    let game = sources.find_by_kind(SourceKind::Game);
    let monitor = sources.find_by_kind(SourceKind::Monitor);
    let window = sources.find_by_kind(SourceKind::Window);
    let brb = sources.find_by_kind(SourceKind::Brb);

    // Rule 1: keep-on-lost-focus widens the effective foreground flag.
    let effective_foreground = if game.is_some()
        && !inputs.game_in_foreground
        && !inputs.is_minimized
        && inputs.keep_game_recording_on_lost_focus
    {
        true
    } else {
        inputs.game_in_foreground
    };
    out.game_foreground_for_engine = effective_foreground;

    // Rule 3: a window source is always visible and wins outright.
    if let Some(window) = window {
        out.visible_ids.push(window.id);
        out.new_visible_source = Some(window.id);
        out.new_visible_kind = Some(VisibleSource::Window);
    } else {
        // Rule 2: monitor visible iff game is not in foreground.
        let monitor_visible = monitor.is_some() && !effective_foreground;
        if monitor_visible {
            let m = monitor.unwrap();
            out.visible_ids.push(m.id);
            out.new_visible_source = Some(m.id);
            out.new_visible_kind = Some(VisibleSource::Monitor);
        }

        // Rule 4: game visible iff no monitor, or game in foreground. BRB
        // (when present) occupies the "no monitor, game not foreground" slot
        // instead of the game source: it is created exactly for that case
        // (spec §4.2.1), so it takes over as the visible base layer there.
        if let Some(game) = game {
            let brb_visible = brb.is_some() && !effective_foreground && monitor.is_none();
            let game_visible = effective_foreground || (monitor.is_none() && !brb_visible);
            if game_visible {
                out.visible_ids.push(game.id);
                out.new_visible_source = Some(game.id);
                out.new_visible_kind = Some(VisibleSource::Game);
            }

            if let Some(brb) = brb {
                if brb_visible {
                    out.visible_ids.push(brb.id);
                    out.new_visible_source = Some(brb.id);
                    out.new_visible_kind = Some(VisibleSource::Brb);
                }
            }
        }
    }

    if out.new_visible_source.is_none() {
        out.new_visible_kind = Some(VisibleSource::None);
    }

    // Rule 5: overlays move to the top of z-order when visible.
    for source in sources.iter() {
        if matches!(source.kind, SourceKind::Gaze | SourceKind::Generic | SourceKind::Image) {
            out.overlays_to_raise.push(source.id);
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SourceHandle;

    fn inputs(foreground: bool) -> PolicyInputs {
        PolicyInputs {
            game_in_foreground: foreground,
            is_minimized: false,
            keep_game_recording_on_lost_focus: false,
        }
    }

    #[test]
    fn monitor_visible_only_when_game_not_foreground() {
        let mut sources = SourceSet::new();
        let game = sources.insert(SourceKind::Game, "game", SourceHandle(1));
        let monitor = sources.insert(SourceKind::Monitor, "monitor", SourceHandle(2));

        let out = compute(&sources, inputs(false));
        assert!(out.visible_ids.contains(&monitor));
        assert!(!out.visible_ids.contains(&game));

        let out = compute(&sources, inputs(true));
        assert!(!out.visible_ids.contains(&monitor));
        assert!(out.visible_ids.contains(&game));
    }

    #[test]
    fn window_source_always_wins() {
        let mut sources = SourceSet::new();
        sources.insert(SourceKind::Monitor, "monitor", SourceHandle(1));
        let window = sources.insert(SourceKind::Window, "window", SourceHandle(2));

        let out = compute(&sources, inputs(false));
        assert_eq!(out.new_visible_source, Some(window));
        assert_eq!(out.visible_ids, vec![window]);
    }

    #[test]
    fn brb_visible_only_without_monitor_and_game_not_foreground() {
        let mut sources = SourceSet::new();
        let game = sources.insert(SourceKind::Game, "game", SourceHandle(1));
        let brb = sources.insert(SourceKind::Brb, "brb", SourceHandle(2));

        let out = compute(&sources, inputs(false));
        assert!(out.visible_ids.contains(&brb));
        assert_eq!(out.new_visible_source, Some(brb));
        assert!(!out.visible_ids.contains(&game));

        let out = compute(&sources, inputs(true));
        assert!(!out.visible_ids.contains(&brb));
        assert!(out.visible_ids.contains(&game));
    }

    #[test]
    fn keep_on_lost_focus_widens_effective_foreground() {
        let mut sources = SourceSet::new();
        sources.insert(SourceKind::Game, "game", SourceHandle(1));
        let monitor = sources.insert(SourceKind::Monitor, "monitor", SourceHandle(2));

        let mut inputs = inputs(false);
        inputs.keep_game_recording_on_lost_focus = true;
        let out = compute(&sources, inputs);
        // Effective foreground becomes true, so monitor is NOT visible.
        assert!(!out.visible_ids.contains(&monitor));
        assert!(out.game_foreground_for_engine);
    }
}
