//! Capture sources and the scene that composes them (spec §3, §9).
//!
//! `SourceSet` owns every `Source`; the "currently visible" source is a
//! non-owning index into the set, never a pointer, per spec §9 design
//! notes.

mod game;

pub use game::GameSource;

use crate::engine::SourceHandle;

/// Stable identity for a `Source` within a `SourceSet`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SourceId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    Game,
    Monitor,
    Window,
    Brb,
    Gaze,
    Image,
    Generic,
}

impl SourceKind {
    /// True for the exclusive "base layer" kinds: at most one of these may
    /// be visible at a time (spec §3 Scene invariant).
    pub fn is_base_layer(self) -> bool {
        matches!(self, SourceKind::Game | SourceKind::Monitor | SourceKind::Window)
    }
}

/// Parameters used to create a source in the engine (spec §4.2.1 scene
/// sub-objects).
#[derive(Debug, Clone)]
pub struct SourceSpec {
    pub kind: SourceKind,
    pub name: String,
}

/// Extra state carried by a monitor capture source, needed to rebuild it in
/// "compatible" mode after the black-texture probe detects it (spec §4.2.4).
#[derive(Debug, Clone)]
pub struct MonitorState {
    pub monitor_id: String,
    pub monitor_handle: i64,
    pub force: bool,
}

/// One capture node in the scene (spec §3 Source).
#[derive(Debug, Clone)]
pub struct Source {
    pub id: SourceId,
    pub kind: SourceKind,
    pub name: String,
    pub visible: bool,
    pub handle: SourceHandle,
    pub z_order: u32,
    pub game: Option<GameSource>,
    pub monitor: Option<MonitorState>,
}

impl Source {
    pub fn new(id: SourceId, kind: SourceKind, name: impl Into<String>, handle: SourceHandle) -> Self {
        Self {
            id,
            kind,
            name: name.into(),
            visible: false,
            handle,
            z_order: 0,
            game: None,
            monitor: None,
        }
    }
}

/// Owns every `Source` plus the current visibility selection. Enforces
/// which sources may coexist (spec §3 Scene: at most one base-layer source
/// visible at a time).
#[derive(Debug, Default)]
pub struct SourceSet {
    sources: Vec<Source>,
    next_id: u64,
    /// Cached index of the current "visible" (base-layer) source, if any.
    visible: Option<SourceId>,
    /// Deferred tobii overlay: `Some(spec)` when a game source exists but
    /// hasn't started capturing yet (spec §4.2.1).
    pub deferred_tobii: Option<SourceSpec>,
}

impl SourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, kind: SourceKind, name: impl Into<String>, handle: SourceHandle) -> SourceId {
        let id = SourceId(self.next_id);
        self.next_id += 1;
        self.sources.push(Source::new(id, kind, name, handle));
        id
    }

    pub fn remove(&mut self, id: SourceId) -> Option<Source> {
        let idx = self.sources.iter().position(|s| s.id == id)?;
        let removed = self.sources.remove(idx);
        if self.visible == Some(id) {
            self.visible = None;
        }
        Some(removed)
    }

    pub fn get(&self, id: SourceId) -> Option<&Source> {
        self.sources.iter().find(|s| s.id == id)
    }

    pub fn get_mut(&mut self, id: SourceId) -> Option<&mut Source> {
        self.sources.iter_mut().find(|s| s.id == id)
    }

    pub fn find_by_kind(&self, kind: SourceKind) -> Option<&Source> {
        self.sources.iter().find(|s| s.kind == kind)
    }

    pub fn find_by_kind_mut(&mut self, kind: SourceKind) -> Option<&mut Source> {
        self.sources.iter_mut().find(|s| s.kind == kind)
    }

    pub fn has_kind(&self, kind: SourceKind) -> bool {
        self.find_by_kind(kind).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Source> {
        self.sources.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Source> {
        self.sources.iter_mut()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn visible_source(&self) -> Option<&Source> {
        self.visible.and_then(|id| self.get(id))
    }

    pub fn visible_source_name(&self) -> Option<String> {
        self.visible_source().map(|s| s.name.clone())
    }

    /// Sets per-source visibility flags and the cached "current visible
    /// source" index. Returns `true` if the visible source's identity
    /// changed (spec §4.3: triggers `DISPLAY_SOURCE_CHANGED`).
    pub fn apply_visibility(&mut self, visible_ids: &[SourceId], new_visible: Option<SourceId>) -> bool {
        for source in &mut self.sources {
            source.visible = visible_ids.contains(&source.id);
        }
        let changed = self.visible != new_visible;
        self.visible = new_visible;
        changed
    }

    pub fn move_to_top(&mut self, id: SourceId) {
        if let Some(idx) = self.sources.iter().position(|s| s.id == id) {
            let max_z = self.sources.iter().map(|s| s.z_order).max().unwrap_or(0);
            self.sources[idx].z_order = max_z + 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_most_one_base_layer_source_is_tracked_visible() {
        let mut set = SourceSet::new();
        let game = set.insert(SourceKind::Game, "game", SourceHandle(1));
        let monitor = set.insert(SourceKind::Monitor, "monitor", SourceHandle(2));

        assert!(set.apply_visibility(&[monitor], Some(monitor)));
        assert_eq!(set.visible_source().unwrap().id, monitor);
        assert!(!set.get(game).unwrap().visible);
    }

    #[test]
    fn removing_the_visible_source_clears_the_cache() {
        let mut set = SourceSet::new();
        let monitor = set.insert(SourceKind::Monitor, "monitor", SourceHandle(1));
        set.apply_visibility(&[monitor], Some(monitor));
        set.remove(monitor);
        assert!(set.visible_source().is_none());
    }
}
