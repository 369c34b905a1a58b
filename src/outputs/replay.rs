//! `ReplayBuffer`: ring-buffered encoder-packet store plus the start/stop
//! capture control plane (spec §4.5).

use std::collections::VecDeque;

use crate::engine::{Engine, EncoderPacket, OutputKind, OutputStartParams, PacketKind};
use crate::error::ReplayCaptureError;
use crate::outputs::base::{OutputBase, OutputState};
use crate::protocol::Identifier;

/// The ring never evicts below this many keyframes: at least two GOPs of
/// history are always retained (spec §4.5).
pub const MIN_RETAINED_KEYFRAMES: u32 = 3;

/// Watchdog window for an in-progress capture finalization (spec §4.5, §4.8).
pub const CAPTURE_STOP_TIMEOUT_USEC: i64 = 60_000_000;

#[derive(Debug, Clone, Default)]
pub struct ReplayConfig {
    pub max_time_sec: u32,
    pub max_size_mb: u32,
}

impl ReplayConfig {
    pub fn max_size_bytes(&self) -> u64 {
        self.max_size_mb as u64 * 1024 * 1024
    }

    pub fn max_time_usec(&self) -> i64 {
        self.max_time_sec as i64 * 1_000_000
    }
}

/// State of an in-progress `START_REPLAY_CAPTURE` → `STOP_REPLAY_CAPTURE`
/// session (spec §4.5).
#[derive(Debug, Clone)]
struct CaptureSession {
    path: String,
    thumbnail_folder: Option<String>,
    save_start_pts_usec: i64,
    /// Set once `STOP_REPLAY_CAPTURE` is received; muxing continues until a
    /// packet with `sys_pts_usec >= save_ts` arrives.
    save_ts: Option<i64>,
    started_at_pts_usec: i64,
    disconnection: bool,
}

#[derive(Debug)]
pub struct ReplayBuffer {
    pub base: OutputBase,
    config: ReplayConfig,
    deque: VecDeque<EncoderPacket>,
    cur_size: u64,
    keyframes: u32,
    /// Latches once the first keyframe is ever evicted; never resets
    /// within a run (spec §4.5: `REPLAY_ARMED` fires exactly once).
    armed: bool,
    capture: Option<CaptureSession>,
    /// Set when `STOP` arrives while `capture.is_some()` and not forced:
    /// the replay output itself stops once the in-flight capture finalizes.
    pub stop_replay_on_replay_ready: bool,
}

#[derive(Debug, Clone)]
pub struct CaptureReady {
    pub path: String,
    pub duration_ms: u64,
    pub thumbnail_folder: Option<String>,
    pub disconnection: bool,
}

impl ReplayBuffer {
    pub fn new() -> Self {
        Self {
            base: OutputBase::new(),
            config: ReplayConfig::default(),
            deque: VecDeque::new(),
            cur_size: 0,
            keyframes: 0,
            armed: false,
            capture: None,
            stop_replay_on_replay_ready: false,
        }
    }

    pub fn configure(&mut self, config: ReplayConfig) {
        self.config = config;
    }

    pub fn start_delay(&mut self, identifier: Identifier) {
        self.base.start_delay(identifier);
    }

    pub fn start(&mut self, engine: &dyn Engine, identifier: Identifier) -> Result<(), ()> {
        let params = OutputStartParams::default();
        match engine.start_output(OutputKind::Replay, &params) {
            Ok(()) => {
                self.base.start_active(identifier);
                Ok(())
            }
            Err(_) => Err(()),
        }
    }

    pub fn is_capturing(&self) -> bool {
        self.capture.is_some()
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    /// Pushes one newly-encoded packet, applying the eviction discipline
    /// (spec §4.5). Returns `true` the instant the ring becomes armed.
    pub fn push_packet(&mut self, packet: EncoderPacket) -> bool {
        let just_armed = self.evict_for(&packet);

        if packet.keyframe && packet.kind == PacketKind::Video {
            self.keyframes += 1;
        }
        self.cur_size += packet.size as u64;
        self.deque.push_back(packet);

        just_armed
    }

    /// Evicts from the front until the new packet fits, never evicting
    /// below `MIN_RETAINED_KEYFRAMES` and always stopping at a keyframe
    /// boundary once eviction starts (spec §4.5).
    fn evict_for(&mut self, incoming: &EncoderPacket) -> bool {
        let mut just_armed = false;
        loop {
            if self.keyframes <= MIN_RETAINED_KEYFRAMES {
                break;
            }
            let over_size = self.cur_size + incoming.size as u64 > self.config.max_size_bytes();
            let over_time = self
                .deque
                .front()
                .map(|oldest| incoming.dts_usec - oldest.dts_usec > self.config.max_time_usec())
                .unwrap_or(false);
            if !over_size && !over_time {
                break;
            }
            let Some(evicted) = self.deque.pop_front() else {
                break;
            };
            self.cur_size = self.cur_size.saturating_sub(evicted.size as u64);
            if evicted.keyframe && evicted.kind == PacketKind::Video {
                self.keyframes -= 1;
                if !self.armed {
                    self.armed = true;
                    just_armed = true;
                }
                // Stop evicting right at the next keyframe boundary so the
                // buffer always starts at one, unless still over budget.
                let still_over = self.cur_size + incoming.size as u64 > self.config.max_size_bytes()
                    || self
                        .deque
                        .front()
                        .map(|oldest| incoming.dts_usec - oldest.dts_usec > self.config.max_time_usec())
                        .unwrap_or(false);
                if !still_over {
                    break;
                }
            }
        }
        just_armed
    }

    /// `START_REPLAY_CAPTURE` (spec §4.5). `encoder_last_pts_usec` is the
    /// most recent packet's `sys_pts_usec` seen so far.
    pub fn start_capture(
        &mut self,
        head_duration_ms: u64,
        path: String,
        thumbnail_folder: Option<String>,
        encoder_last_pts_usec: i64,
    ) -> Result<(), ReplayCaptureError> {
        if !self.base.is_active() {
            return Err(ReplayCaptureError::Offline);
        }
        if self.capture.is_some() {
            return Err(ReplayCaptureError::AlreadyCapturing);
        }
        let save_start_pts_usec = encoder_last_pts_usec - (head_duration_ms as i64) * 1000;
        self.capture = Some(CaptureSession {
            path,
            thumbnail_folder,
            save_start_pts_usec,
            save_ts: None,
            started_at_pts_usec: encoder_last_pts_usec,
            disconnection: false,
        });
        Ok(())
    }

    /// The prefix of buffered packets to mux for a just-started capture:
    /// skip anything older than `save_start_pts_usec`, then rewind to the
    /// most recent keyframe at or before that boundary (spec §4.5 step 3).
    pub fn capture_prefix(&self) -> Vec<EncoderPacket> {
        let Some(session) = &self.capture else {
            return Vec::new();
        };
        if session.save_start_pts_usec <= 0 {
            return self.deque.iter().cloned().collect();
        }
        let boundary = session.save_start_pts_usec;
        let mut keyframe_idx = None;
        for (idx, pkt) in self.deque.iter().enumerate() {
            if pkt.keyframe && pkt.kind == PacketKind::Video && pkt.sys_pts_usec <= boundary {
                keyframe_idx = Some(idx);
            }
            if pkt.sys_pts_usec > boundary {
                break;
            }
        }
        match keyframe_idx {
            Some(idx) => self.deque.iter().skip(idx).cloned().collect(),
            None => self.deque.iter().cloned().collect(),
        }
    }

    /// `STOP_REPLAY_CAPTURE` (spec §4.5). Returns the `save_ts` to mux up
    /// to; the capture isn't finalized until a packet at/after it arrives.
    pub fn stop_capture(&mut self, force: bool, encoder_last_pts_usec: i64) -> Result<(), ReplayCaptureError> {
        let Some(session) = self.capture.as_mut() else {
            return Err(ReplayCaptureError::StopCaptureNoCapture);
        };
        session.save_ts = Some(if force { 1 } else { encoder_last_pts_usec });
        Ok(())
    }

    /// Feeds one arriving packet's `sys_pts_usec` into the active capture's
    /// stop watch; returns the finished capture once `save_ts` is reached.
    pub fn advance_capture(&mut self, sys_pts_usec: i64) -> Option<CaptureReady> {
        let ready = {
            let session = self.capture.as_ref()?;
            let save_ts = session.save_ts?;
            sys_pts_usec >= save_ts
        };
        if !ready {
            return None;
        }
        let session = self.capture.take()?;
        let duration_ms = ((sys_pts_usec - session.started_at_pts_usec).max(0) / 1000) as u64;
        Some(CaptureReady {
            path: session.path,
            duration_ms,
            thumbnail_folder: session.thumbnail_folder,
            disconnection: session.disconnection,
        })
    }

    /// Force-finalizes the in-progress capture (spec §4.2.3 game-exit path,
    /// §4.5 60s encoded-time timeout). `disconnection` is only set `true`
    /// for the game-exit path; the §4.5 encoded-time timeout is a plain
    /// forced finalize, not a disconnection.
    pub fn force_finish_capture(&mut self, at_pts_usec: i64, disconnection: bool) -> Option<CaptureReady> {
        let session = self.capture.take()?;
        let duration_ms = ((at_pts_usec - session.started_at_pts_usec).max(0) / 1000) as u64;
        Some(CaptureReady {
            path: session.path,
            duration_ms,
            thumbnail_folder: session.thumbnail_folder,
            disconnection: disconnection || session.disconnection,
        })
    }

    /// `save_ts` of the in-progress capture, if `STOP_REPLAY_CAPTURE` has
    /// already been received (spec §4.5 Timeout).
    pub fn pending_save_ts(&self) -> Option<i64> {
        self.capture.as_ref().and_then(|s| s.save_ts)
    }

    pub fn mark_disconnection(&mut self) {
        if let Some(session) = self.capture.as_mut() {
            session.disconnection = true;
        }
    }

    pub fn stop(&mut self, engine: &dyn Engine, force: bool) {
        match self.base.state {
            OutputState::DelayActive => self.base.finish_stop(),
            OutputState::Active | OutputState::Stopping => {
                if self.capture.is_some() && !force {
                    self.stop_replay_on_replay_ready = true;
                    return;
                }
                self.base.begin_stopping();
                self.capture = None;
                engine.stop_output(OutputKind::Replay, force);
            }
            OutputState::Idle => {}
        }
    }
}

impl Default for ReplayBuffer {
    fn default() -> Self {
        Self::new()
    }
}

fn make_packet(dts_usec: i64, sys_pts_usec: i64, size: usize, keyframe: bool) -> EncoderPacket {
    EncoderPacket {
        pts_usec: dts_usec,
        dts_usec,
        sys_pts_usec,
        data: vec![0; size],
        size,
        keyframe,
        track_idx: 0,
        kind: PacketKind::Video,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn buffer_always_starts_at_a_keyframe_after_eviction() {
        let mut buf = ReplayBuffer::new();
        buf.configure(ReplayConfig {
            max_time_sec: 1000,
            max_size_mb: 1,
        });
        // Push enough keyframed packets to force an eviction on size.
        let chunk = 200_000;
        for i in 0..20 {
            buf.push_packet(make_packet(i * 1000, i * 1000, chunk, true));
        }
        assert!(buf.deque.front().unwrap().keyframe);
    }

    #[test]
    fn armed_fires_exactly_once_on_first_keyframe_eviction() {
        let mut buf = ReplayBuffer::new();
        buf.configure(ReplayConfig {
            max_time_sec: 1000,
            max_size_mb: 1,
        });
        let chunk = 200_000;
        let mut armed_count = 0;
        for i in 0..40 {
            if buf.push_packet(make_packet(i * 1000, i * 1000, chunk, true)) {
                armed_count += 1;
            }
        }
        assert_eq!(armed_count, 1);
        assert!(buf.is_armed());
    }

    #[test]
    fn never_evicts_below_three_keyframes() {
        let mut buf = ReplayBuffer::new();
        buf.configure(ReplayConfig {
            max_time_sec: 1000,
            max_size_mb: 1,
        });
        let chunk = 500_000;
        for i in 0..10 {
            buf.push_packet(make_packet(i * 1000, i * 1000, chunk, true));
        }
        assert!(buf.keyframes >= MIN_RETAINED_KEYFRAMES);
    }

    #[test]
    fn start_capture_computes_save_start_pts_from_head_duration() {
        let mut buf = ReplayBuffer::new();
        buf.base.start_active(Identifier(9));
        buf.start_capture(15_000, "C:/clip.mp4".into(), None, 100_000_000).unwrap();
        let ready = buf.stop_capture(false, 135_000_000);
        assert!(ready.is_ok());
    }

    #[test]
    fn start_capture_while_already_capturing_is_rejected() {
        let mut buf = ReplayBuffer::new();
        buf.base.start_active(Identifier(9));
        buf.start_capture(1000, "a.mp4".into(), None, 1_000_000).unwrap();
        let err = buf
            .start_capture(1000, "b.mp4".into(), None, 2_000_000)
            .unwrap_err();
        assert_eq!(err, ReplayCaptureError::AlreadyCapturing);
    }

    #[test]
    fn advance_capture_finalizes_once_save_ts_reached() {
        let mut buf = ReplayBuffer::new();
        buf.base.start_active(Identifier(9));
        buf.start_capture(0, "a.mp4".into(), None, 1_000_000).unwrap();
        buf.stop_capture(false, 2_000_000).unwrap();
        assert!(buf.advance_capture(1_500_000).is_none());
        let ready = buf.advance_capture(2_000_000).unwrap();
        assert_eq!(ready.path, "a.mp4");
    }
}
