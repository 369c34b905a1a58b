//! `Streamer`: push to a remote streaming service with reconnect
//! (spec §4.6).

use crate::engine::{Engine, OutputKind, StreamingParams};
use crate::outputs::base::{OutputBase, OutputState};
use crate::protocol::Identifier;

/// Reconnect policy applied on every `Start` (spec §4.6).
#[derive(Debug, Clone, Copy)]
pub struct ReconnectPolicy {
    pub max_retries: u32,
    pub retry_delay_sec: u32,
    pub delay_sec: u32,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            max_retries: 20,
            retry_delay_sec: 10,
            delay_sec: 0,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StreamerConfig {
    pub service_type: String,
    pub server_url: String,
    pub stream_key: String,
    pub use_auth: bool,
    pub username: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug)]
pub struct Streamer {
    pub base: OutputBase,
    pub config: StreamerConfig,
    pub reconnect: ReconnectPolicy,
}

impl Streamer {
    pub fn new() -> Self {
        Self {
            base: OutputBase::new(),
            config: StreamerConfig::default(),
            reconnect: ReconnectPolicy::default(),
        }
    }

    pub fn configure(&mut self, config: StreamerConfig) {
        self.config = config;
        self.reconnect = ReconnectPolicy::default();
    }

    pub fn start(&mut self, engine: &dyn Engine, identifier: Identifier) -> Result<(), crate::error::EngineError> {
        let params = StreamingParams {
            service_type: self.config.service_type.clone(),
            server_url: self.config.server_url.clone(),
            stream_key: self.config.stream_key.clone(),
            use_auth: self.config.use_auth,
            username: self.config.username.clone(),
            password: self.config.password.clone(),
        };
        engine.start_streaming(&params)?;
        self.base.start_active(identifier);
        Ok(())
    }

    pub fn stop(&mut self, engine: &dyn Engine, force: bool) {
        match self.base.state {
            OutputState::DelayActive => self.base.finish_stop(),
            OutputState::Active | OutputState::Stopping => {
                self.base.begin_stopping();
                engine.stop_output(OutputKind::Streaming, force);
            }
            OutputState::Idle => {}
        }
    }
}

impl Default for Streamer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::NullEngine;
    use tokio::sync::mpsc::unbounded_channel;

    #[test]
    fn start_uses_rtmp_service_type_from_config() {
        let (tx, _rx) = unbounded_channel();
        let engine = NullEngine::new(tx);
        let mut streamer = Streamer::new();
        streamer.configure(StreamerConfig {
            service_type: "rtmp_common".into(),
            server_url: "rtmp://example".into(),
            stream_key: "key".into(),
            ..Default::default()
        });
        streamer.start(engine.as_ref(), Identifier(1)).unwrap();
        assert!(streamer.base.is_active());
        assert_eq!(streamer.reconnect.max_retries, 20);
    }
}
