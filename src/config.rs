//! `Config`: the pre-parsed startup configuration the core receives (spec §1,
//! §6 CLI surface). Flag parsing itself is `main.rs`'s job via `clap`; this
//! struct is the plain value `Orchestrator::new` and the transport selector
//! actually depend on.

use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "capture-core", about = "Capture/encode output-orchestration subprocess")]
pub struct Config {
    /// Named-pipe channel name. Absent selects the stdio transport (spec §6).
    #[arg(long)]
    pub channel: Option<String>,

    /// Affects which `scene.auxSources` entries with `secondaryFile: true`
    /// are loaded (spec §6).
    #[arg(long, default_value_t = false)]
    pub secondary: bool,

    /// Opens a modal message box at startup so a debugger can attach before
    /// the first command is processed. OS-specific glue; the core only
    /// needs to know the flag was set to delay its own readiness log line.
    #[arg(long = "debugger-attach", default_value_t = false)]
    pub debugger_attach: bool,
}

impl Config {
    pub fn uses_named_pipe(&self) -> bool {
        self.channel.is_some()
    }
}
