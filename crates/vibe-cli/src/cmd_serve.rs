use crate::workstation::{runtime, Workstation};
use vibe_serve::ServeConfig;

/// Execute `vibe serve`.
pub fn execute(ws: &Workstation, bind: &str, port: u16) -> anyhow::Result<()> {
    let config = ServeConfig {
        bind: bind.to_string(),
        port,
    };
    runtime()?.block_on(vibe_serve::serve(ws.store(), config))
}
