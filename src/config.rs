use tracing::{debug, info};

use crate::contract::Target;
use crate::map::MapOptions;

/// Fully merged probe configuration (file + environment).
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub options: MapOptions,
    pub targets: Vec<Target>,
}

impl ProbeConfig {
    pub fn trace_loaded(&self) {
        info!(
            targets_count = self.targets.len(),
            concurrency = ?self.options.concurrency,
            "[CONFIG] Loaded ProbeConfig"
        );
        debug!(?self, "[CONFIG] ProbeConfig loaded (full debug)");
    }
}
