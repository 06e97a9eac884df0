use log::warn;
use std::collections::HashMap;
use std::io;

/// Contract the analytics panels expose to the tracking core: one
/// refresh after a run completes, nothing else.
#[async_trait::async_trait]
pub trait Panel: Send + Sync {
    fn panel_id(&self) -> &str;

    async fn refresh(&self) -> io::Result<()>;
}

/// Registry of panels to refresh once a run completes
pub struct PanelRegistry {
    panels: HashMap<String, Box<dyn Panel>>,
}

impl PanelRegistry {
    pub fn new() -> Self {
        Self {
            panels: HashMap::new(),
        }
    }

    pub fn register_panel(&mut self, panel: Box<dyn Panel>) {
        let id = panel.panel_id().to_string();
        self.panels.insert(id, panel);
    }

    pub fn len(&self) -> usize {
        self.panels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.panels.is_empty()
    }

    /// Refresh every registered panel once, concurrently. Returns the
    /// number of panels that refreshed successfully; failures are
    /// logged and do not block the others.
    pub async fn refresh_all(&self) -> usize {
        let refreshes = self.panels.values().map(|panel| async move {
            match panel.refresh().await {
                Ok(()) => true,
                Err(e) => {
                    warn!("Panel '{}' refresh failed: {e}", panel.panel_id());
                    false
                }
            }
        });

        futures::future::join_all(refreshes)
            .await
            .into_iter()
            .filter(|refreshed| *refreshed)
            .count()
    }
}

impl Default for PanelRegistry {
    fn default() -> Self {
        Self::new()
    }
}
