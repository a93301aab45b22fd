use pw_core::{ContentMessage, Tab, TabId, TabMessenger, TransportError};

/// Tabs given on the command line. Messages are printed instead of delivered.
pub struct PrintedTabs {
    tabs: Vec<Tab>,
    sent: Vec<(TabId, ContentMessage)>,
    echo: bool,
}

impl PrintedTabs {
    /// Tab ids start at 1 in argument order; the first tab is active.
    pub fn new(urls: &[String], echo: bool) -> Self {
        let tabs = urls
            .iter()
            .enumerate()
            .map(|(i, url)| Tab {
                id: i as TabId + 1,
                url: Some(url.clone()),
            })
            .collect();
        Self {
            tabs,
            sent: Vec::new(),
            echo,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.tabs.is_empty()
    }

    pub fn sent(&self) -> &[(TabId, ContentMessage)] {
        &self.sent
    }

    fn url_of(&self, tab_id: TabId) -> &str {
        self.tabs
            .iter()
            .find(|t| t.id == tab_id)
            .and_then(|t| t.url.as_deref())
            .unwrap_or("?")
    }
}

impl TabMessenger for PrintedTabs {
    fn active_tab(&mut self) -> Result<Tab, TransportError> {
        self.tabs.first().cloned().ok_or(TransportError::NoActiveTab)
    }

    fn tabs(&mut self) -> Result<Vec<Tab>, TransportError> {
        Ok(self.tabs.clone())
    }

    fn send(&mut self, tab_id: TabId, message: &ContentMessage) -> Result<(), TransportError> {
        if self.echo {
            let json = serde_json::to_string(message).map_err(|e| TransportError::Other(e.to_string()))?;
            println!("  [{}] {} <- {}", tab_id, self.url_of(tab_id), json);
        }
        self.sent.push((tab_id, message.clone()));
        Ok(())
    }
}
