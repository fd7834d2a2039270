//! System browser launcher

use oauth2::url::Url;

/// Opens authorization URLs for the user
#[derive(Debug, Clone, Copy)]
pub struct BrowserLauncher {
    enabled: bool,
}

impl BrowserLauncher {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Open `url` in the system browser
    ///
    /// Never fails the login: when launching is disabled or the launch fails,
    /// the URL is logged so the user can open it manually.
    pub fn launch(&self, url: &Url) {
        if !self.enabled {
            tracing::warn!(url = %url, "Open this URL in a browser to continue signing in");
            return;
        }

        match open::that_detached(url.as_str()) {
            Ok(()) => tracing::debug!(url = %url, "System browser launched"),
            Err(e) => tracing::warn!(
                url = %url,
                "Failed to launch the system browser ({}); open this URL manually",
                e
            ),
        }
    }
}
