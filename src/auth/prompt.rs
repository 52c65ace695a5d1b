//! Presenting the consent URL to the operator

use url::Url;

/// Shows the authorization URL to whoever can grant consent
pub trait ConsentPrompt: Send + Sync {
    fn present(&self, url: &Url);
}

/// Prints the URL and tries to open it in the system browser
#[derive(Debug, Default, Clone, Copy)]
pub struct BrowserPrompt;

impl ConsentPrompt for BrowserPrompt {
    fn present(&self, url: &Url) {
        println!();
        println!("Open the following URL in a browser to authorize access:");
        println!();
        println!("  {}", url);
        println!();

        if let Err(e) = open::that_detached(url.as_str()) {
            tracing::warn!("Could not open a browser automatically: {}", e);
        }
    }
}
