//! Browser Launching

use std::io;
use std::sync::Mutex;

/// Opens URLs in the user's browser.
pub trait BrowserLauncher: Send + Sync {
    /// Open `url`. Callers treat failure as non-fatal.
    fn open_url(&self, url: &str) -> io::Result<()>;
}

/// Opens URLs with the platform's default handler.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBrowserLauncher;

impl BrowserLauncher for SystemBrowserLauncher {
    fn open_url(&self, url: &str) -> io::Result<()> {
        open::that(url)
    }
}

type OpenHook = Box<dyn Fn(&str) + Send + Sync>;

/// Mock browser launcher for testing.
#[derive(Default)]
pub struct MockBrowserLauncher {
    opened: Mutex<Vec<String>>,
    fail: bool,
    on_open: Option<OpenHook>,
}

impl MockBrowserLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    /// A launcher whose every open fails.
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Run `hook` with each opened URL, e.g. to simulate the user completing
    /// the authorization in the browser.
    pub fn with_hook(hook: impl Fn(&str) + Send + Sync + 'static) -> Self {
        Self {
            on_open: Some(Box::new(hook)),
            ..Self::default()
        }
    }

    /// Get opened URLs.
    pub fn get_opened(&self) -> Vec<String> {
        self.opened.lock().unwrap().clone()
    }
}

impl BrowserLauncher for MockBrowserLauncher {
    fn open_url(&self, url: &str) -> io::Result<()> {
        self.opened.lock().unwrap().push(url.to_string());
        if let Some(hook) = &self.on_open {
            hook(url);
        }
        if self.fail {
            return Err(io::Error::new(io::ErrorKind::NotFound, "no browser available"));
        }
        Ok(())
    }
}
