//! Disposable proxy-image probe.

use std::rc::Rc;

use tracing::trace;

use crate::ports::{ProbeListener, ProxyLoader, ProxyToken};

/// A proxy attached to the host loader for one image.
///
/// Attaching happens in [`Probe::attach`]; dropping the probe detaches the
/// listener and releases the proxy, whichever way the image resolved.
pub(crate) struct Probe {
    loader: Rc<dyn ProxyLoader>,
    token: ProxyToken,
}

impl Probe {
    pub(crate) fn attach(loader: Rc<dyn ProxyLoader>, src: &str, listener: ProbeListener) -> Self {
        let token = loader.attach(src, listener);
        trace!(proxy = token.get(), src, "probe attached");
        Self { loader, token }
    }
}

impl Drop for Probe {
    fn drop(&mut self) {
        trace!(proxy = self.token.get(), "probe released");
        self.loader.detach(self.token);
    }
}
