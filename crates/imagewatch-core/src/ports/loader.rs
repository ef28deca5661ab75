//! Proxy loader port for asynchronous load probes.

/// Signal fired by a proxy image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProbeSignal {
    /// The resource loaded.
    Load,
    /// The resource failed to load.
    Error,
}

impl ProbeSignal {
    /// Maps the signal onto an image outcome.
    #[must_use]
    pub const fn outcome(self) -> crate::domain::ImageOutcome {
        crate::domain::ImageOutcome::from_broken(matches!(self, Self::Error))
    }
}

/// Handler bound to a proxy's load and error signals.
pub type ProbeListener = Box<dyn FnMut(ProbeSignal)>;

/// Host-issued identity of an attached proxy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProxyToken(u64);

impl ProxyToken {
    /// Wraps a raw host identifier.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw host identifier.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Port for creating throwaway proxy images.
pub trait ProxyLoader {
    /// Creates a detached proxy, binds `listener` to its load and error
    /// signals, then assigns it `src`.
    ///
    /// Signals should be delivered from the host event loop. `detach` may be
    /// called from inside the listener.
    fn attach(&self, src: &str, listener: ProbeListener) -> ProxyToken;

    /// Unbinds the listener and releases the proxy. Unknown tokens are ignored.
    fn detach(&self, token: ProxyToken);
}
