//! Process-wide host-flavor configuration, set once during `initialize`.

use once_cell::sync::OnceCell;

/// The IDE host a session talks to.
///
/// The embedded-studio host frames message headers with bare `\n` instead of
/// `\r\n` and announces itself through the `lumenRootUri` initialization
/// option.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HostFlavor {
    /// A stock LSP client.
    #[default]
    Standard,
    /// The embedded studio IDE.
    Studio,
}

impl HostFlavor {
    /// Terminator written after the header block of every framed message.
    pub const fn header_terminator(self) -> &'static str {
        match self {
            HostFlavor::Standard => "\r\n\r\n",
            HostFlavor::Studio => "\n",
        }
    }
}

static HOST_FLAVOR: OnceCell<HostFlavor> = OnceCell::new();

/// Records the host flavor; only the first call wins.
///
/// Returns false when the flavor had already been initialized (a repeated
/// `initialize` does not re-frame the stream).
pub fn init_host_flavor(flavor: HostFlavor) -> bool {
    HOST_FLAVOR.set(flavor).is_ok()
}

/// The session's host flavor; [`HostFlavor::Standard`] before `initialize`.
pub fn host_flavor() -> HostFlavor {
    HOST_FLAVOR.get().copied().unwrap_or_default()
}
