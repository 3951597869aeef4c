//! Link status shared between the Wi-Fi supervisor and the display loop.

use core::sync::atomic::{AtomicBool, Ordering};

/// Lock-free link and address flags.
///
/// The supervisor reports what the stack sees; the display loop only asks
/// [`Connectivity::is_online`] and clears the flags when it is about to
/// replace the credentials.
#[derive(Debug)]
pub struct Connectivity {
    link_up: AtomicBool,
    has_ipv4: AtomicBool,
}

impl Connectivity {
    pub const fn new() -> Self {
        Self {
            link_up: AtomicBool::new(false),
            has_ipv4: AtomicBool::new(false),
        }
    }

    /// Usable for HTTP: link up with an IPv4 configuration.
    pub fn is_online(&self) -> bool {
        self.link_up.load(Ordering::Acquire) && self.has_ipv4.load(Ordering::Acquire)
    }

    pub fn update_link_ip(&self, link_up: bool, has_ipv4: bool) {
        self.link_up.store(link_up, Ordering::Release);
        self.has_ipv4.store(has_ipv4 && link_up, Ordering::Release);
    }

    pub fn mark_disconnected(&self) {
        self.update_link_ip(false, false);
    }
}

impl Default for Connectivity {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn online_needs_link_and_address() {
        let net = Connectivity::new();
        assert!(!net.is_online());

        net.update_link_ip(true, false);
        assert!(!net.is_online());
        net.update_link_ip(true, true);
        assert!(net.is_online());

        // A stale address without a link does not count.
        net.update_link_ip(false, true);
        assert!(!net.is_online());
    }

    #[test]
    fn disconnect_holds_until_the_link_is_reported_again() {
        let net = Connectivity::new();
        net.update_link_ip(true, true);

        net.mark_disconnected();
        assert!(!net.is_online());
        net.mark_disconnected();
        assert!(!net.is_online());

        net.update_link_ip(true, true);
        assert!(net.is_online());
    }
}
