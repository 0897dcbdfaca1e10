//! Page event definitions
//!
//! The agent emits notifications from a closed set of page-level events;
//! subscriptions accept any name but only these ever fire.

use std::fmt;

/// Page-level events emitted by the agent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PageEvent {
    /// A page load began
    LoadStarted,
    /// A page load completed; payload is the load status
    LoadFinished,
    /// The page URL changed; payload is the new URL
    UrlChanged,
    /// The page requested a resource; payload describes the request
    ResourceRequested,
    /// A requested resource arrived; payload describes the response
    ResourceReceived,
    /// The page raised an alert; payload is the message
    Alert,
    /// A script on the page threw; payload is the message
    ScriptError,
    /// The page is about to navigate; payload describes the navigation
    NavigationRequested,
}

impl PageEvent {
    /// Every event the agent can emit
    pub const ALL: [PageEvent; 8] = [
        PageEvent::LoadStarted,
        PageEvent::LoadFinished,
        PageEvent::UrlChanged,
        PageEvent::ResourceRequested,
        PageEvent::ResourceReceived,
        PageEvent::Alert,
        PageEvent::ScriptError,
        PageEvent::NavigationRequested,
    ];

    /// Wire name of the event
    pub fn name(&self) -> &'static str {
        match self {
            PageEvent::LoadStarted => "load-started",
            PageEvent::LoadFinished => "load-finished",
            PageEvent::UrlChanged => "url-changed",
            PageEvent::ResourceRequested => "resource-requested",
            PageEvent::ResourceReceived => "resource-received",
            PageEvent::Alert => "alert",
            PageEvent::ScriptError => "script-error",
            PageEvent::NavigationRequested => "navigation-requested",
        }
    }

    /// Parse a wire name; unknown names are not events
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|event| event.name() == name)
    }
}

impl AsRef<str> for PageEvent {
    fn as_ref(&self) -> &str {
        self.name()
    }
}

impl fmt::Display for PageEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_round_trip() {
        for event in PageEvent::ALL {
            assert_eq!(PageEvent::from_name(event.name()), Some(event));
        }
    }

    #[test]
    fn test_unknown_name() {
        assert_eq!(PageEvent::from_name("page-exploded"), None);
    }
}
