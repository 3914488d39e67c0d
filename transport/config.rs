// Transport configuration read from environment variables
//
// FREEBIRD_ACCEPT_BARE_PAYLOADS: wrap bare text/binary values instead of rejecting them (default: off)
// FREEBIRD_READ_BUFFER_SIZE: chunk size in bytes for stream readers (default: 65536)
// FREEBIRD_INBOX_CAPACITY: chunks a reader may queue before it blocks (default: 1024)
use std::env;

const DEFAULT_READ_BUFFER_SIZE: usize = 65536;
const DEFAULT_INBOX_CAPACITY: usize = 1024;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportConfig {
    /// Accept bare text/binary values as if wrapped in an envelope without id.
    pub accept_bare_payloads: bool,
    pub read_buffer_size: usize,
    /// Unread chunks held per connection. A full inbox stops its reader,
    /// which pushes back on the peer.
    pub inbox_capacity: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        TransportConfig {
            accept_bare_payloads: false,
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            inbox_capacity: DEFAULT_INBOX_CAPACITY,
        }
    }
}

impl TransportConfig {
    pub fn from_env() -> Self {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Build from any key lookup; unparsable values fall back to defaults.
    pub fn from_vars<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = TransportConfig::default();

        let accept_bare_payloads = lookup("FREEBIRD_ACCEPT_BARE_PAYLOADS")
            .and_then(|s| parse_flag(&s))
            .unwrap_or(defaults.accept_bare_payloads);

        let read_buffer_size = lookup("FREEBIRD_READ_BUFFER_SIZE")
            .and_then(|s| s.trim().parse().ok())
            .filter(|&n: &usize| n > 0)
            .unwrap_or(defaults.read_buffer_size);

        let inbox_capacity = lookup("FREEBIRD_INBOX_CAPACITY")
            .and_then(|s| s.trim().parse().ok())
            .filter(|&n: &usize| n > 0)
            .unwrap_or(defaults.inbox_capacity);

        TransportConfig {
            accept_bare_payloads,
            read_buffer_size,
            inbox_capacity,
        }
    }

    pub fn lenient() -> Self {
        TransportConfig {
            accept_bare_payloads: true,
            ..TransportConfig::default()
        }
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}
