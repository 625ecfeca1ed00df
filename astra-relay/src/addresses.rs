use libp2p::Multiaddr;

use crate::error::HostError;

/// Parse listen addresses. Any invalid entry is an error: a node that cannot
/// listen where it was told to should not start.
pub fn parse_listen_addrs(addrs: &[String]) -> Result<Vec<Multiaddr>, HostError> {
    addrs
        .iter()
        .map(|s| {
            s.parse::<Multiaddr>()
                .map_err(|e| HostError::InvalidListenAddr {
                    addr: s.clone(),
                    reason: e.to_string(),
                })
        })
        .collect()
}

/// Parse announce addresses.
/// Invalid multiaddr strings are logged and skipped.
pub fn parse_announce_addrs(addrs: &[String]) -> Vec<Multiaddr> {
    addrs
        .iter()
        .filter_map(|s| {
            s.parse::<Multiaddr>()
                .map_err(|e| {
                    tracing::warn!("Invalid announce multiaddr '{}': {}", s, e);
                    e
                })
                .ok()
        })
        .collect()
}

/// Concatenate address lists, dropping repeats but keeping first-seen order.
pub fn merge_addrs<'a>(lists: impl IntoIterator<Item = &'a Multiaddr>) -> Vec<Multiaddr> {
    let mut merged: Vec<Multiaddr> = Vec::new();
    for addr in lists {
        if !merged.contains(addr) {
            merged.push(addr.clone());
        }
    }
    merged
}

/// Render addresses the way status lines print them: `[a, b]`.
pub fn format_addrs(addrs: &[Multiaddr]) -> String {
    let joined = addrs
        .iter()
        .map(|a| a.to_string())
        .collect::<Vec<_>>()
        .join(", ");
    format!("[{}]", joined)
}
