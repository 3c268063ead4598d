//! Link extraction and suspicious-link classification.

use crate::scanner::heuristics::{IPV4_RE, LINK_RE, SUSPICIOUS_TLDS, TLD_RE, URL_SHORTENERS};

/// Extract deduplicated domain-like tokens from message text, in order of
/// first appearance.
pub fn extract_links(content: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut links = Vec::new();
    for m in LINK_RE.find_iter(content) {
        let link = m.as_str().to_string();
        if seen.insert(link.clone()) {
            links.push(link);
        }
    }
    links
}

/// A link is suspicious if it contains a shortener host, ends in a
/// suspicious TLD, or is a bare IPv4 address.
pub fn is_suspicious_link(link: &str) -> bool {
    let lower = link.to_lowercase();
    URL_SHORTENERS.iter().any(|s| lower.contains(s))
        || has_suspicious_tld(link)
        || is_ip_address(link)
}

/// Check the link's last dot-segment against the suspicious-TLD table.
///
/// Links carrying a path never match: the TLD pattern is anchored to the
/// end of the string.
pub fn has_suspicious_tld(url: &str) -> bool {
    let Some(caps) = TLD_RE.captures(url) else {
        return false;
    };
    let Some(tld) = caps.get(1) else {
        return false;
    };
    let tld = tld.as_str().to_lowercase();
    SUSPICIOUS_TLDS.contains(&tld.as_str())
}

/// Whole-string IPv4 (with optional port) check.
pub fn is_ip_address(url: &str) -> bool {
    IPV4_RE.is_match(url.trim())
}
