use super::traits::BlocklistMatcher;
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use regex::Regex;
use rustc_hash::FxHashMap;
use std::collections::BTreeMap;
use tracing::warn;

/// Component encoding applied to the non-TLD part of every pattern and
/// candidate hostname, so both sides of the regex test agree on escaping.
/// Matches the JS `encodeURIComponent` unreserved set.
const COMPONENT: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')');

/// Splits a hostname at the last meaningful dot: the last `.` that is
/// followed by a word character. The suffix (dot included) is the index
/// key; the rest is the matchable prefix. Single-label hosts degrade to
/// `("", host)`.
pub fn split_host(host: &str) -> (&str, &str) {
    let bytes = host.as_bytes();
    let mut split_at = None;
    for i in (0..bytes.len()).rev() {
        if bytes[i] == b'.' {
            if let Some(&next) = bytes.get(i + 1) {
                if next.is_ascii_alphanumeric() || next == b'_' {
                    split_at = Some(i);
                    break;
                }
            }
        }
    }
    match split_at {
        Some(i) => (&host[..i], &host[i..]),
        None => ("", host),
    }
}

/// Expands one component-encoded domain prefix into a regex fragment:
/// `*.` segments become a required-subdomain wildcard, everything else is
/// escaped literally. A wildcard entry does not match the apex domain.
fn pattern_fragment(encoded: &str) -> String {
    let mut out = String::with_capacity(encoded.len() + 8);
    let mut chars = encoded.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '*' && chars.peek() == Some(&'.') {
            chars.next();
            out.push_str(".+\\.");
        } else {
            out.push_str(&regex::escape(&c.to_string()));
        }
    }
    out
}

/// Immutable blocklist index: for each TLD suffix, per-source compiled
/// alternations over the encoded prefix. Built once per refresh; lookups
/// never mutate it.
pub struct TldIndex {
    groups: FxHashMap<Box<str>, Vec<(u8, Regex)>>,
    allowlist: FxHashMap<Box<str>, ()>,
}

impl TldIndex {
    /// Builds the index from `(domain_pattern, source_id)` entries. Entries
    /// whose joined pattern fails to compile are dropped with a warning
    /// rather than failing the build.
    pub fn build(entries: Vec<(Box<str>, u8)>, allowlist_vec: Vec<String>) -> Self {
        // tld -> source -> encoded fragments. BTreeMap keeps source order
        // stable so the first-matching source id is deterministic.
        let mut grouped: FxHashMap<Box<str>, BTreeMap<u8, Vec<String>>> = FxHashMap::default();

        for (domain, source) in entries {
            let domain = domain.to_lowercase();
            let (prefix, tld) = split_host(&domain);
            let encoded = utf8_percent_encode(prefix, COMPONENT).to_string();
            grouped
                .entry(tld.into())
                .or_default()
                .entry(source)
                .or_default()
                .push(pattern_fragment(&encoded));
        }

        let mut groups: FxHashMap<Box<str>, Vec<(u8, Regex)>> = FxHashMap::default();
        for (tld, by_source) in grouped {
            let mut compiled = Vec::with_capacity(by_source.len());
            for (source, fragments) in by_source {
                let pattern = format!("^(?:{})$", fragments.join("|"));
                match Regex::new(&pattern) {
                    Ok(re) => compiled.push((source, re)),
                    Err(e) => warn!("Dropping uncompilable blocklist group for {}: {}", tld, e),
                }
            }
            if !compiled.is_empty() {
                groups.insert(tld, compiled);
            }
        }

        let mut allowlist = FxHashMap::default();
        for d in allowlist_vec {
            allowlist.insert(d.to_lowercase().into_boxed_str(), ());
        }

        Self { groups, allowlist }
    }

    /// The empty index: every lookup is "not blocked". Used until the first
    /// async build completes so the hot path never waits on a fetch.
    pub fn empty() -> Self {
        Self::build(vec![], vec![])
    }

    pub fn len(&self) -> usize {
        self.groups.values().map(|v| v.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

impl BlocklistMatcher for TldIndex {
    fn check(&self, hostname: &str) -> Option<u8> {
        let hostname = hostname.to_lowercase();

        // 1. Allowlist (exact match)
        if self.allowlist.contains_key(hostname.as_str()) {
            return None;
        }

        // 2. TLD lookup + prefix test
        let (prefix, tld) = split_host(&hostname);
        let compiled = self.groups.get(tld)?;
        let encoded = utf8_percent_encode(prefix, COMPONENT).to_string();
        for (source, re) in compiled {
            if re.is_match(&encoded) {
                return Some(*source);
            }
        }
        None
    }
}
