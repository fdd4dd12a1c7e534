//! Hostname filter engine.
//!
//! Decides, per target host, whether to go through the upstream SOCKS5 proxy
//! or connect directly. Filters are regular expressions loaded once at
//! startup; the set is immutable for the process lifetime.

use std::fs;
use std::path::Path;

use regex::Regex;

use crate::error::{Result, S2hError};

/// Routing decision for a single target host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    /// Connect to the target directly.
    Direct,
    /// Tunnel the connection through the upstream SOCKS5 proxy.
    Proxy,
}

/// An ordered set of compiled hostname patterns.
///
/// The empty set is a distinct state meaning "proxy everything": when no
/// filter file is supplied, every request goes through the upstream proxy.
#[derive(Debug, Default)]
pub struct FilterSet {
    patterns: Vec<Regex>,
}

impl FilterSet {
    /// Create an empty set (proxy everything).
    pub fn empty() -> Self {
        Self::default()
    }

    /// Compile filters from text, one pattern per non-empty line.
    ///
    /// An invalid pattern is a load-time error carrying its 1-based line
    /// number; it can never surface at match time.
    pub fn from_lines(text: &str) -> Result<Self> {
        let mut patterns = Vec::new();

        for (line_num, line) in text.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            let regex = Regex::new(line).map_err(|e| S2hError::InvalidPattern {
                line: line_num + 1,
                source: e,
            })?;
            patterns.push(regex);
        }

        Ok(Self { patterns })
    }

    /// Load filters from a newline-delimited pattern file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|e| S2hError::FilterFile {
            path: path.display().to_string(),
            source: e,
        })?;
        Self::from_lines(&text)
    }

    /// Evaluate a bare hostname against the set.
    ///
    /// `host` must already have any port fragment stripped. Matching is an OR
    /// over the patterns; no case folding beyond each pattern's own semantics.
    pub fn decide(&self, host: &str) -> Verdict {
        if self.patterns.is_empty() {
            return Verdict::Proxy;
        }

        if self.patterns.iter().any(|regex| regex.is_match(host)) {
            Verdict::Proxy
        } else {
            Verdict::Direct
        }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    pub fn len(&self) -> usize {
        self.patterns.len()
    }
}
