// Copyright (c) Microsoft Corporation.
// Licensed under the MIT License.

/// A dotted-integer rule version.
///
/// Segments compare numerically, not lexicographically: `1.10 > 1.2`.
/// Trailing zero segments are normalized away on parse, so `1 == 1.0.0`
/// and ordering is plain segment-vector ordering.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord)]
pub struct RuleVersion(Vec<u64>);

impl RuleVersion {
    pub fn parse(s: &str) -> Option<Self> {
        if s.is_empty() {
            return None;
        }
        let mut segments = s
            .split('.')
            .map(|seg| seg.parse::<u64>().ok())
            .collect::<Option<Vec<u64>>>()?;
        while segments.last() == Some(&0) {
            segments.pop();
        }
        Some(Self(segments))
    }

    /// Parse, treating anything unparseable as the lowest version.
    pub fn parse_lossy(s: &str) -> Self {
        Self::parse(s).unwrap_or_default()
    }
}
