use serde::Serialize;

use crate::config::SourceMappingConfig;

/// One candidate source for a set of decoded headers.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceMatch {
    pub source_id: String,
    pub confidence: f32,
}

/// Rank all known mapping configurations by how well their expected columns
/// match a file's headers. Pure function over `(headers, configs)`, so
/// callers can trial new source types without re-running a decode.
///
/// Confidence is the mean best-similarity of each expected column against
/// the headers, with required columns weighted double.
pub fn detect_source(headers: &[String], configs: &[SourceMappingConfig]) -> Vec<SourceMatch> {
    let normalized_headers: Vec<String> = headers.iter().map(|h| normalize(h)).collect();

    let mut matches: Vec<SourceMatch> = configs
        .iter()
        .map(|config| SourceMatch {
            source_id: config.source_id.clone(),
            confidence: score_config(&normalized_headers, config),
        })
        .collect();

    matches.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.source_id.cmp(&b.source_id))
    });
    matches
}

fn score_config(normalized_headers: &[String], config: &SourceMappingConfig) -> f32 {
    if config.expected_columns.is_empty() || normalized_headers.is_empty() {
        return 0.0;
    }

    let mut score = 0.0f32;
    let mut weight = 0.0f32;
    for expected in &config.expected_columns {
        let w = if config.required_columns.contains(expected) {
            2.0
        } else {
            1.0
        };
        let normalized = normalize(expected);
        let best = normalized_headers
            .iter()
            .map(|h| similarity(&normalized, h))
            .fold(0.0f32, f32::max);
        score += best * w;
        weight += w;
    }
    score / weight
}

fn similarity(a: &str, b: &str) -> f32 {
    if a == b {
        return 1.0;
    }
    let max_len = a.len().max(b.len());
    if max_len == 0 {
        return 1.0;
    }
    1.0 - (levenshtein_distance(a, b) as f32 / max_len as f32)
}

fn normalize(s: &str) -> String {
    s.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Levenshtein edit distance using the two-row O(min(m,n)) space algorithm.
fn levenshtein_distance(s1: &str, s2: &str) -> usize {
    let a = s1.as_bytes();
    let b = s2.as_bytes();
    let (m, n) = (a.len(), b.len());

    if m == 0 {
        return n;
    }
    if n == 0 {
        return m;
    }

    // Keep the shorter string in the inner loop to minimise allocation.
    let (a, b, m, n) = if m <= n { (a, b, m, n) } else { (b, a, n, m) };

    let mut prev: Vec<usize> = (0..=n).collect();
    let mut curr = vec![0usize; n + 1];

    for i in 1..=m {
        curr[0] = i;
        for j in 1..=n {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            curr[j] = (prev[j] + 1).min(curr[j - 1] + 1).min(prev[j - 1] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[n]
}
