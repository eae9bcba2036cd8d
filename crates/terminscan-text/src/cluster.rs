// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Multi-pass word reconciliation.
//
// Each recognition pass yields positioned words. Observations of the same word
// from different passes are grouped into clusters; each cluster keeps every
// spelling it saw with counts, its confidences and positions, and the passes
// that contributed. Finishing picks a canonical spelling per cluster, corrects
// it against the dictionaries, drops weak clusters and lays the survivors out
// in reading order.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;

use serde::Serialize;
use terminscan_core::config::ClusterConfig;
use terminscan_core::{BoundingBox, OcrWord};
use tracing::{debug, instrument};

use crate::dictionary::{DictionaryMatcher, similarity};
use crate::patterns::is_time_token;

const ARTIFACT_CHARS: &[char] = &['[', ']', '\\', '/', '_', '|'];

/// One word as reconciled across recognition passes.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WordCluster {
    pub canonical_text: String,
    pub occurrences: usize,
    pub confidences: Vec<f32>,
    pub positions: Vec<BoundingBox>,
    /// Observed spellings with how often each was seen.
    pub text_variants: BTreeMap<String, usize>,
    /// Zero-based indices of the passes that contributed.
    pub passes: BTreeSet<usize>,
    /// Final confidence after any dictionary boost; set when finishing.
    pub confidence: f32,
    /// Set when the canonical spelling came from a dictionary.
    pub corrected: bool,
}

impl WordCluster {
    fn new(text: String, confidence: f32, position: BoundingBox, pass: usize) -> Self {
        Self {
            canonical_text: text.clone(),
            occurrences: 1,
            confidences: vec![confidence],
            positions: vec![position],
            text_variants: BTreeMap::from([(text, 1)]),
            passes: BTreeSet::from([pass]),
            confidence,
            corrected: false,
        }
    }

    fn observe(&mut self, text: String, confidence: f32, position: BoundingBox, pass: usize) {
        self.occurrences += 1;
        self.confidences.push(confidence);
        self.positions.push(position);
        *self.text_variants.entry(text).or_insert(0) += 1;
        self.passes.insert(pass);
    }

    pub fn mean_confidence(&self) -> f32 {
        if self.confidences.is_empty() {
            return 0.0;
        }
        self.confidences.iter().sum::<f32>() / self.confidences.len() as f32
    }

    pub fn mean_position(&self) -> BoundingBox {
        let n = self.positions.len().max(1) as f32;
        BoundingBox {
            x: self.positions.iter().map(|p| p.x).sum::<f32>() / n,
            y: self.positions.iter().map(|p| p.y).sum::<f32>() / n,
        }
    }

    /// Most frequent spelling; the first one seen wins a tie.
    fn most_frequent_variant(&self) -> String {
        let first_count = self.text_variants.get(&self.canonical_text).copied().unwrap_or(0);
        self.text_variants
            .iter()
            .filter(|(_, count)| **count > first_count)
            .max_by_key(|(_, count)| **count)
            .map(|(text, _)| text.clone())
            .unwrap_or_else(|| self.canonical_text.clone())
    }
}

/// Reconciled words of a capture and the text composed from them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MergedText {
    /// Reading-order lines joined by `\n`.
    pub text: String,
    /// Surviving clusters in reading order.
    pub clusters: Vec<WordCluster>,
}

/// Accumulates recognition passes. Single-owner, one pass at a time.
#[derive(Debug)]
pub struct WordClusterer {
    config: ClusterConfig,
    matcher: Arc<DictionaryMatcher>,
    clusters: Vec<WordCluster>,
    passes: usize,
}

fn clean_word(text: &str) -> String {
    text.chars()
        .filter(|c| !ARTIFACT_CHARS.contains(c))
        .collect::<String>()
        .trim()
        .to_string()
}

impl WordClusterer {
    pub fn new(config: ClusterConfig, matcher: Arc<DictionaryMatcher>) -> Self {
        Self {
            config,
            matcher,
            clusters: Vec::new(),
            passes: 0,
        }
    }

    pub fn pass_count(&self) -> usize {
        self.passes
    }

    pub fn clusters(&self) -> &[WordCluster] {
        &self.clusters
    }

    fn similar(&self, a: &str, b: &str) -> bool {
        if is_time_token(a) || is_time_token(b) {
            return a == b;
        }
        let short = a.chars().count() <= self.config.short_word_len
            || b.chars().count() <= self.config.short_word_len;
        let required = if short {
            self.config.short_word_similarity
        } else {
            self.config.merge_similarity
        };
        similarity(a, b) > required
    }

    /// Index of the nearest cluster this observation may join.
    fn candidate(&self, text: &str, position: &BoundingBox, pass: usize) -> Option<usize> {
        self.clusters
            .iter()
            .enumerate()
            .filter(|(_, cluster)| !cluster.passes.contains(&pass))
            .filter_map(|(index, cluster)| {
                let centre = cluster.mean_position();
                let dy = (centre.y - position.y).abs();
                if dy >= self.config.vertical_tolerance || !self.similar(text, &cluster.canonical_text) {
                    return None;
                }
                Some((index, (centre.x - position.x).abs() + dy))
            })
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(index, _)| index)
    }

    /// Fold one recognition pass into the clusters. Returns the number of
    /// words that were accepted.
    #[instrument(skip_all, fields(pass = self.passes, words = words.len()))]
    pub fn add_pass(&mut self, words: &[OcrWord]) -> usize {
        let pass = self.passes;
        self.passes += 1;

        let mut accepted = 0;
        for word in words {
            if word.confidence <= self.config.min_word_confidence {
                continue;
            }
            let text = clean_word(&word.text);
            let mut chars = text.chars();
            match (chars.next(), chars.next()) {
                (None, _) => continue,
                (Some(c), None) if !c.is_ascii_digit() => continue,
                _ => {}
            }

            match self.candidate(&text, &word.bounding_box, pass) {
                Some(index) => self.clusters[index].observe(text, word.confidence, word.bounding_box, pass),
                None => self
                    .clusters
                    .push(WordCluster::new(text, word.confidence, word.bounding_box, pass)),
            }
            accepted += 1;
        }
        debug!(accepted, clusters = self.clusters.len(), "Recognition pass merged");
        accepted
    }

    /// Pick canonical spellings, correct, filter and compose reading-order text.
    #[instrument(skip_all, fields(passes = self.passes, clusters = self.clusters.len()))]
    pub fn finish(self) -> MergedText {
        let min_occurrences = self.config.min_occurrences.min(self.passes).max(1);
        let boost = self.config.correction_boost;

        let mut kept: Vec<WordCluster> = self
            .clusters
            .into_iter()
            .filter_map(|mut cluster| {
                cluster.canonical_text = cluster.most_frequent_variant();
                cluster.confidence = cluster.mean_confidence();
                if !is_time_token(&cluster.canonical_text) {
                    if let Some(found) = self.matcher.best_match(&cluster.canonical_text) {
                        cluster.corrected = found.entry != cluster.canonical_text;
                        cluster.canonical_text = found.entry.to_string();
                        cluster.confidence = (cluster.confidence * boost).min(100.0);
                    }
                }
                (cluster.occurrences >= min_occurrences
                    && cluster.confidence > self.config.min_cluster_confidence)
                    .then_some(cluster)
            })
            .collect();

        let rows = reading_order(&mut kept, self.config.row_tolerance);
        let text = rows
            .iter()
            .map(|row| {
                row.iter()
                    .map(|&i| kept[i].canonical_text.as_str())
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join("\n");

        debug!(kept = kept.len(), rows = rows.len(), "Clusters composed");
        MergedText { text, clusters: kept }
    }
}

/// Sort clusters into reading order and return the row groups as indices.
///
/// Rows are grouped greedily by mean vertical position: a cluster starts a new
/// row once it is `tolerance` or more below the first cluster of the current
/// row. Within a row clusters run left to right.
fn reading_order(clusters: &mut [WordCluster], tolerance: f32) -> Vec<Vec<usize>> {
    clusters.sort_by(|a, b| {
        let (pa, pb) = (a.mean_position(), b.mean_position());
        pa.y.total_cmp(&pb.y).then(pa.x.total_cmp(&pb.x))
    });

    let mut bands: Vec<(usize, usize)> = Vec::new();
    let mut row_top = f32::NEG_INFINITY;
    for (index, cluster) in clusters.iter().enumerate() {
        let y = cluster.mean_position().y;
        if bands.is_empty() || y - row_top >= tolerance {
            bands.push((index, index + 1));
            row_top = y;
        } else if let Some(band) = bands.last_mut() {
            band.1 = index + 1;
        }
    }

    for &(start, end) in &bands {
        clusters[start..end].sort_by(|a, b| a.mean_position().x.total_cmp(&b.mean_position().x));
    }
    bands
        .into_iter()
        .map(|(start, end)| (start..end).collect())
        .collect()
}
