//! Knowledge graph read model
//!
//! Every concept becomes a node carrying the user's confidence (when it has
//! been assessed) and the number of papers that mention it. Every stored
//! concept link becomes an undirected edge labelled with its relationship.

use papermind_common::db::ConceptUsage;
use papermind_common::errors::Result;
use papermind_common::Repository;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Display bucket for a concept's confidence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceBand {
    Untested,
    Low,
    Medium,
    High,
}

impl ConfidenceBand {
    pub const LOW_BELOW: f64 = 0.33;
    pub const MEDIUM_BELOW: f64 = 0.66;

    pub fn from_confidence(confidence: Option<f64>) -> Self {
        match confidence {
            None => ConfidenceBand::Untested,
            Some(c) if c < Self::LOW_BELOW => ConfidenceBand::Low,
            Some(c) if c < Self::MEDIUM_BELOW => ConfidenceBand::Medium,
            Some(_) => ConfidenceBand::High,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceBand::Untested => "untested",
            ConfidenceBand::Low => "low",
            ConfidenceBand::Medium => "medium",
            ConfidenceBand::High => "high",
        }
    }
}

impl fmt::Display for ConfidenceBand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphNode {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub confidence: Option<f64>,
    pub paper_count: i64,
    pub band: ConfidenceBand,
}

impl From<ConceptUsage> for GraphNode {
    fn from(usage: ConceptUsage) -> Self {
        Self {
            band: ConfidenceBand::from_confidence(usage.confidence),
            id: usage.concept_id,
            name: usage.name,
            description: usage.description,
            confidence: usage.confidence,
            paper_count: usage.paper_count,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GraphEdge {
    pub source: i64,
    pub target: i64,
    pub relationship: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct KnowledgeGraph {
    pub nodes: Vec<GraphNode>,
    pub edges: Vec<GraphEdge>,
}

impl KnowledgeGraph {
    pub async fn load(repository: &Repository) -> Result<Self> {
        let nodes: Vec<GraphNode> = repository
            .concept_usage()
            .await?
            .into_iter()
            .map(GraphNode::from)
            .collect();

        let edges = repository
            .all_concept_links()
            .await?
            .into_iter()
            .map(|link| GraphEdge {
                source: link.concept_a,
                target: link.concept_b,
                relationship: link.relationship,
            })
            .collect();

        Ok(Self { nodes, edges })
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: i64) -> Option<&GraphNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    /// Concepts linked to `id` with the relationship text
    pub fn neighbors(&self, id: i64) -> Vec<(&GraphNode, &str)> {
        self.edges
            .iter()
            .filter_map(|edge| {
                let other = if edge.source == id {
                    edge.target
                } else if edge.target == id {
                    edge.source
                } else {
                    return None;
                };
                self.node(other).map(|node| (node, edge.relationship.as_str()))
            })
            .collect()
    }

    pub fn band_counts(&self) -> HashMap<ConfidenceBand, usize> {
        let mut counts = HashMap::new();
        for node in &self.nodes {
            *counts.entry(node.band).or_insert(0) += 1;
        }
        counts
    }
}
