//! Plain-text views

use papermind_study::{ConfidenceBand, Dashboard, KnowledgeGraph, PaperDetail, PaperSummary};
use std::fmt::Write;

const BAR_WIDTH: usize = 20;

/// `[#####-----] 50%`
pub fn confidence_bar(confidence: f64) -> String {
    let confidence = confidence.clamp(0.0, 1.0);
    let filled = (confidence * BAR_WIDTH as f64).round() as usize;
    format!(
        "[{}{}] {:>3.0}%",
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled),
        confidence * 100.0
    )
}

pub fn paper_list(papers: &[PaperSummary]) -> String {
    if papers.is_empty() {
        return "No papers yet. Ingest one to get started!\n".to_string();
    }

    let mut out = String::new();
    for paper in papers {
        let _ = writeln!(
            out,
            "{:>4}  {}  {}\n      {} | {}",
            paper.id,
            paper.added_at.format("%Y-%m-%d"),
            paper.title,
            paper.authors,
            paper.rating_label()
        );
    }
    out
}

pub fn paper_detail(detail: &PaperDetail) -> String {
    let paper = &detail.paper;
    let mut out = String::new();

    let _ = writeln!(out, "{} (paper {})", paper.title, paper.id);
    if !detail.authors.is_empty() {
        let _ = writeln!(out, "{}", detail.authors.join(", "));
    }
    let _ = writeln!(
        out,
        "Added {} | My understanding: {}",
        paper.added_at.format("%Y-%m-%d"),
        detail.rating_label()
    );

    let _ = writeln!(out, "\nAbstract\n{}", or_placeholder(&paper.abstract_text, "No abstract."));
    let _ = writeln!(out, "\nSummary\n{}", or_placeholder(&paper.summary, "No summary yet."));

    if !detail.concepts.is_empty() {
        let names: Vec<&str> = detail.concepts.iter().map(|c| c.name.as_str()).collect();
        let _ = writeln!(out, "\nKey concepts\n{}", names.join(", "));
    }

    if !detail.chats.is_empty() {
        let _ = writeln!(out, "\nChat history");
        for chat in &detail.chats {
            let _ = writeln!(
                out,
                "  #{} {} {} ({} messages)",
                chat.id,
                chat.created_at.format("%Y-%m-%d"),
                chat.agent_type,
                chat.message_count
            );
        }
    }

    let _ = writeln!(out, "\nMy takeaways");
    if detail.notes.is_empty() {
        let _ = writeln!(out, "  No takeaways yet.");
    }
    for note in &detail.notes {
        let _ = writeln!(out, "  - {} ({})", note.takeaway, note.created_at.format("%Y-%m-%d"));
    }

    out
}

pub fn dashboard(dashboard: &Dashboard) -> String {
    let stats = &dashboard.stats;
    let mut out = String::new();

    let _ = writeln!(
        out,
        "Papers: {}  Concepts: {}  Chat sessions: {}  Avg. confidence: {:.0}%",
        stats.paper_count,
        stats.concept_count,
        stats.chat_count,
        stats.avg_confidence * 100.0
    );

    if !dashboard.knowledge.is_empty() {
        let _ = writeln!(out, "\nKnowledge (weakest first)");
        for entry in &dashboard.knowledge {
            let _ = writeln!(out, "  {:<32} {}", entry.name, confidence_bar(entry.confidence));
        }
    }

    let _ = writeln!(out, "\nPapers");
    out.push_str(&paper_list(&dashboard.papers));

    if !dashboard.recent_chats.is_empty() {
        let _ = writeln!(out, "\nRecent chats");
        for chat in &dashboard.recent_chats {
            let _ = writeln!(
                out,
                "  #{} [{}] {} ({})",
                chat.id,
                chat.agent_type,
                chat.paper_title,
                chat.created_at.format("%Y-%m-%d")
            );
        }
    }

    out
}

pub fn knowledge_graph(graph: &KnowledgeGraph) -> String {
    if graph.is_empty() {
        return "No concepts yet. Ingest a paper to build your graph.\n".to_string();
    }

    let mut out = String::new();
    for node in &graph.nodes {
        let confidence = match node.confidence {
            Some(c) => confidence_bar(c),
            None => "untested".to_string(),
        };
        let _ = writeln!(
            out,
            "{} ({} paper{}) {}",
            node.name,
            node.paper_count,
            if node.paper_count == 1 { "" } else { "s" },
            confidence
        );
        for (neighbor, relationship) in graph.neighbors(node.id) {
            let _ = writeln!(out, "    -- {} --> {}", relationship, neighbor.name);
        }
    }

    let counts = graph.band_counts();
    let legend: Vec<String> = [
        ConfidenceBand::Low,
        ConfidenceBand::Medium,
        ConfidenceBand::High,
        ConfidenceBand::Untested,
    ]
    .iter()
    .map(|band| format!("{} {}", band, counts.get(band).copied().unwrap_or(0)))
    .collect();
    let _ = writeln!(out, "\nConfidence: {}", legend.join(", "));

    out
}

fn or_placeholder<'a>(text: &'a str, placeholder: &'a str) -> &'a str {
    if text.trim().is_empty() {
        placeholder
    } else {
        text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use papermind_study::{GraphEdge, GraphNode};

    fn node(id: i64, name: &str, confidence: Option<f64>) -> GraphNode {
        GraphNode {
            id,
            name: name.into(),
            description: String::new(),
            confidence,
            paper_count: 1,
            band: ConfidenceBand::from_confidence(confidence),
        }
    }

    #[test]
    fn test_confidence_bar() {
        assert_eq!(confidence_bar(0.5), format!("[{}{}]  50%", "#".repeat(10), "-".repeat(10)));
        assert!(confidence_bar(1.4).ends_with("100%"));
        assert!(confidence_bar(0.0).starts_with("[-"));
    }

    #[test]
    fn test_empty_views() {
        assert!(paper_list(&[]).starts_with("No papers yet"));
        assert!(knowledge_graph(&KnowledgeGraph::default()).starts_with("No concepts yet"));
    }

    #[test]
    fn test_paper_list_row() {
        let papers = vec![PaperSummary {
            id: 7,
            title: "Dropout".into(),
            authors: "Srivastava, Hinton".into(),
            added_at: Utc::now(),
            self_rating: Some(0.8),
        }];
        let text = paper_list(&papers);
        assert!(text.contains("Dropout"));
        assert!(text.contains("Srivastava, Hinton | Solid"));
    }

    #[test]
    fn test_graph_lists_links_both_ways() {
        let graph = KnowledgeGraph {
            nodes: vec![node(1, "attention", Some(0.9)), node(2, "softmax", None)],
            edges: vec![GraphEdge {
                source: 1,
                target: 2,
                relationship: "normalized by".into(),
            }],
        };
        let text = knowledge_graph(&graph);

        assert!(text.contains("-- normalized by --> softmax"));
        assert!(text.contains("-- normalized by --> attention"));
        assert!(text.contains("softmax (1 paper) untested"));
        assert!(text.contains("Confidence: low 0, medium 0, high 1, untested 1"));
    }
}
