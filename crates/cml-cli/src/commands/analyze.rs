use std::collections::BTreeSet;
use std::path::Path;

use crate::build_models;

/// (source type, target type, label)
type Edge = (String, String, EdgeKind);

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
enum EdgeKind {
    Extends,
    Relation(String),
}

pub fn run_analyze(input_path: &Path, format: &str) -> Result<String, String> {
    let summaries = build_models(input_path)?;

    let mut nodes: BTreeSet<String> = BTreeSet::new();
    let mut abstract_types: BTreeSet<String> = BTreeSet::new();
    for summary in &summaries {
        for t in &summary.model.types {
            nodes.insert(t.name.clone());
            if t.is_abstract {
                abstract_types.insert(t.name.clone());
            }
        }
    }

    let mut edges: Vec<Edge> = Vec::new();
    for summary in &summaries {
        for t in &summary.model.types {
            if let Some(base) = &t.base {
                if nodes.contains(base) {
                    edges.push((t.name.clone(), base.clone(), EdgeKind::Extends));
                }
            }
        }
        for r in &summary.model.relations {
            let Some(owner) = &r.owner else {
                continue;
            };
            if nodes.contains(&r.target) {
                edges.push((
                    owner.clone(),
                    r.target.clone(),
                    EdgeKind::Relation(r.name.clone()),
                ));
            }
        }
    }

    edges.sort();
    edges.dedup();

    match format {
        "dot" => Ok(render_dot(&nodes, &abstract_types, &edges)),
        _ => Ok(render_mermaid(&nodes, &edges)),
    }
}

fn render_mermaid(nodes: &BTreeSet<String>, edges: &[Edge]) -> String {
    let mut lines = vec!["graph LR".to_string()];

    let referenced: BTreeSet<&str> = edges
        .iter()
        .flat_map(|(src, tgt, _)| [src.as_str(), tgt.as_str()])
        .collect();
    for name in nodes {
        if !referenced.contains(name.as_str()) {
            lines.push(format!("    {name}"));
        }
    }

    for (src, tgt, kind) in edges {
        match kind {
            EdgeKind::Extends => lines.push(format!("    {src} -.->|extends| {tgt}")),
            EdgeKind::Relation(name) => lines.push(format!("    {src} -->|{name}| {tgt}")),
        }
    }

    lines.push(format!("%% {} types, {} edges", nodes.len(), edges.len()));
    lines.join("\n")
}

fn render_dot(nodes: &BTreeSet<String>, abstract_types: &BTreeSet<String>, edges: &[Edge]) -> String {
    let mut lines = vec![
        "digraph CML {".to_string(),
        "    rankdir=LR;".to_string(),
        "    node [shape=box, style=filled, fillcolor=lightyellow];".to_string(),
    ];

    for name in nodes {
        if abstract_types.contains(name) {
            lines.push(format!("    \"{name}\" [style=dashed];"));
        } else {
            lines.push(format!("    \"{name}\";"));
        }
    }

    for (src, tgt, kind) in edges {
        match kind {
            EdgeKind::Extends => lines.push(format!(
                "    \"{src}\" -> \"{tgt}\" [label=\"extends\", style=dashed, color=blue];"
            )),
            EdgeKind::Relation(name) => lines.push(format!(
                "    \"{src}\" -> \"{tgt}\" [label=\"{name}\", color=black];"
            )),
        }
    }

    lines.push("}".to_string());
    lines.join("\n")
}
