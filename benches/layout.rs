use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use serde_json::Value;
use std::hint::black_box;

use canvasflow::layout::branch::compute_branch_layout;
use canvasflow::model::{CanvasGraph, GraphEdge, GraphNode, NodeKind, PreviewLink};
use canvasflow::{LayoutEngine, LayoutOptions};

fn node(id: String, kind: &str) -> GraphNode {
    GraphNode {
        id,
        kind: NodeKind::from(kind.to_string()),
        size: None,
        position: None,
        data: Value::Null,
    }
}

fn edge(id: String, source: String, target: String) -> GraphEdge {
    GraphEdge {
        id,
        source,
        target,
        kind: Default::default(),
    }
}

/// Linear chain: start → n1 → … → end.
fn chain_graph(length: usize) -> CanvasGraph {
    let mut nodes = vec![node("start".to_string(), "start")];
    let mut edges = Vec::new();
    for i in 0..length {
        nodes.push(node(format!("n{i}"), "sms"));
    }
    nodes.push(node("end".to_string(), "end"));
    let ids: Vec<String> = nodes.iter().map(|n| n.id.clone()).collect();
    for pair in ids.windows(2) {
        edges.push(edge(
            format!("e_{}_{}", pair[0], pair[1]),
            pair[0].clone(),
            pair[1].clone(),
        ));
    }
    CanvasGraph {
        nodes,
        edges,
        preview_links: vec![],
    }
}

/// One splitter fanning out to `width` parallel chains of `depth` nodes.
fn fan_graph(width: usize, depth: usize) -> CanvasGraph {
    let mut nodes = vec![
        node("start".to_string(), "start"),
        node("split".to_string(), "audience-split"),
    ];
    let mut edges = vec![edge(
        "e_root".to_string(),
        "start".to_string(),
        "split".to_string(),
    )];
    for branch in 0..width {
        let mut prev = "split".to_string();
        for level in 0..depth {
            let id = format!("b{branch}_n{level}");
            nodes.push(node(id.clone(), "sms"));
            edges.push(edge(format!("e_{prev}_{id}"), prev.clone(), id.clone()));
            prev = id;
        }
    }
    CanvasGraph {
        nodes,
        edges,
        preview_links: vec![],
    }
}

fn with_previews(mut graph: CanvasGraph, count: usize) -> CanvasGraph {
    for i in 0..count {
        graph.preview_links.push(PreviewLink {
            id: format!("p{i}"),
            source: "split".to_string(),
            branch_index: i,
            target: None,
        });
    }
    graph
}

fn bench_hierarchy(c: &mut Criterion) {
    let mut group = c.benchmark_group("hierarchy");
    for (name, graph) in [
        ("chain_50", chain_graph(50)),
        ("chain_500", chain_graph(500)),
        ("fan_10x10", fan_graph(10, 10)),
        ("fan_30x20", fan_graph(30, 20)),
    ] {
        let mut options = LayoutOptions::default();
        options.performance.enable_cache = false;
        group.bench_with_input(BenchmarkId::from_parameter(name), &graph, |b, graph| {
            let mut engine = LayoutEngine::new(options.clone());
            b.iter(|| {
                let result = engine.calculate_layout(black_box(graph));
                black_box(result.positions.len());
            });
        });
    }
    group.finish();
}

fn bench_cache_hit(c: &mut Criterion) {
    let mut group = c.benchmark_group("cache_hit");
    let graph = fan_graph(30, 20);
    let mut engine = LayoutEngine::new(LayoutOptions::default());
    engine.calculate_layout(&graph);
    group.bench_function("fan_30x20", |b| {
        b.iter(|| {
            let result = engine.calculate_layout(black_box(&graph));
            black_box(result.positions.len());
        });
    });
    group.finish();
}

fn bench_branch(c: &mut Criterion) {
    let mut group = c.benchmark_group("branch");
    let options = LayoutOptions::default();
    for (name, graph) in [
        ("fan_10x10", fan_graph(10, 10)),
        ("fan_10x10_previews", with_previews(fan_graph(10, 10), 8)),
        ("fan_30x20", fan_graph(30, 20)),
    ] {
        group.bench_with_input(BenchmarkId::from_parameter(name), &graph, |b, graph| {
            b.iter(|| {
                let layout = compute_branch_layout(black_box(graph), &options)
                    .expect("branch layout failed");
                black_box(layout.positions.len());
            });
        });
    }
    group.finish();
}

criterion_group!(
    name = benches;
    config = Criterion::default();
    targets = bench_hierarchy, bench_cache_hit, bench_branch
);
criterion_main!(benches);
