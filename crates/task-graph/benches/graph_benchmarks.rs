//! Benchmarks for task graph operations
//!
//! Run with: cargo bench -p taskweave-task-graph

#![allow(clippy::unwrap_used, missing_docs)]

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use taskweave_task_graph::{TaskGraph, TaskNodeData, dependency_levels, sort_by_hierarchy};

#[derive(Debug, Clone)]
struct BenchTask {
    id: String,
    parents: Vec<String>,
    children: Vec<String>,
}

impl TaskNodeData for BenchTask {
    fn id(&self) -> &str {
        &self.id
    }

    fn parent_ids(&self) -> &[String] {
        &self.parents
    }

    fn children(&self) -> &[String] {
        &self.children
    }
}

fn task(id: String, parents: Vec<String>) -> BenchTask {
    BenchTask {
        id,
        parents,
        children: vec![],
    }
}

/// Fill in `children` from `parents`.
fn link(mut tasks: Vec<BenchTask>) -> Vec<BenchTask> {
    let edges: Vec<(String, String)> = tasks
        .iter()
        .flat_map(|t| t.parents.iter().map(|p| (p.clone(), t.id.clone())))
        .collect();
    for (parent, child) in edges {
        if let Some(t) = tasks.iter_mut().find(|t| t.id == parent) {
            t.children.push(child);
        }
    }
    tasks
}

/// Generate a wide graph with many tasks depending on a single root, listed leaves first
fn generate_wide_graph(task_count: usize) -> Vec<BenchTask> {
    let mut tasks: Vec<BenchTask> = (0..task_count)
        .map(|i| task(format!("task_{i}"), vec!["root".to_string()]))
        .collect();
    tasks.push(task("root".to_string(), vec![]));
    link(tasks)
}

/// Generate a deep graph with a linear chain, listed in reverse
fn generate_deep_graph(depth: usize) -> Vec<BenchTask> {
    let tasks: Vec<BenchTask> = (0..depth)
        .rev()
        .map(|i| {
            let parents = if i == 0 {
                vec![]
            } else {
                vec![format!("task_{}", i - 1)]
            };
            task(format!("task_{i}"), parents)
        })
        .collect();
    link(tasks)
}

/// Generate a diamond graph (fan-out then fan-in)
fn generate_diamond_graph(width: usize, depth: usize) -> Vec<BenchTask> {
    let mut tasks = vec![task("root".to_string(), vec![])];
    let mut prev_level: Vec<String> = vec!["root".to_string()];

    for level in 0..depth {
        let mut current_level = Vec::new();
        for w in 0..width {
            let id = format!("level_{level}_task_{w}");
            tasks.push(task(id.clone(), prev_level.clone()));
            current_level.push(id);
        }
        prev_level = current_level;
    }

    tasks.push(task("final".to_string(), prev_level));
    link(tasks)
}

fn benchmark_sort_wide(c: &mut Criterion) {
    let mut group = c.benchmark_group("sort_by_hierarchy_wide");

    for count in [50, 100, 200, 500] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let tasks = generate_wide_graph(count);
            b.iter(|| black_box(sort_by_hierarchy(tasks.clone()).unwrap()));
        });
    }

    group.finish();
}

fn benchmark_deep_chain(c: &mut Criterion) {
    let mut group = c.benchmark_group("deep_chain_levels");

    for depth in [10, 20, 50, 100] {
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            let tasks = generate_deep_graph(depth);
            b.iter(|| black_box(dependency_levels(&tasks).unwrap()));
        });
    }

    group.finish();
}

fn benchmark_diamond_graph(c: &mut Criterion) {
    let mut group = c.benchmark_group("diamond_graph");

    for (width, depth) in [(5, 5), (10, 5), (5, 10), (10, 10)] {
        let label = format!("w{width}_d{depth}");
        group.bench_with_input(
            BenchmarkId::from_parameter(&label),
            &(width, depth),
            |b, &(width, depth)| {
                let tasks = generate_diamond_graph(width, depth);
                b.iter(|| black_box(sort_by_hierarchy(tasks.clone()).unwrap()));
            },
        );
    }

    group.finish();
}

fn benchmark_cycle_detection(c: &mut Criterion) {
    let mut group = c.benchmark_group("cycle_detection");

    for count in [100, 500, 1000] {
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |b, &count| {
            let tasks = generate_wide_graph(count);
            b.iter(|| {
                let graph = TaskGraph::from_nodes(&tasks).unwrap();
                black_box(graph.has_cycles())
            });
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    benchmark_sort_wide,
    benchmark_deep_chain,
    benchmark_diamond_graph,
    benchmark_cycle_detection,
);

criterion_main!(benches);
