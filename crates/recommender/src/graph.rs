//! Sequence-to-graph encoding.
//!
//! A validated sequence becomes a directed path graph with one node per
//! distinct tool. Node numbering is the first-seen order of the tool ids, so
//! the same sequence always yields the same indices and feature rows.

use crate::catalog::{SequenceStep, ToolId};
use crate::errors::GraphError;
use ndarray::{Array1, Array2};
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::Direction;
use std::collections::HashMap;
use tracing::debug;

/// Нумерация узлов по первому появлению инструмента
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeIndexer {
    /// step position → node index
    step_nodes: Vec<usize>,
    /// node index → tool id
    node_tools: Vec<ToolId>,
}

impl NodeIndexer {
    pub fn index(ids: impl IntoIterator<Item = ToolId>) -> Self {
        let mut seen: HashMap<ToolId, usize> = HashMap::new();
        let mut step_nodes = Vec::new();
        let mut node_tools = Vec::new();

        for id in ids {
            let node = *seen.entry(id).or_insert_with(|| {
                node_tools.push(id);
                node_tools.len() - 1
            });
            step_nodes.push(node);
        }

        Self {
            step_nodes,
            node_tools,
        }
    }

    pub fn step_nodes(&self) -> &[usize] {
        &self.step_nodes
    }

    pub fn node_tools(&self) -> &[ToolId] {
        &self.node_tools
    }
}

/// Направленный граф пути; параллельные рёбра не схлопываются
#[derive(Debug, Clone)]
pub struct PathGraph {
    graph: DiGraph<ToolId, ()>,
    indexer: NodeIndexer,
}

impl PathGraph {
    pub fn from_steps(ids: impl IntoIterator<Item = ToolId>) -> Self {
        let indexer = NodeIndexer::index(ids);

        let mut graph = DiGraph::with_capacity(
            indexer.node_tools.len(),
            indexer.step_nodes.len().saturating_sub(1),
        );
        for &id in &indexer.node_tools {
            graph.add_node(id);
        }
        for pair in indexer.step_nodes.windows(2) {
            graph.add_edge(NodeIndex::new(pair[0]), NodeIndex::new(pair[1]), ());
        }

        Self { graph, indexer }
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Tool id of node `index`
    pub fn node_tool(&self, index: usize) -> Option<ToolId> {
        self.indexer.node_tools.get(index).copied()
    }

    /// Node index → tool id, in node order
    pub fn node_tools(&self) -> &[ToolId] {
        self.indexer.node_tools()
    }

    /// Node of each sequence position
    pub fn step_nodes(&self) -> &[usize] {
        self.indexer.step_nodes()
    }

    /// (sender, receiver) pairs in sequence order
    pub fn edges(&self) -> Vec<(usize, usize)> {
        self.graph
            .raw_edges()
            .iter()
            .map(|edge| (edge.source().index(), edge.target().index()))
            .collect()
    }

    pub fn successors(&self, node: usize) -> Vec<usize> {
        self.neighbors(node, Direction::Outgoing)
    }

    pub fn predecessors(&self, node: usize) -> Vec<usize> {
        self.neighbors(node, Direction::Incoming)
    }

    fn neighbors(&self, node: usize, direction: Direction) -> Vec<usize> {
        if node >= self.node_count() {
            return Vec::new();
        }
        let mut out: Vec<usize> = self
            .graph
            .neighbors_directed(NodeIndex::new(node), direction)
            .map(|n| n.index())
            .collect();
        out.sort_unstable();
        out.dedup();
        out
    }

    pub fn graph(&self) -> &DiGraph<ToolId, ()> {
        &self.graph
    }
}

/// Батч из одного графа в формате, который ждёт scorer
#[derive(Debug, Clone, PartialEq)]
pub struct GraphBatch {
    /// Node features, `[num_nodes, 1 + embedding_dim]`
    pub x: Array2<f32>,
    /// Senders in row 0, receivers in row 1, `[2, num_edges]`
    pub edge_index: Array2<i64>,
    /// Graph membership of every node (all zeros)
    pub batch: Array1<i64>,
    pub num_graphs: usize,
}

impl GraphBatch {
    pub fn num_nodes(&self) -> usize {
        self.x.nrows()
    }

    pub fn num_edges(&self) -> usize {
        self.edge_index.ncols()
    }

    pub fn feature_width(&self) -> usize {
        self.x.ncols()
    }
}

/// Граф вместе с батчем для scorer'а
#[derive(Debug, Clone)]
pub struct EncodedGraph {
    pub graph: PathGraph,
    pub batch: GraphBatch,
}

/// Encodes a validated sequence.
///
/// Feature row `i` is `[id, embedding...]` of the `i`-th distinct tool by first
/// appearance.
pub fn encode(sequence: &[SequenceStep<'_>]) -> Result<EncodedGraph, GraphError> {
    let first = sequence.first().ok_or(GraphError::EmptySequence)?;
    let width = 1 + first.embedding.len();

    let mut embeddings: HashMap<ToolId, &[f32]> = HashMap::new();
    for (position, step) in sequence.iter().enumerate() {
        if 1 + step.embedding.len() != width {
            return Err(GraphError::FeatureWidth {
                position,
                expected: width,
                actual: 1 + step.embedding.len(),
            });
        }
        embeddings.entry(step.id).or_insert(step.embedding);
    }

    let graph = PathGraph::from_steps(sequence.iter().map(|step| step.id));

    let mut features = Vec::with_capacity(graph.node_count() * width);
    for id in graph.node_tools() {
        features.push(id.0 as f32);
        features.extend_from_slice(embeddings[id]);
    }
    let x = Array2::from_shape_vec((graph.node_count(), width), features)?;

    let edges = graph.edges();
    let mut flat = Vec::with_capacity(edges.len() * 2);
    flat.extend(edges.iter().map(|&(s, _)| s as i64));
    flat.extend(edges.iter().map(|&(_, r)| r as i64));
    let edge_index = Array2::from_shape_vec((2, edges.len()), flat)?;

    let batch = GraphBatch {
        x,
        edge_index,
        batch: Array1::zeros(graph.node_count()),
        num_graphs: 1,
    };
    debug!(
        nodes = batch.num_nodes(),
        edges = batch.num_edges(),
        width = batch.feature_width(),
        "Encoded sequence graph"
    );

    Ok(EncodedGraph { graph, batch })
}
