//! 空间 k-NN 图: 近邻查询, 边表, k-core 分解与静态绘制.
//!
//! 典型流程: 点集 → [`NearestNeighbors::kneighbors`] → [`EdgeList::from_neighbors`]
//! (可按阈值过滤) → [`KnnGraph::from_edges`] → [`KnnGraph::core_numbers`].
//! 细胞核与 tile 两类输入的完整流程见 [`nucleus_graph`] 与 [`tile_graph`].

mod core;
mod edges;
mod error;
mod knn;
mod render;
mod spatial;

pub use self::core::KnnGraph;
pub use edges::{Edge, EdgeList, NodeRecord, NodeTable};
pub use error::{GraphError, GraphResult};
pub use knn::{Metric, NearestNeighbors, Neighbors};
pub use render::{render_bar_chart, render_graph, GraphCanvas, EDGE_ALPHA, NODE_RADIUS};
pub use spatial::{mean_core_numbers_by_type, nuclei_of_type, nucleus_graph, tile_graph, SpatialGraph};
