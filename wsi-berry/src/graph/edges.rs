//! 由近邻查询结果生成的边表与节点表.

use super::Neighbors;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 一条带权边. `source`/`target` 为点的下标.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Edge {
    /// 起点.
    pub source: usize,

    /// 终点.
    pub target: usize,

    /// 权重 (距离或距离平方, 取决于查询度量).
    pub weight: f64,
}

/// 边表.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EdgeList {
    edges: Vec<Edge>,
}

impl EdgeList {
    /// 丢弃第 0 列 (自身), 把第 `1..k` 列依次展开为 `k - 1` 段, 每段 `n` 条边.
    ///
    /// 第 `r` 段第 `i` 条边为 `(i, indices[i][r], distances[i][r])`. 总长度为 `(k - 1) * n`.
    pub fn from_neighbors(nb: &Neighbors) -> Self {
        let edges = (1..nb.k())
            .flat_map(|r| {
                (0..nb.len()).map(move |i| Edge {
                    source: i,
                    target: nb.indices[(i, r)],
                    weight: nb.distances[(i, r)],
                })
            })
            .collect();
        Self { edges }
    }

    /// 仅保留 `weight < threshold²` 的边.
    ///
    /// 用于以距离平方为权重的边表, `threshold` 为像素距离.
    pub fn below(&self, threshold: f64) -> Self {
        self.below_weight(threshold * threshold)
    }

    /// 仅保留 `weight < w` 的边.
    pub fn below_weight(&self, w: f64) -> Self {
        Self {
            edges: self.edges.iter().filter(|e| e.weight < w).copied().collect(),
        }
    }

    /// 边数.
    #[inline]
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// 是否为空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// 按顺序遍历所有边.
    pub fn iter(&self) -> std::slice::Iter<'_, Edge> {
        self.edges.iter()
    }

    /// 全部边.
    #[inline]
    pub fn as_slice(&self) -> &[Edge] {
        &self.edges
    }
}

impl From<Vec<Edge>> for EdgeList {
    fn from(edges: Vec<Edge>) -> Self {
        Self { edges }
    }
}

impl<'a> IntoIterator for &'a EdgeList {
    type Item = &'a Edge;
    type IntoIter = std::slice::Iter<'a, Edge>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// 节点记录, `vertex` 与点的下标相同.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NodeRecord {
    /// x 坐标.
    pub x: f64,

    /// y 坐标.
    pub y: f64,

    /// 顶点编号.
    pub vertex: usize,
}

/// 节点表.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NodeTable {
    /// 所有节点, 按顶点编号升序.
    pub nodes: Vec<NodeRecord>,
}

impl NodeTable {
    /// 第 `i` 个点成为顶点 `i`.
    pub fn from_points(points: &[[f64; 2]]) -> Self {
        let nodes = points
            .iter()
            .enumerate()
            .map(|(vertex, &[x, y])| NodeRecord { x, y, vertex })
            .collect();
        Self { nodes }
    }

    /// 节点数.
    #[inline]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// 是否为空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// 坐标包围盒 `[(xmin, ymin), (xmax, ymax)]`. 空表返回 `None`.
    pub fn bounds(&self) -> Option<[(f64, f64); 2]> {
        let first = self.nodes.first()?;
        let init = [(first.x, first.y), (first.x, first.y)];
        Some(self.nodes.iter().fold(init, |[lo, hi], n| {
            [
                (lo.0.min(n.x), lo.1.min(n.y)),
                (hi.0.max(n.x), hi.1.max(n.y)),
            ]
        }))
    }
}
