//! 无向 k-NN 图与 k-core 分解.

use super::EdgeList;
use petgraph::graph::{NodeIndex, UnGraph};
use std::collections::{HashMap, HashSet};

/// 由边表构建的无向简单图.
///
/// 顶点按其在边表中首次出现的顺序重新编号 (只包含出现在边中的点),
/// 节点权重为原始顶点编号, 边权重为首次出现时的权重.
/// 重复的无序点对与自环被丢弃.
#[derive(Clone, Debug)]
pub struct KnnGraph {
    graph: UnGraph<usize, f64>,
}

impl KnnGraph {
    /// 从边表构建.
    pub fn from_edges(edges: &EdgeList) -> Self {
        let mut graph = UnGraph::default();
        let mut ids: HashMap<usize, NodeIndex> = HashMap::new();
        let mut seen: HashSet<(usize, usize)> = HashSet::new();

        for e in edges {
            if e.source == e.target {
                continue;
            }
            let key = (e.source.min(e.target), e.source.max(e.target));
            if !seen.insert(key) {
                continue;
            }
            let a = *ids
                .entry(e.source)
                .or_insert_with(|| graph.add_node(e.source));
            let b = *ids
                .entry(e.target)
                .or_insert_with(|| graph.add_node(e.target));
            graph.add_edge(a, b, e.weight);
        }
        Self { graph }
    }

    /// 顶点数.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    /// 边数.
    #[inline]
    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// 原始顶点编号, 按内部编号顺序.
    pub fn vertices(&self) -> Vec<usize> {
        self.graph.node_weights().copied().collect()
    }

    /// 底层 `petgraph` 图.
    #[inline]
    pub fn inner(&self) -> &UnGraph<usize, f64> {
        &self.graph
    }

    /// 每个顶点的 core number, 顺序同 [`Self::vertices`].
    ///
    /// Batagelj–Zaversnik 算法: 按度数桶排序, 依次剥离度数最小的顶点, O(V + E).
    pub fn core_numbers(&self) -> Vec<usize> {
        let g = &self.graph;
        let n = g.node_count();
        let mut deg: Vec<usize> = g.node_indices().map(|v| g.neighbors(v).count()).collect();
        let md = deg.iter().copied().max().unwrap_or(0);

        // bin[d]: 度数为 d 的顶点在 vert 中的起始位置.
        let mut bin = vec![0usize; md + 1];
        deg.iter().for_each(|&d| bin[d] += 1);
        let mut start = 0;
        for b in bin.iter_mut() {
            let cnt = *b;
            *b = start;
            start += cnt;
        }

        let mut pos = vec![0usize; n];
        let mut vert = vec![0usize; n];
        for v in 0..n {
            pos[v] = bin[deg[v]];
            vert[pos[v]] = v;
            bin[deg[v]] += 1;
        }
        for d in (1..=md).rev() {
            bin[d] = bin[d - 1];
        }
        if let Some(b) = bin.first_mut() {
            *b = 0;
        }

        for i in 0..n {
            let v = vert[i];
            for u in g.neighbors(NodeIndex::new(v)) {
                let u = u.index();
                if deg[u] > deg[v] {
                    let du = deg[u];
                    let pu = pos[u];
                    let pw = bin[du];
                    let w = vert[pw];
                    if u != w {
                        pos[u] = pw;
                        vert[pu] = w;
                        pos[w] = pu;
                        vert[pw] = u;
                    }
                    bin[du] += 1;
                    deg[u] -= 1;
                }
            }
        }
        deg
    }

    /// 所有顶点 core number 的均值. 空图返回 `None`.
    pub fn mean_core_number(&self) -> Option<f64> {
        let cores = self.core_numbers();
        if cores.is_empty() {
            return None;
        }
        Some(cores.iter().sum::<usize>() as f64 / cores.len() as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Edge;

    fn el(pairs: &[(usize, usize)]) -> EdgeList {
        pairs
            .iter()
            .map(|&(source, target)| Edge {
                source,
                target,
                weight: 1.0,
            })
            .collect::<Vec<_>>()
            .into()
    }

    #[test]
    fn test_renumber_and_dedup() {
        let g = KnnGraph::from_edges(&el(&[(7, 3), (3, 7), (3, 3), (9, 7), (7, 9)]));
        assert_eq!(g.vertices(), vec![7, 3, 9]);
        assert_eq!(g.node_count(), 3);
        assert_eq!(g.edge_count(), 2);
    }

    #[test]
    fn test_core_numbers() {
        // 三角形 0-1-2, 挂一个叶子 3, 以及孤立的边 4-5.
        let g = KnnGraph::from_edges(&el(&[(0, 1), (1, 2), (2, 0), (2, 3), (4, 5)]));
        let cores: HashMap<usize, usize> =
            g.vertices().into_iter().zip(g.core_numbers()).collect();
        assert_eq!(cores[&0], 2);
        assert_eq!(cores[&1], 2);
        assert_eq!(cores[&2], 2);
        assert_eq!(cores[&3], 1);
        assert_eq!(cores[&4], 1);
        assert_eq!(cores[&5], 1);
        let mean = g.mean_core_number().unwrap();
        assert!((mean - 9.0 / 6.0).abs() < 1e-12);
    }

    #[test]
    fn test_complete_graph() {
        let mut pairs = vec![];
        for a in 0..5 {
            for b in a + 1..5 {
                pairs.push((a, b));
            }
        }
        let g = KnnGraph::from_edges(&el(&pairs));
        assert!(g.core_numbers().iter().all(|&c| c == 4));
    }

    #[test]
    fn test_empty_graph() {
        let g = KnnGraph::from_edges(&EdgeList::default());
        assert!(g.core_numbers().is_empty());
        assert_eq!(g.mean_core_number(), None);
        // 只有自环时也没有顶点.
        assert_eq!(KnnGraph::from_edges(&el(&[(1, 1)])).node_count(), 0);
    }
}
