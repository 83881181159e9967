//! 细胞核图与 tile 图.

use super::{EdgeList, GraphError, GraphResult, KnnGraph, Metric, NearestNeighbors, NodeTable};
use crate::consts::rgb::{Rgb, BLUE};
use crate::nucleus::{CentroidRecord, NucleusType};
use crate::tiling::TileIndex;

/// 节点表, 边表, 由边表构建的图, 以及节点颜色.
#[derive(Clone, Debug)]
pub struct SpatialGraph {
    /// 节点表.
    pub nodes: NodeTable,

    /// 过滤后的边表.
    pub edges: EdgeList,

    /// 无向图.
    pub graph: KnnGraph,

    /// 节点颜色.
    pub color: Rgb,
}

impl SpatialGraph {
    fn build(
        points: &[[f64; 2]],
        k: usize,
        metric: Metric,
        max_weight: f64,
        color: Rgb,
    ) -> GraphResult<Self> {
        let nb = NearestNeighbors::fit_with(points, metric).kneighbors(k)?;
        let edges = EdgeList::from_neighbors(&nb).below_weight(max_weight);
        let graph = KnnGraph::from_edges(&edges);
        log::debug!(
            "{} points, {} edges kept, graph has {} vertices",
            points.len(),
            edges.len(),
            graph.node_count()
        );
        Ok(Self {
            nodes: NodeTable::from_points(points),
            edges,
            graph,
            color,
        })
    }
}

/// 类别为 `kind` 的细胞核坐标 `(x, y)`, 保持原顺序. 结果下标即新的顶点编号.
pub fn nuclei_of_type(records: &[CentroidRecord], kind: NucleusType) -> Vec<[f64; 2]> {
    records
        .iter()
        .filter(|r| r.kind == kind.get())
        .map(|r| [r.x as f64, r.y as f64])
        .collect()
}

/// 某一类细胞核的 k-NN 图.
///
/// 以欧氏距离平方为权重, 丢弃自身后保留 `weight < threshold²` 的边.
/// `kind` 不在 `1..=4` 时返回 [`GraphError::InvalidNucleusType`];
/// 该类细胞核少于 `k` 个时返回 [`GraphError::InvalidK`].
pub fn nucleus_graph(
    records: &[CentroidRecord],
    kind: u8,
    k: usize,
    threshold: f64,
) -> GraphResult<SpatialGraph> {
    let t = NucleusType::new(kind).ok_or(GraphError::InvalidNucleusType(kind))?;
    let points = nuclei_of_type(records, t);
    SpatialGraph::build(
        &points,
        k,
        Metric::SqEuclidean,
        threshold * threshold,
        t.color(),
    )
}

/// 对类别 1..=4 分别建图, 求平均 core number.
///
/// 某类细胞核不足 `k` 个, 或过滤后没有任何边时, 对应位置为 `None` 并记录警告.
/// `k == 0` 时直接返回 [`GraphError::InvalidK`].
pub fn mean_core_numbers_by_type(
    records: &[CentroidRecord],
    k: usize,
    threshold: f64,
) -> GraphResult<[Option<f64>; 4]> {
    if k == 0 {
        return Err(GraphError::InvalidK(0, records.len()));
    }
    let mut ans = [None; 4];
    for t in NucleusType::all() {
        let slot = &mut ans[(t.get() - 1) as usize];
        match nucleus_graph(records, t.get(), k, threshold) {
            Ok(g) => {
                *slot = g.graph.mean_core_number();
                if slot.is_none() {
                    log::warn!("nucleus type {}: no edge below threshold {threshold}", t.get());
                }
            }
            Err(GraphError::InvalidK(k, n)) if k > n => {
                log::warn!("nucleus type {}: {n} nuclei are too few for k = {k}", t.get());
            }
            Err(e) => return Err(e),
        }
    }
    Ok(ans)
}

/// tile 坐标的 k-NN 图, 以欧氏距离为权重, 不做阈值过滤.
pub fn tile_graph(index: &TileIndex, k: usize) -> GraphResult<SpatialGraph> {
    SpatialGraph::build(&index.points(), k, Metric::Euclidean, f64::INFINITY, BLUE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::consts::rgb::RED;

    fn rec(x: i64, y: i64, kind: u8) -> CentroidRecord {
        CentroidRecord { x, y, kind }
    }

    /// 类别 4: 两个相距很远的紧密四点团; 类别 2: 三个点; 类别 1: 一个点.
    fn records() -> Vec<CentroidRecord> {
        let mut v = vec![];
        for (ox, oy) in [(0, 0), (500, 500)] {
            for (dx, dy) in [(0, 0), (3, 0), (0, 3), (3, 3)] {
                v.push(rec(ox + dx, oy + dy, 4));
            }
        }
        v.push(rec(10, 10, 2));
        v.push(rec(12, 10, 2));
        v.push(rec(300, 10, 2));
        v.push(rec(7, 7, 1));
        v
    }

    #[test]
    fn test_filter_and_reindex() {
        let pts = nuclei_of_type(&records(), NucleusType::new(2).unwrap());
        assert_eq!(pts, vec![[10.0, 10.0], [12.0, 10.0], [300.0, 10.0]]);
    }

    #[test]
    fn test_nucleus_graph_threshold() {
        let g = nucleus_graph(&records(), 4, 5, 20.0).unwrap();
        assert_eq!(g.color, RED);
        assert_eq!(g.nodes.len(), 8);
        assert_eq!(g.edges.len(), 4 * 8 - 8);
        // 每个四点团为 K4, 团之间没有边.
        assert_eq!(g.graph.node_count(), 8);
        assert_eq!(g.graph.edge_count(), 12);
        assert_eq!(g.graph.mean_core_number(), Some(3.0));
        assert!(g.edges.iter().all(|e| e.weight < 400.0));
    }

    #[test]
    fn test_invalid_type_and_k() {
        assert!(matches!(
            nucleus_graph(&records(), 0, 5, 20.0),
            Err(GraphError::InvalidNucleusType(0))
        ));
        assert!(matches!(
            nucleus_graph(&records(), 5, 5, 20.0),
            Err(GraphError::InvalidNucleusType(5))
        ));
        assert!(matches!(
            nucleus_graph(&records(), 2, 5, 20.0),
            Err(GraphError::InvalidK(5, 3))
        ));
    }

    #[test]
    fn test_mean_core_numbers_by_type() {
        let m = mean_core_numbers_by_type(&records(), 3, 20.0).unwrap();
        assert_eq!(m[0], None);
        // 类别 2: 只有 (10,10)-(12,10) 一条边在阈值内.
        assert_eq!(m[1], Some(1.0));
        assert_eq!(m[2], None);
        assert_eq!(m[3], Some(2.0));
    }

    #[test]
    fn test_mean_core_numbers_rejects_zero_k() {
        assert!(matches!(
            mean_core_numbers_by_type(&records(), 0, 20.0),
            Err(GraphError::InvalidK(0, 12))
        ));
        // k 大于所有类别的个数: 全部为 None, 不报错.
        assert_eq!(mean_core_numbers_by_type(&records(), 9, 20.0).unwrap(), [None; 4]);
    }

    #[test]
    fn test_tile_graph() {
        let index = TileIndex {
            coords: vec![(0, 0), (64, 0), (128, 0), (0, 64)],
        };
        let g = tile_graph(&index, 3).unwrap();
        assert_eq!(g.edges.len(), 2 * 4);
        assert_eq!(g.graph.node_count(), 4);
        let diag = 64.0 * 2f64.sqrt();
        assert!(g
            .edges
            .iter()
            .all(|e| e.weight == 64.0 || e.weight == 128.0 || (e.weight - diag).abs() < 1e-9));
        assert!(tile_graph(&index, 5).is_err());
    }
}
