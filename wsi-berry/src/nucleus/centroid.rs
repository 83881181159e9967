//! 由实例描述生成全局坐标下的质心记录.

use super::InstanceInfo;
use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 一个细胞核的质心记录. 坐标相对于 ROI 左上角.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CentroidRecord {
    /// x 坐标.
    pub x: i64,

    /// y 坐标.
    pub y: i64,

    /// 细胞核类别.
    pub kind: u8,
}

/// 对 `info` 中的每个实例 (按编号升序) 生成一条质心记录.
///
/// `offset` 为 patch 左上角相对 ROI 左上角的偏移 `(x, y)`.
/// 记录坐标为 `trunc(centroid + offset)`.
pub fn extract_centroids(
    info: &BTreeMap<u32, InstanceInfo>,
    offset: (i64, i64),
) -> Vec<CentroidRecord> {
    info.values()
        .map(|i| CentroidRecord {
            x: (i.centroid[0] + offset.0 as f64).trunc() as i64,
            y: (i.centroid[1] + offset.1 as f64).trunc() as i64,
            kind: i.kind,
        })
        .collect()
}

/// 一个 ROI 内所有细胞核的质心表.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CentroidTable {
    /// 质心记录, 按 patch 顺序与实例编号顺序排列.
    pub records: Vec<CentroidRecord>,
}

impl CentroidTable {
    /// 记录条数.
    #[inline]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// 是否为空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// 各类别的记录条数, 下标为类别编号.
    pub fn kind_histogram(&self) -> Vec<usize> {
        let max = self.records.iter().map(|r| r.kind).max().unwrap_or(0) as usize;
        let mut ans = vec![0; max + 1];
        self.records.iter().for_each(|r| ans[r.kind as usize] += 1);
        ans
    }
}

impl From<Vec<CentroidRecord>> for CentroidTable {
    fn from(records: Vec<CentroidRecord>) -> Self {
        Self { records }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn info(cx: f64, cy: f64, kind: u8) -> InstanceInfo {
        InstanceInfo {
            bbox: [(0, 0), (1, 1)],
            centroid: [cx, cy],
            contour: vec![],
            area: 1,
            kind,
            type_probability: 1.0,
        }
    }

    #[test]
    fn test_every_id_is_emitted_with_offset() {
        let mut m = BTreeMap::new();
        // 编号不连续.
        m.insert(7, info(3.9, 4.2, 2));
        m.insert(1, info(10.5, 0.0, 1));
        m.insert(3, info(0.1, 0.99, 4));
        let out = extract_centroids(&m, (256, 512));
        assert_eq!(
            out,
            vec![
                CentroidRecord { x: 266, y: 512, kind: 1 },
                CentroidRecord { x: 256, y: 512, kind: 4 },
                CentroidRecord { x: 259, y: 516, kind: 2 },
            ]
        );
    }

    #[test]
    fn test_truncation_toward_zero() {
        let mut m = BTreeMap::new();
        m.insert(1, info(0.5, 0.5, 3));
        let out = extract_centroids(&m, (-1, 0));
        assert_eq!(out[0].x, 0);
        assert_eq!(out[0].y, 0);
        assert!(extract_centroids(&BTreeMap::new(), (5, 5)).is_empty());
    }

    #[test]
    fn test_kind_histogram() {
        let t = CentroidTable::from(vec![
            CentroidRecord { x: 0, y: 0, kind: 2 },
            CentroidRecord { x: 1, y: 0, kind: 2 },
            CentroidRecord { x: 2, y: 0, kind: 4 },
        ]);
        assert_eq!(t.kind_histogram(), vec![0, 0, 2, 0, 1]);
    }
}
