//! 组织区域小块筛选.

use crate::slide::{luma, PyramidRead, ReadResult, RgbRegion};
use crate::XY;
use ndarray::Axis;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 组织阈值. 亮度不低于 `background_luma` 的像素视为背景 (玻片空白处接近白色),
/// 组织像素占比不低于 `min_tissue_fraction` 的小块被保留.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TissueThreshold {
    /// 背景亮度下限, `[0, 255]`.
    pub background_luma: f64,

    /// 组织像素最小占比, `[0, 1]`.
    pub min_tissue_fraction: f64,
}

impl Default for TissueThreshold {
    fn default() -> Self {
        Self {
            background_luma: 220.0,
            min_tissue_fraction: 0.5,
        }
    }
}

impl TissueThreshold {
    /// 小块中组织像素的占比. 空区域返回 0.
    pub fn tissue_fraction(&self, region: &RgbRegion) -> f64 {
        let n = region.width() * region.height();
        if n == 0 {
            return 0.0;
        }
        let tissue = region
            .view()
            .lanes(Axis(2))
            .into_iter()
            .filter(|p| luma([p[0], p[1], p[2]]) < self.background_luma)
            .count();
        tissue as f64 / n as f64
    }

    /// 小块是否包含足够的组织.
    #[inline]
    pub fn accepts(&self, region: &RgbRegion) -> bool {
        self.tissue_fraction(region) >= self.min_tissue_fraction
    }
}

/// 通过阈值筛选的小块.
#[derive(Clone, Debug)]
pub struct Tile {
    /// 左上角 x (第 0 层).
    pub x: usize,

    /// 左上角 y (第 0 层).
    pub y: usize,

    /// 第 0 层像素.
    pub region: RgbRegion,
}

/// 依次读取 `starts` 中每个起点处 `tile_size` 见方的第 0 层小块, 保留通过阈值的小块.
///
/// 任一读取失败时立即返回错误.
pub fn threshold_tiles<R: PyramidRead + ?Sized>(
    reader: &R,
    starts: &[XY],
    tile_size: usize,
    threshold: &TissueThreshold,
) -> ReadResult<Vec<Tile>> {
    let mut res = Vec::new();
    for &(x, y) in starts {
        let region = reader.read_region((x, y), 0, (tile_size, tile_size))?;
        if threshold.accepts(&region) {
            res.push(Tile { x, y, region });
        }
    }
    Ok(res)
}

/// 按块顺序拼接各块的筛选结果. 遇到第一个错误时返回该错误.
pub fn compile_results(results: Vec<ReadResult<Vec<Tile>>>) -> ReadResult<Vec<Tile>> {
    let mut ans = Vec::new();
    for r in results {
        ans.extend(r?);
    }
    Ok(ans)
}

/// 借助 `rayon`, 对每个起点块 (`chunks`) 并行调用 [`threshold_tiles`],
/// 然后按块顺序拼接结果. 输出顺序与串行处理完全一致.
#[cfg(feature = "rayon")]
pub fn par_threshold_tiles<R: PyramidRead + ?Sized>(
    reader: &R,
    chunks: &[Vec<XY>],
    tile_size: usize,
    threshold: &TissueThreshold,
) -> ReadResult<Vec<Tile>> {
    use rayon::prelude::*;

    let results: Vec<_> = chunks
        .par_iter()
        .map(|c| threshold_tiles(reader, c, tile_size, threshold))
        .collect();
    compile_results(results)
}

/// 小块坐标索引. k-NN 图实验以此为节点.
#[derive(Clone, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TileIndex {
    /// 小块左上角坐标 `(x, y)`, 保持筛选输出的顺序.
    pub coords: Vec<XY>,
}

impl TileIndex {
    /// 小块个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.coords.len()
    }

    /// 是否为空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    /// 以 `f64` 形式获取所有坐标点.
    pub fn points(&self) -> Vec<[f64; 2]> {
        self.coords
            .iter()
            .map(|&(x, y)| [x as f64, y as f64])
            .collect()
    }
}

impl<'a> FromIterator<&'a Tile> for TileIndex {
    fn from_iter<I: IntoIterator<Item = &'a Tile>>(iter: I) -> Self {
        Self {
            coords: iter.into_iter().map(|t| (t.x, t.y)).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slide::ImagePyramid;
    use crate::tiling::{chunk_evenly, tile_origins};
    use ndarray::Array3;

    /// 左半边为深色组织, 右半边为白色背景的 128x128 切片.
    fn half_tissue() -> ImagePyramid {
        let base = Array3::from_shape_fn((128, 128, 3), |(_, x, _)| if x < 64 { 90 } else { 250 });
        ImagePyramid::from_base(base, 128, 1)
    }

    #[test]
    fn test_tissue_fraction() {
        let th = TissueThreshold::default();
        let p = half_tissue();
        let r = p.read_region((32, 0), 0, (64, 64)).unwrap();
        assert!((th.tissue_fraction(&r) - 0.5).abs() < 1e-12);
        assert!(th.accepts(&r));
        let white = RgbRegion::background((8, 8));
        assert_eq!(th.tissue_fraction(&white), 0.0);
    }

    #[test]
    fn test_threshold_tiles_keeps_tissue_only() {
        let p = half_tissue();
        let starts = tile_origins(&[(0, 0)], 128, 64);
        let tiles = threshold_tiles(&p, &starts, 64, &TissueThreshold::default()).unwrap();
        let idx: TileIndex = tiles.iter().collect();
        assert_eq!(idx.coords, vec![(0, 0), (0, 64)]);
    }

    #[cfg(feature = "rayon")]
    #[test]
    fn test_parallel_matches_sequential() {
        let p = half_tissue();
        let starts = tile_origins(&[(0, 0)], 128, 32);
        let th = TissueThreshold::default();
        let seq: TileIndex = threshold_tiles(&p, &starts, 32, &th).unwrap().iter().collect();
        let chunks = chunk_evenly(&starts, 5);
        let par: TileIndex = par_threshold_tiles(&p, &chunks, 32, &th)
            .unwrap()
            .iter()
            .collect();
        assert_eq!(seq, par);
        assert_eq!(seq.len(), 8);
    }

    #[test]
    fn test_compile_results_propagates_error() {
        let ok = Ok(vec![Tile {
            x: 1,
            y: 2,
            region: RgbRegion::background((1, 1)),
        }]);
        let bad = Err(crate::slide::ReadError::EmptyRegion);
        assert!(compile_results(vec![ok, bad]).is_err());
        assert!(compile_results(vec![]).unwrap().is_empty());
    }
}
