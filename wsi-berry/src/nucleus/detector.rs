//! 在 ROI 上逐 patch 检测细胞核.

use super::{
    extract_centroids, post_process, CentroidRecord, InstanceMapConfig, PostProcResult, Segmenter,
};
use crate::slide::PyramidRead;
use crate::{Size2d, XY};

/// ROI 内的 patch 网格. 所有坐标均为第 0 层像素.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PatchGrid {
    /// ROI 左上角 `(x, y)`.
    pub origin: XY,

    /// ROI 尺寸 (宽, 高).
    pub size: Size2d,

    /// patch 边长.
    pub patch_size: usize,

    /// 相邻 patch 起点的间距.
    pub stride: usize,
}

impl PatchGrid {
    /// 无重叠网格 (`stride == patch_size`).
    pub fn new(origin: XY, size: Size2d, patch_size: usize) -> Self {
        Self {
            origin,
            size,
            patch_size,
            stride: patch_size,
        }
    }

    /// 所有 patch 的左上角, 行优先. 最后一行/列的 patch 可以超出 ROI.
    ///
    /// # 注意
    ///
    /// `stride` 为 0 时程序 panic.
    pub fn locations(&self) -> Vec<XY> {
        assert_ne!(self.stride, 0, "patch 间距不能为 0");
        let (ox, oy) = self.origin;
        let (w, h) = self.size;
        (oy..oy + h)
            .step_by(self.stride)
            .flat_map(|y| (ox..ox + w).step_by(self.stride).map(move |x| (x, y)))
            .collect()
    }

    /// `location` 相对 ROI 左上角的偏移.
    #[inline]
    pub fn offset_of(&self, (x, y): XY) -> (i64, i64) {
        (
            x as i64 - self.origin.0 as i64,
            y as i64 - self.origin.1 as i64,
        )
    }
}

/// 细胞核检测器: 读取 patch, 外部推理, 后处理, 生成质心记录.
pub struct NucleusDetector<S> {
    segmenter: S,
    config: InstanceMapConfig,
}

impl<S: Segmenter> NucleusDetector<S> {
    /// 初始化.
    pub fn new(segmenter: S, config: InstanceMapConfig) -> Self {
        Self { segmenter, config }
    }

    /// 后处理参数.
    #[inline]
    pub fn config(&self) -> &InstanceMapConfig {
        &self.config
    }

    /// 处理位于 `location` 的单个 patch, 质心以 `offset` 平移.
    pub fn process_patch<R: PyramidRead + ?Sized>(
        &self,
        reader: &R,
        location: XY,
        patch_size: usize,
        offset: (i64, i64),
    ) -> PostProcResult<Vec<CentroidRecord>> {
        let patch = reader.read_region(location, 0, (patch_size, patch_size))?;
        let raw = self.segmenter.predict(location, &patch)?;
        let map = post_process(&raw, &self.config)?;
        let ans = extract_centroids(&map.info, offset);
        log::debug!(
            "patch ({}, {}): {} nuclei",
            location.0,
            location.1,
            ans.len()
        );
        Ok(ans)
    }

    /// 依次处理网格中的每个 patch, 按 patch 顺序拼接质心记录.
    pub fn detect<R: PyramidRead + ?Sized>(
        &self,
        reader: &R,
        grid: &PatchGrid,
    ) -> PostProcResult<Vec<CentroidRecord>> {
        let mut ans = Vec::new();
        for loc in grid.locations() {
            ans.extend(self.process_patch(reader, loc, grid.patch_size, grid.offset_of(loc))?);
        }
        log::info!("detected {} nuclei", ans.len());
        Ok(ans)
    }

    /// 借助 `rayon` 并行处理所有 patch. 结果与 [`Self::detect`] 完全相同.
    #[cfg(feature = "rayon")]
    pub fn par_detect<R: PyramidRead + ?Sized>(
        &self,
        reader: &R,
        grid: &PatchGrid,
    ) -> PostProcResult<Vec<CentroidRecord>> {
        use rayon::prelude::*;

        let per_patch: Vec<Vec<CentroidRecord>> = grid
            .locations()
            .into_par_iter()
            .map(|loc| self.process_patch(reader, loc, grid.patch_size, grid.offset_of(loc)))
            .collect::<PostProcResult<_>>()?;
        let ans: Vec<CentroidRecord> = per_patch.into_iter().flatten().collect();
        log::info!("detected {} nuclei", ans.len());
        Ok(ans)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nucleus::testing::synthetic;
    use crate::nucleus::{PostProcError, RawPrediction};
    use crate::slide::{ImagePyramid, RgbRegion};
    use ndarray::Array3;
    use std::collections::HashMap;

    #[test]
    fn test_grid_locations() {
        let g = PatchGrid::new((100, 200), (300, 100), 128);
        assert_eq!(g.locations(), vec![(100, 200), (228, 200), (356, 200)]);
        assert_eq!(g.offset_of((228, 200)), (128, 0));
        let g = PatchGrid {
            stride: 64,
            ..PatchGrid::new((0, 0), (128, 128), 128)
        };
        assert_eq!(g.locations().len(), 4);
    }

    /// 以位置查表的推理器.
    struct Table(HashMap<XY, RawPrediction>);

    impl Segmenter for Table {
        fn predict(&self, location: XY, _patch: &RgbRegion) -> PostProcResult<RawPrediction> {
            self.0
                .get(&location)
                .cloned()
                .ok_or_else(|| PostProcError::MissingPrediction(format!("{location:?}")))
        }
    }

    fn setup() -> (ImagePyramid, PatchGrid, NucleusDetector<Table>) {
        let slide = ImagePyramid::from_base(Array3::zeros((256, 256, 3)), 256, 1);
        let grid = PatchGrid::new((64, 64), (160, 80), 80);
        let mut t = HashMap::new();
        t.insert((64, 64), synthetic(80, &[(20, 20, 9, 1)]));
        t.insert((144, 64), synthetic(80, &[(56, 54, 10, 3), (20, 20, 9, 4)]));
        let det = NucleusDetector::new(Table(t), InstanceMapConfig::default());
        (slide, grid, det)
    }

    #[test]
    fn test_detect_applies_patch_offsets() {
        let (slide, grid, det) = setup();
        let mut out = det.detect(&slide, &grid).unwrap();
        assert_eq!(out.len(), 3);
        // 第一个 patch 的偏移为 (0, 0), 第二个为 (80, 0).
        assert_eq!(out[0], CentroidRecord { x: 20, y: 20, kind: 1 });
        out.sort_by_key(|r| (r.x, r.y));
        assert_eq!(out[1], CentroidRecord { x: 100, y: 20, kind: 4 });
        assert_eq!(out[2], CentroidRecord { x: 134, y: 56, kind: 3 });
    }

    #[cfg(feature = "rayon")]
    #[test]
    fn test_parallel_detection_matches_sequential() {
        let (slide, grid, det) = setup();
        assert_eq!(
            det.detect(&slide, &grid).unwrap(),
            det.par_detect(&slide, &grid).unwrap()
        );
    }

    #[test]
    fn test_missing_prediction_is_an_error() {
        let (slide, _, det) = setup();
        let grid = PatchGrid::new((0, 0), (10, 10), 80);
        assert!(det.detect(&slide, &grid).is_err());
    }
}
