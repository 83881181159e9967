//! npz 归档形式存储的金字塔.

use super::{
    check_request, crop_level, to_level_coords, PyramidRead, ReadError, ReadResult, RgbRegion,
};
use crate::consts::CHANNELS;
use crate::{Size2d, XY};
use ndarray::{Array3, Ix3, OwnedRepr};
use ndarray_npy::NpzReader;
use std::fs::File;
use std::path::Path;

/// 由 `level_0.npy`, `level_1.npy`, ... 组成的 npz 金字塔.
///
/// 每一层都是形状为 `(h, w, 3)` 的 `u8` 数组. 层级编号必须从 0 开始连续.
/// 各层缩放倍数由第 0 层与该层宽度之比确定.
#[derive(Clone, Debug)]
pub struct NpzPyramid {
    levels: Vec<Array3<u8>>,
}

/// 解析 npz 内部文件名 `level_{i}` 或 `level_{i}.npy`, 得到层级编号.
fn parse_level_name(name: &str) -> Option<usize> {
    let stem = name.strip_suffix(".npy").unwrap_or(name);
    stem.strip_prefix("level_")?.parse().ok()
}

impl NpzPyramid {
    /// 打开 npz 金字塔并解码所有层级.
    pub fn open<P: AsRef<Path>>(path: P) -> ReadResult<Self> {
        let mut npz = NpzReader::new(File::open(path.as_ref())?)?;
        let mut named: Vec<(usize, String)> = npz
            .names()?
            .into_iter()
            .filter_map(|n| parse_level_name(&n).map(|l| (l, n)))
            .collect();
        named.sort_unstable_by_key(|(l, _)| *l);

        let mut levels = Vec::with_capacity(named.len());
        for (expect, (level, name)) in named.into_iter().enumerate() {
            if level != expect {
                // 层级不连续, 后面的层级无法确定缩放倍数.
                log::warn!("npz pyramid: missing level {expect}, ignoring level {level} and above");
                break;
            }
            let arr = npz.by_name::<OwnedRepr<u8>, Ix3>(&name)?;
            levels.push(arr);
        }
        Self::from_levels(levels)
    }

    /// 直接从各层数据构造. 至少需要一层, 每层最后一维必须为 3.
    pub fn from_levels(levels: Vec<Array3<u8>>) -> ReadResult<Self> {
        if levels.is_empty() {
            return Err(ReadError::LevelOutOfRange(0, 0));
        }
        if let Some(bad) = levels.iter().find(|a| a.dim().2 != CHANNELS) {
            return Err(ReadError::BadShape(bad.shape().to_vec()));
        }
        Ok(Self { levels })
    }
}

impl PyramidRead for NpzPyramid {
    #[inline]
    fn level_count(&self) -> usize {
        self.levels.len()
    }

    fn level_dimensions(&self, level: usize) -> Option<Size2d> {
        self.levels.get(level).map(|a| {
            let (h, w, _) = a.dim();
            (w, h)
        })
    }

    fn level_downsample(&self, level: usize) -> Option<f64> {
        let (w0, _) = self.level_dimensions(0)?;
        let (w, _) = self.level_dimensions(level)?;
        Some(if w == 0 { 1.0 } else { w0 as f64 / w as f64 })
    }

    fn read_region(&self, location: XY, level: usize, size: Size2d) -> ReadResult<RgbRegion> {
        let downsample = check_request(self, level, size)?;
        let at = to_level_coords(location, downsample);
        Ok(crop_level(self.levels[level].view(), at, size))
    }
}
