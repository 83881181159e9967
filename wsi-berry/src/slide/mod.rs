//! 金字塔 (多分辨率) 全切片图像的读取.
//!
//! 所有后端都实现 [`PyramidRead`]. 与常见 WSI 库的约定一致, `read_region`
//! 的起点 `location` 总是以 **第 0 层** (最高分辨率) 像素坐标表示, 而区域大小
//! `size` 以 **目标层级** 像素表示.

mod backend;
mod error;
mod image_pyramid;
mod npz_pyramid;
mod region;

pub use backend::{open_slide, AnySlide, Backend};
pub use error::ReadError;
pub use image_pyramid::ImagePyramid;
pub use npz_pyramid::NpzPyramid;
pub use region::RgbRegion;

pub(crate) use region::luma;

use crate::{Size2d, XY};
use ndarray::ArrayView3;

/// 切片读取结果.
pub type ReadResult<T> = Result<T, ReadError>;

/// 可按层级读取矩形区域的金字塔图像.
pub trait PyramidRead: Send + Sync {
    /// 金字塔层数.
    fn level_count(&self) -> usize;

    /// 第 `level` 层的尺寸 (宽, 高). 越界时返回 `None`.
    fn level_dimensions(&self, level: usize) -> Option<Size2d>;

    /// 第 `level` 层相对第 0 层的缩放倍数. 越界时返回 `None`.
    fn level_downsample(&self, level: usize) -> Option<f64>;

    /// 从第 0 层坐标 `location` 开始, 在第 `level` 层读取大小为 `size` 的区域.
    ///
    /// 超出图像范围的像素以白色背景填充.
    fn read_region(&self, location: XY, level: usize, size: Size2d) -> ReadResult<RgbRegion>;

    /// 所有层级的尺寸, 按层级升序.
    fn level_dimensions_all(&self) -> Vec<Size2d> {
        (0..self.level_count())
            .filter_map(|l| self.level_dimensions(l))
            .collect()
    }

    /// 检查层级合法并返回该层尺寸.
    fn checked_level(&self, level: usize) -> ReadResult<Size2d> {
        self.level_dimensions(level)
            .ok_or(ReadError::LevelOutOfRange(level, self.level_count()))
    }
}

impl<R: PyramidRead + ?Sized> PyramidRead for &R {
    #[inline]
    fn level_count(&self) -> usize {
        (**self).level_count()
    }

    #[inline]
    fn level_dimensions(&self, level: usize) -> Option<Size2d> {
        (**self).level_dimensions(level)
    }

    #[inline]
    fn level_downsample(&self, level: usize) -> Option<f64> {
        (**self).level_downsample(level)
    }

    #[inline]
    fn read_region(&self, location: XY, level: usize, size: Size2d) -> ReadResult<RgbRegion> {
        (**self).read_region(location, level, size)
    }
}

impl<R: PyramidRead + ?Sized> PyramidRead for std::sync::Arc<R> {
    #[inline]
    fn level_count(&self) -> usize {
        (**self).level_count()
    }

    #[inline]
    fn level_dimensions(&self, level: usize) -> Option<Size2d> {
        (**self).level_dimensions(level)
    }

    #[inline]
    fn level_downsample(&self, level: usize) -> Option<f64> {
        (**self).level_downsample(level)
    }

    #[inline]
    fn read_region(&self, location: XY, level: usize, size: Size2d) -> ReadResult<RgbRegion> {
        (**self).read_region(location, level, size)
    }
}

/// 将第 0 层坐标换算到缩放倍数为 `downsample` 的层级坐标 (向下取整).
#[inline]
pub(crate) fn to_level_coords((x, y): XY, downsample: f64) -> XY {
    (
        (x as f64 / downsample).floor() as usize,
        (y as f64 / downsample).floor() as usize,
    )
}

/// 层级坐标 `x` 对应的最小第 0 层坐标, 满足经 [`to_level_coords`] 换算后恰好回到 `x`.
///
/// 缩放倍数不是整数时 `x * downsample` 有舍入误差, 因此在估计值附近逐个校正.
pub(crate) fn to_level0_coord(x: usize, downsample: f64) -> usize {
    let back = |x0: usize| (x0 as f64 / downsample).floor() as usize;
    let mut x0 = (x as f64 * downsample).ceil() as usize;
    while x0 > 0 && back(x0 - 1) >= x {
        x0 -= 1;
    }
    while back(x0) < x {
        x0 += 1;
    }
    x0
}

/// 从整层数据 `level_data` (形状 `(h, w, 3)`) 中切出层级坐标 `(x, y)` 起、大小为
/// `size` 的区域. 越界部分以背景填充.
pub(crate) fn crop_level(level_data: ArrayView3<u8>, (x, y): XY, size: Size2d) -> RgbRegion {
    let mut region = RgbRegion::background(size);
    region.blit_from(level_data, (y, x), (0, 0));
    region
}

/// 通用参数检查: 层级存在且区域非空.
pub(crate) fn check_request<R: PyramidRead + ?Sized>(
    reader: &R,
    level: usize,
    (w, h): Size2d,
) -> ReadResult<f64> {
    reader.checked_level(level)?;
    if w == 0 || h == 0 {
        return Err(ReadError::EmptyRegion);
    }
    // 层级存在时缩放倍数一定存在.
    Ok(reader.level_downsample(level).unwrap_or(1.0))
}
