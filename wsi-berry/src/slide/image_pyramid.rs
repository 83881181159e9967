//! 基于 `image` 解码的内存金字塔.

use super::{check_request, crop_level, to_level_coords, PyramidRead, ReadResult, RgbRegion};
use crate::consts::CHANNELS;
use crate::{Size2d, XY};
use ndarray::Array3;
use std::path::Path;

/// 整幅图像解码进内存后, 逐层 2 倍均值降采样构建的金字塔.
///
/// 第 `i` 层的缩放倍数为 `2^i`. 适合普通光栅图像 (png, jpeg, 单页 tiff 等)
/// 以及测试场景.
#[derive(Clone, Debug)]
pub struct ImagePyramid {
    levels: Vec<Array3<u8>>,
}

impl ImagePyramid {
    /// 默认最短边下限. 降采样后短边小于该值时停止.
    pub const DEFAULT_MIN_SIDE: usize = 256;

    /// 默认最大层数.
    pub const DEFAULT_MAX_LEVELS: usize = 8;

    /// 打开光栅图像文件并按默认参数构建金字塔.
    pub fn open<P: AsRef<Path>>(path: P) -> ReadResult<Self> {
        let img = image::open(path.as_ref())?.into_rgb8();
        let base = RgbRegion::from_image(&img).into_raw();
        Ok(Self::from_base(
            base,
            Self::DEFAULT_MIN_SIDE,
            Self::DEFAULT_MAX_LEVELS,
        ))
    }

    /// 从第 0 层数据 (形状 `(h, w, 3)`) 构建金字塔.
    ///
    /// 只要下一层短边不小于 `min_side` 且层数不超过 `max_levels`, 就继续降采样.
    /// 第 0 层总是存在.
    ///
    /// # 注意
    ///
    /// `base` 最后一维不为 3 时程序 panic.
    pub fn from_base(base: Array3<u8>, min_side: usize, max_levels: usize) -> Self {
        assert_eq!(base.dim().2, CHANNELS, "金字塔底层必须为 RGB 三通道");
        let mut levels = vec![base];
        while levels.len() < max_levels.max(1) {
            let (h, w, _) = levels[levels.len() - 1].dim();
            let (nh, nw) = (h / 2, w / 2);
            if nh.min(nw) < min_side.max(1) {
                break;
            }
            let next = downsample2(&levels[levels.len() - 1]);
            levels.push(next);
        }
        Self { levels }
    }
}

/// 2x2 均值降采样. 奇数边的最后一行/列被舍弃.
fn downsample2(src: &Array3<u8>) -> Array3<u8> {
    let (h, w, c) = src.dim();
    Array3::from_shape_fn((h / 2, w / 2, c), |(y, x, ch)| {
        let sum = src[(2 * y, 2 * x, ch)] as u32
            + src[(2 * y, 2 * x + 1, ch)] as u32
            + src[(2 * y + 1, 2 * x, ch)] as u32
            + src[(2 * y + 1, 2 * x + 1, ch)] as u32;
        // 四舍五入.
        ((sum + 2) / 4) as u8
    })
}

impl PyramidRead for ImagePyramid {
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
        (level < self.levels.len()).then(|| (1u64 << level) as f64)
    }

    fn read_region(&self, location: XY, level: usize, size: Size2d) -> ReadResult<RgbRegion> {
        let downsample = check_request(self, level, size)?;
        let at = to_level_coords(location, downsample);
        Ok(crop_level(self.levels[level].view(), at, size))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::slide::ReadError;

    fn gradient(h: usize, w: usize) -> Array3<u8> {
        Array3::from_shape_fn((h, w, 3), |(y, x, c)| ((x + y + c) % 256) as u8)
    }

    #[test]
    fn test_levels_stop_at_min_side() {
        let p = ImagePyramid::from_base(gradient(64, 100), 16, 8);
        // 64x100 -> 32x50 -> 16x25 -> (8 < 16) stop
        assert_eq!(p.level_count(), 3);
        assert_eq!(p.level_dimensions_all(), vec![(100, 64), (50, 32), (25, 16)]);
        assert_eq!(p.level_downsample(2), Some(4.0));
        assert_eq!(p.level_downsample(3), None);
    }

    #[test]
    fn test_max_levels_respected() {
        let p = ImagePyramid::from_base(gradient(64, 64), 1, 2);
        assert_eq!(p.level_count(), 2);
    }

    #[test]
    fn test_downsample_is_box_mean() {
        let mut base = Array3::zeros((2, 2, 3));
        base[(0, 0, 0)] = 10;
        base[(0, 1, 0)] = 20;
        base[(1, 0, 0)] = 30;
        base[(1, 1, 0)] = 40;
        let d = downsample2(&base);
        assert_eq!(d.dim(), (1, 1, 3));
        assert_eq!(d[(0, 0, 0)], 25);
        assert_eq!(d[(0, 0, 1)], 0);
    }

    #[test]
    fn test_read_region_uses_level0_location() {
        let p = ImagePyramid::from_base(gradient(32, 32), 4, 8);
        let r = p.read_region((8, 4), 1, (4, 4)).unwrap();
        // 第 1 层坐标为 (4, 2).
        let lvl1 = downsample2(&gradient(32, 32));
        assert_eq!(
            r.pixel((0, 0)).unwrap(),
            [lvl1[(2, 4, 0)], lvl1[(2, 4, 1)], lvl1[(2, 4, 2)]]
        );
    }

    #[test]
    fn test_read_region_pads_out_of_bounds() {
        let p = ImagePyramid::from_base(gradient(8, 8), 8, 1);
        let r = p.read_region((6, 6), 0, (4, 4)).unwrap();
        assert_eq!(r.pixel((0, 0)), Some([12, 13, 14]));
        assert_eq!(r.pixel((1, 1)), Some([14, 15, 16]));
        assert_eq!(r.pixel((2, 2)), Some([255; 3]));
    }

    #[test]
    fn test_read_region_errors() {
        let p = ImagePyramid::from_base(gradient(8, 8), 8, 1);
        assert!(matches!(
            p.read_region((0, 0), 1, (1, 1)),
            Err(ReadError::LevelOutOfRange(1, 1))
        ));
        assert!(matches!(
            p.read_region((0, 0), 0, (0, 3)),
            Err(ReadError::EmptyRegion)
        ));
    }
}
