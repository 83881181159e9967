//! 读取得到的 RGB 区域.

use crate::consts::{BACKGROUND_FILL, CHANNELS};
use crate::{Idx2d, Size2d, XY};
use image::{ImageResult, RgbImage};
use ndarray::{s, Array3, ArrayView3, ArrayViewMut3, Axis};
use std::path::Path;

/// 拥有所有权的 RGB 图像区域, 底层形状为 `(h, w, 3)`.
#[derive(Clone, Debug, PartialEq)]
pub struct RgbRegion {
    data: Array3<u8>,
}

impl RgbRegion {
    /// 由 `(h, w, 3)` 数组直接构造.
    ///
    /// 当最后一维不为 3 时返回 `None`.
    pub fn from_array(data: Array3<u8>) -> Option<Self> {
        (data.shape()[2] == CHANNELS).then_some(Self { data })
    }

    /// 构造宽 `w` 高 `h` 的纯背景区域.
    #[inline]
    pub fn background((w, h): Size2d) -> Self {
        Self {
            data: Array3::from_elem((h, w, CHANNELS), BACKGROUND_FILL),
        }
    }

    /// 区域尺寸 (宽, 高).
    #[inline]
    pub fn size(&self) -> Size2d {
        let (h, w, _) = self.data.dim();
        (w, h)
    }

    /// 区域宽度.
    #[inline]
    pub fn width(&self) -> usize {
        self.data.dim().1
    }

    /// 区域高度.
    #[inline]
    pub fn height(&self) -> usize {
        self.data.dim().0
    }

    /// 获得底层数据的不可变视图.
    #[inline]
    pub fn view(&self) -> ArrayView3<'_, u8> {
        self.data.view()
    }

    /// 获得底层数据的可变视图.
    #[inline]
    pub fn view_mut(&mut self) -> ArrayViewMut3<'_, u8> {
        self.data.view_mut()
    }

    /// 直接获得底层数据.
    #[inline]
    pub fn into_raw(self) -> Array3<u8> {
        self.data
    }

    /// 获取 `(x, y)` 处的像素. 越界时返回 `None`.
    pub fn pixel(&self, (x, y): XY) -> Option<[u8; 3]> {
        if x >= self.width() || y >= self.height() {
            return None;
        }
        Some([
            self.data[(y, x, 0)],
            self.data[(y, x, 1)],
            self.data[(y, x, 2)],
        ])
    }

    /// 将 `src` 中 `(h, w)` 起点开始的、与 `self` 重合的部分复制到 `self` 的
    /// `dst` 起点处. 用于从整层数据中切出区域.
    pub(crate) fn blit_from(&mut self, src: ArrayView3<u8>, (sh, sw): Idx2d, (dh, dw): Idx2d) {
        let (src_h, src_w, _) = src.dim();
        let (h, w) = (self.height(), self.width());
        if sh >= src_h || sw >= src_w || dh >= h || dw >= w {
            return;
        }
        let rows = (src_h - sh).min(h - dh);
        let cols = (src_w - sw).min(w - dw);
        self.data
            .slice_mut(s![dh..dh + rows, dw..dw + cols, ..])
            .assign(&src.slice(s![sh..sh + rows, sw..sw + cols, ..]));
    }

    /// 平均亮度 (ITU-R 601 luma), 取值 `[0, 255]`. 空区域返回 `None`.
    pub fn mean_luma(&self) -> Option<f64> {
        let n = self.width() * self.height();
        if n == 0 {
            return None;
        }
        let total: f64 = self
            .data
            .lanes(Axis(2))
            .into_iter()
            .map(|p| luma([p[0], p[1], p[2]]))
            .sum();
        Some(total / n as f64)
    }

    /// 转换为 `image` 的 RGB 图像.
    pub fn to_image(&self) -> RgbImage {
        let (w, h) = self.size();
        let mut buf = RgbImage::new(w as u32, h as u32);
        for (x, y, px) in buf.enumerate_pixels_mut() {
            let (x, y) = (x as usize, y as usize);
            *px = image::Rgb([
                self.data[(y, x, 0)],
                self.data[(y, x, 1)],
                self.data[(y, x, 2)],
            ]);
        }
        buf
    }

    /// 从 `image` 的 RGB 图像构造.
    pub fn from_image(img: &RgbImage) -> Self {
        let (w, h) = (img.width() as usize, img.height() as usize);
        let data = Array3::from_shape_vec((h, w, CHANNELS), img.as_raw().clone())
            .expect("RgbImage 的底层缓冲区总是 (h, w, 3) 行优先布局");
        Self { data }
    }

    /// 保存到 `path`. 图像格式由扩展名决定.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> ImageResult<()> {
        self.to_image().save(path)
    }
}

/// ITU-R 601 亮度.
#[inline]
pub(crate) fn luma([r, g, b]: [u8; 3]) -> f64 {
    0.299 * r as f64 + 0.587 * g as f64 + 0.114 * b as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_background_region() {
        let r = RgbRegion::background((4, 3));
        assert_eq!(r.size(), (4, 3));
        assert_eq!(r.pixel((3, 2)), Some([255, 255, 255]));
        assert_eq!(r.pixel((4, 0)), None);
        assert!((r.mean_luma().unwrap() - 255.0).abs() < 1e-9);
    }

    #[test]
    fn test_blit_clips_to_both_sides() {
        let src = Array3::from_shape_fn((4, 4, 3), |(h, w, _)| (h * 4 + w) as u8);
        let mut dst = RgbRegion::background((3, 3));
        // 源从 (2, 2) 开始只剩 2x2, 目标从 (1, 1) 开始也只剩 2x2.
        dst.blit_from(src.view(), (2, 2), (1, 1));
        assert_eq!(dst.pixel((0, 0)), Some([255; 3]));
        assert_eq!(dst.pixel((1, 1)), Some([10; 3]));
        assert_eq!(dst.pixel((2, 2)), Some([15; 3]));
        assert_eq!(dst.pixel((2, 0)), Some([255; 3]));
    }

    #[test]
    fn test_image_conversion_keeps_layout() {
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(1, 0, image::Rgb([1, 2, 3]));
        let r = RgbRegion::from_image(&img);
        assert_eq!(r.pixel((1, 0)), Some([1, 2, 3]));
        assert_eq!(r.to_image(), img);
    }
}
