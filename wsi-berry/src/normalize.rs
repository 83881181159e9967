//! 显示前的强度归一化.

use crate::slide::RgbRegion;
use image::RgbImage;
use ndarray::{Array3, ArrayView3, ArrayViewMut2, Axis, Zip};

/// 减均值、除标准差的强度归一化. 输入为通道在前的 `(c, h, w)` 数组.
///
/// 标准差按总体标准差计算; 标准差为 0 时视为 1.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq)]
pub struct NormalizeIntensity {
    /// 只用非零元素计算统计量, 也只更新非零元素.
    pub nonzero: bool,

    /// 每个通道单独计算统计量.
    pub channel_wise: bool,
}

/// 总体均值与标准差. 没有参与统计的元素时返回 `None`.
fn mean_std<'a, I: Iterator<Item = &'a f32> + Clone>(it: I) -> Option<(f32, f32)> {
    let (mut n, mut sum) = (0usize, 0f64);
    for &v in it.clone() {
        n += 1;
        sum += v as f64;
    }
    if n == 0 {
        return None;
    }
    let mean = sum / n as f64;
    let var = it.map(|&v| (v as f64 - mean).powi(2)).sum::<f64>() / n as f64;
    let std = var.sqrt();
    Some((mean as f32, if std == 0.0 { 1.0 } else { std as f32 }))
}

impl NormalizeIntensity {
    /// 就地归一化 `chw`.
    pub fn apply_inplace(&self, chw: &mut Array3<f32>) {
        if self.channel_wise {
            for ch in chw.axis_iter_mut(Axis(0)) {
                self.normalize_part(ch);
            }
        } else {
            let Some((mean, std)) = self.stats(chw.iter()) else {
                return;
            };
            let nonzero = self.nonzero;
            chw.mapv_inplace(|v| if nonzero && v == 0.0 { v } else { (v - mean) / std });
        }
    }

    /// 返回归一化后的副本.
    pub fn apply(&self, chw: &ArrayView3<f32>) -> Array3<f32> {
        let mut out = chw.to_owned();
        self.apply_inplace(&mut out);
        out
    }

    fn stats<'a, I: Iterator<Item = &'a f32> + Clone>(&self, it: I) -> Option<(f32, f32)> {
        if self.nonzero {
            mean_std(it.filter(|v| **v != 0.0))
        } else {
            mean_std(it)
        }
    }

    fn normalize_part(&self, mut ch: ArrayViewMut2<f32>) {
        let Some((mean, std)) = self.stats(ch.iter()) else {
            return;
        };
        let nonzero = self.nonzero;
        ch.mapv_inplace(|v| if nonzero && v == 0.0 { v } else { (v - mean) / std });
    }
}

/// `(h, w, c)` 转为 `(c, h, w)`.
pub fn channel_first<T: Clone>(hwc: ArrayView3<T>) -> Array3<T> {
    hwc.permuted_axes([2, 0, 1]).as_standard_layout().into_owned()
}

/// `(c, h, w)` 转为 `(h, w, c)`.
pub fn channel_last<T: Clone>(chw: ArrayView3<T>) -> Array3<T> {
    chw.permuted_axes([1, 2, 0]).as_standard_layout().into_owned()
}

/// 把 RGB 区域转为通道在前的 `f32` 数组.
pub fn region_to_chw(region: &RgbRegion) -> Array3<f32> {
    channel_first(region.view()).mapv(f32::from)
}

/// 把 `(c, h, w)` 数组整体线性拉伸到 `0..=255` 并转为可保存的 RGB 图像.
///
/// 单通道数组按灰度复制到三个通道. 通道数不为 1 或 3 时返回 `None`.
/// 所有元素相等时输出全黑图像.
pub fn to_display(chw: &ArrayView3<f32>) -> Option<RgbImage> {
    let (c, h, w) = chw.dim();
    if c != 1 && c != 3 {
        return None;
    }
    let (lo, hi) = chw
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let range = hi - lo;
    let scale = |v: f32| {
        if range > 0.0 {
            ((v - lo) / range * 255.0).round() as u8
        } else {
            0
        }
    };

    let mut hwc = Array3::<u8>::zeros((h, w, 3));
    for out_c in 0..3 {
        let src = chw.index_axis(Axis(0), if c == 1 { 0 } else { out_c });
        Zip::from(hwc.index_axis_mut(Axis(2), out_c))
            .and(&src)
            .for_each(|d, &s| *d = scale(s));
    }
    RgbImage::from_raw(w as u32, h as u32, hwc.into_raw_vec())
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::{array, Array};

    fn assert_close(a: f32, b: f32) {
        assert!((a - b).abs() < 1e-5, "{a} != {b}");
    }

    #[test]
    fn test_normalize_global() {
        let mut x = Array::from_shape_vec((1, 2, 2), vec![1.0, 2.0, 3.0, 4.0]).unwrap();
        NormalizeIntensity::default().apply_inplace(&mut x);
        let s = 1.25f32.sqrt();
        assert_close(x[(0, 0, 0)], -1.5 / s);
        assert_close(x[(0, 1, 1)], 1.5 / s);
        assert_close(x.sum(), 0.0);
    }

    #[test]
    fn test_constant_input_divides_by_one() {
        let x = Array3::from_elem((2, 3, 3), 7.0f32);
        let y = NormalizeIntensity::default().apply(&x.view());
        assert!(y.iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_nonzero_keeps_zeros() {
        let x = array![[[0.0f32, 2.0], [4.0, 0.0]]];
        let y = NormalizeIntensity {
            nonzero: true,
            channel_wise: false,
        }
        .apply(&x.view());
        assert_eq!(y[(0, 0, 0)], 0.0);
        assert_eq!(y[(0, 1, 1)], 0.0);
        assert_close(y[(0, 0, 1)], -1.0);
        assert_close(y[(0, 1, 0)], 1.0);
    }

    #[test]
    fn test_channel_wise() {
        let x = array![[[0.0f32, 2.0]], [[10.0, 30.0]]];
        let y = NormalizeIntensity {
            nonzero: false,
            channel_wise: true,
        }
        .apply(&x.view());
        assert_close(y[(0, 0, 0)], -1.0);
        assert_close(y[(1, 0, 1)], 1.0);
    }

    #[test]
    fn test_axis_moves() {
        let hwc = Array3::from_shape_fn((2, 3, 3), |(y, x, c)| (y * 100 + x * 10 + c) as u8);
        let chw = channel_first(hwc.view());
        assert_eq!(chw.dim(), (3, 2, 3));
        assert_eq!(chw[(2, 1, 0)], 102);
        assert_eq!(channel_last(chw.view()), hwc);
    }

    #[test]
    fn test_to_display() {
        let x = array![[[-1.0f32, 1.0]]];
        let img = to_display(&x.view()).unwrap();
        assert_eq!(img.dimensions(), (2, 1));
        assert_eq!(img.get_pixel(0, 0).0, [0, 0, 0]);
        assert_eq!(img.get_pixel(1, 0).0, [255, 255, 255]);
        assert!(to_display(&Array3::<f32>::zeros((2, 1, 1)).view()).is_none());
    }
}
