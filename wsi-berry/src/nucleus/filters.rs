//! 二维滤波: 通道 argmax, 最值归一化, 可分离 sobel 与高斯滤波.

use super::{PostProcError, PostProcResult};
use ndarray::{Array2, ArrayView2, ArrayView3, Axis};

/// 越界下标的延拓方式.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Border {
    /// 以边缘像素为轴镜像, 边缘像素不重复: `d c b | a b c d | c b a`.
    Reflect,

    /// 以像素边界为轴镜像, 边缘像素重复: `c b a | a b c d | d c b`.
    Symmetric,
}

impl Border {
    /// 把可能越界的下标 `i` 映射到 `[0, n)`. `n` 不能为 0.
    pub fn index(self, i: isize, n: usize) -> usize {
        debug_assert!(n > 0);
        let n = n as isize;
        let m = match self {
            Border::Reflect => {
                if n == 1 {
                    return 0;
                }
                let period = 2 * (n - 1);
                let m = i.rem_euclid(period);
                if m >= n {
                    period - m
                } else {
                    m
                }
            }
            Border::Symmetric => {
                let period = 2 * n;
                let m = i.rem_euclid(period);
                if m >= n {
                    period - 1 - m
                } else {
                    m
                }
            }
        };
        m as usize
    }
}

/// 沿通道轴 (第 0 维) 取最大值所在的通道. 并列时取下标最小者.
///
/// softmax 不改变各通道的大小顺序, 因此无需先做 softmax.
pub fn argmax_channels(logits: ArrayView3<f32>) -> Array2<u8> {
    let (_, h, w) = logits.dim();
    Array2::from_shape_fn((h, w), |(y, x)| {
        let mut best = 0usize;
        let mut best_v = f32::NEG_INFINITY;
        for (c, &v) in logits.slice(ndarray::s![.., y, x]).iter().enumerate() {
            if v > best_v {
                best = c;
                best_v = v;
            }
        }
        best as u8
    })
}

/// 最值归一化到 `[0, 1]`. 常数输入归一化为全 0.
pub fn minmax(a: ArrayView2<f32>) -> Array2<f32> {
    let (lo, hi) = a
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let range = hi - lo;
    if range > 0.0 {
        a.mapv(|v| (v - lo) / range)
    } else {
        Array2::zeros(a.raw_dim())
    }
}

/// 一维完全卷积, 输出长度为 `a.len() + k.len() - 1`.
fn convolve_full(a: &[f32], k: &[f32]) -> Vec<f32> {
    let mut out = vec![0.0; a.len() + k.len() - 1];
    for (i, &x) in a.iter().enumerate() {
        for (j, &y) in k.iter().enumerate() {
            out[i + j] += x * y;
        }
    }
    out
}

/// 构建大小为 `size` 的归一化 sobel 差分核与平滑核.
///
/// 从 `[-1/2, 0, 1/2]` 与 `[1/4, 1/2, 1/4]` 出发, 反复与 `[1/4, 1/2, 1/4]`
/// 卷积, 每次长度增加 2, 直到长度为 `size`.
pub fn sobel_kernels(size: usize) -> PostProcResult<(Vec<f32>, Vec<f32>)> {
    if size < 3 || size % 2 == 0 {
        return Err(PostProcError::InvalidKernelSize(size));
    }
    const EXPANSION: [f32; 3] = [0.25, 0.5, 0.25];
    let mut diff = vec![-0.5, 0.0, 0.5];
    let mut smooth = EXPANSION.to_vec();
    for _ in 0..(size - 3) / 2 {
        diff = convolve_full(&diff, &EXPANSION);
        smooth = convolve_full(&smooth, &EXPANSION);
    }
    Ok((diff, smooth))
}

/// 沿 `axis` 做一维相关 (不翻转核), 核中心位于 `kernel.len() / 2`.
pub fn correlate_axis(
    a: ArrayView2<f32>,
    kernel: &[f32],
    axis: Axis,
    border: Border,
) -> Array2<f32> {
    let (h, w) = a.dim();
    if h == 0 || w == 0 {
        return a.to_owned();
    }
    let r = (kernel.len() / 2) as isize;
    Array2::from_shape_fn((h, w), |(y, x)| {
        kernel
            .iter()
            .enumerate()
            .map(|(j, &k)| {
                let d = j as isize - r;
                let v = if axis == Axis(0) {
                    a[(border.index(y as isize + d, h), x)]
                } else {
                    a[(y, border.index(x as isize + d, w))]
                };
                k * v
            })
            .sum()
    })
}

/// 大小为 `size` 的 sobel 梯度, 镜像 (`Reflect`) 延拓. 返回 `(∂/∂x, ∂/∂y)`.
pub fn sobel_gradients(
    a: ArrayView2<f32>,
    size: usize,
) -> PostProcResult<(Array2<f32>, Array2<f32>)> {
    let (diff, smooth) = sobel_kernels(size)?;
    let gx = correlate_axis(
        correlate_axis(a, &diff, Axis(1), Border::Reflect).view(),
        &smooth,
        Axis(0),
        Border::Reflect,
    );
    let gy = correlate_axis(
        correlate_axis(a, &diff, Axis(0), Border::Reflect).view(),
        &smooth,
        Axis(1),
        Border::Reflect,
    );
    Ok((gx, gy))
}

/// 截断于 `4 sigma` 的归一化一维高斯核.
pub fn gaussian_kernel(sigma: f32) -> Vec<f32> {
    if sigma <= 0.0 {
        return vec![1.0];
    }
    let radius = (4.0 * sigma + 0.5) as isize;
    let mut k: Vec<f32> = (-radius..=radius)
        .map(|i| (-0.5 * (i as f32 / sigma).powi(2)).exp())
        .collect();
    let s: f32 = k.iter().sum();
    k.iter_mut().for_each(|v| *v /= s);
    k
}

/// 可分离高斯滤波, 对称 (`Symmetric`) 延拓.
pub fn gaussian_filter(a: ArrayView2<f32>, sigma: f32) -> Array2<f32> {
    let k = gaussian_kernel(sigma);
    let tmp = correlate_axis(a, &k, Axis(0), Border::Symmetric);
    correlate_axis(tmp.view(), &k, Axis(1), Border::Symmetric)
}
