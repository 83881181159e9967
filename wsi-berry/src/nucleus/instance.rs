//! HoVerNet 风格的实例图后处理与细胞核类别判定.

use super::filters::{argmax_channels, gaussian_filter, minmax, sobel_gradients};
use super::morph::{
    disk, is_region_border, label_components, opening, remove_small_labels,
    remove_small_objects, Connectivity,
};
use super::watershed::watershed;
use super::{PostProcError, PostProcResult, RawPrediction};
use crate::consts::hover::*;
use crate::{Idx2d, XY};
use ndarray::{Array2, ArrayView3, Axis, Zip};
use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 实例图后处理参数.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct InstanceMapConfig {
    /// sobel 核大小, 不小于 3 的奇数.
    pub sobel_kernel_size: usize,

    /// 边界强度不低于该值的像素不作为 marker.
    pub marker_threshold: f32,

    /// marker 开运算所用圆盘的半径.
    pub marker_radius: usize,

    /// 前景区域与 marker 的最小像素个数.
    pub min_object_size: usize,

    /// 距离图高斯平滑的 sigma.
    pub distance_sigma: f32,
}

impl Default for InstanceMapConfig {
    fn default() -> Self {
        Self {
            sobel_kernel_size: SOBEL_KERNEL_SIZE,
            marker_threshold: MARKER_THRESHOLD,
            marker_radius: MARKER_RADIUS,
            min_object_size: MIN_OBJECT_SIZE,
            distance_sigma: DISTANCE_SIGMA,
        }
    }
}

/// 单个细胞核实例的描述. 坐标均为 patch 局部坐标.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct InstanceInfo {
    /// 外接矩形 `[(h_min, w_min), (h_max, w_max)]`, 上界不含.
    pub bbox: [Idx2d; 2],

    /// 质心 `[x, y]`, 即所有像素坐标的均值.
    pub centroid: [f64; 2],

    /// 边缘像素 `(x, y)`, 行优先顺序.
    pub contour: Vec<XY>,

    /// 像素个数.
    pub area: usize,

    /// 细胞核类别, 0 表示尚未判定或判定为背景.
    pub kind: u8,

    /// 类别置信度: 该类别像素数占实例面积的比例.
    pub type_probability: f64,
}

/// 实例标记图及每个实例的描述. 实例编号不一定连续.
#[derive(Clone, Debug, Default)]
pub struct InstanceMap {
    /// `(h, w)` 标记图, 0 为背景.
    pub labels: Array2<u32>,

    /// 实例编号到描述的映射, 按编号升序.
    pub info: BTreeMap<u32, InstanceInfo>,
}

impl InstanceMap {
    /// 实例个数.
    #[inline]
    pub fn len(&self) -> usize {
        self.info.len()
    }

    /// 是否没有实例.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.info.is_empty()
    }
}

/// 由原始预测图生成实例图.
///
/// 1. 前景/背景 logits 取 argmax 得到前景掩膜, 去除小区域;
/// 2. 水平/竖直距离图分别最值归一化, 求 x/y 方向 sobel 梯度并归一化,
///    取 `max(1 - gx, 1 - gy) - (1 - mask)` (截断到非负) 作为边界强度;
/// 3. `-(gaussian((1 - border) * mask))` 作为分水岭地形;
/// 4. 掩膜内边界强度低于阈值的像素经圆盘开运算、8-连通标记、去除小区域后作为 marker;
/// 5. 在掩膜内进行 marker 分水岭, 并统计每个实例的外接矩形、质心与边缘.
///
/// 边缘像素少于 3 个的实例不出现在 [`InstanceMap::info`] 中.
pub fn instance_map(raw: &RawPrediction, cfg: &InstanceMapConfig) -> PostProcResult<InstanceMap> {
    let fg = argmax_channels(raw.nucleus_prediction().view()).mapv(|c| c == 1);
    let mask = remove_small_objects(fg.view(), cfg.min_object_size);
    let maskf = mask.mapv(|m| if m { 1.0f32 } else { 0.0 });

    let hv = raw.horizontal_vertical();
    let h_map = minmax(hv.index_axis(Axis(0), 0));
    let v_map = minmax(hv.index_axis(Axis(0), 1));
    let (gx, _) = sobel_gradients(h_map.view(), cfg.sobel_kernel_size)?;
    let (_, gy) = sobel_gradients(v_map.view(), cfg.sobel_kernel_size)?;
    let gx = minmax(gx.view()).mapv(|v| 1.0 - v);
    let gy = minmax(gy.view()).mapv(|v| 1.0 - v);

    let mut border = Array2::<f32>::zeros(mask.raw_dim());
    Zip::from(&mut border)
        .and(&gx)
        .and(&gy)
        .and(&maskf)
        .for_each(|b, &x, &y, &m| *b = (x.max(y) - (1.0 - m)).max(0.0));

    let surface = {
        let dist = (border.mapv(|b| 1.0 - b)) * &maskf;
        gaussian_filter(dist.view(), cfg.distance_sigma).mapv(|v| -v)
    };

    let mut seeds = Array2::from_elem(mask.raw_dim(), false);
    Zip::from(&mut seeds)
        .and(&mask)
        .and(&border)
        .for_each(|s, &m, &b| *s = m && b < cfg.marker_threshold);
    let seeds = opening(seeds.view(), &disk(cfg.marker_radius));
    let (mut markers, _) = label_components(seeds.view(), Connectivity::Eight);
    remove_small_labels(&mut markers, cfg.min_object_size);

    let labels = watershed(surface.view(), markers.view(), mask.view());
    let info = describe_instances(&labels);
    log::debug!(
        "instance map: {} foreground px, {} instances",
        mask.iter().filter(|m| **m).count(),
        info.len()
    );
    Ok(InstanceMap { labels, info })
}

/// 统计标记图中每个实例的外接矩形、质心、面积与边缘.
fn describe_instances(labels: &Array2<u32>) -> BTreeMap<u32, InstanceInfo> {
    struct Acc {
        min: Idx2d,
        max: Idx2d,
        sum: (f64, f64),
        area: usize,
        contour: Vec<XY>,
    }

    let mut accs: BTreeMap<u32, Acc> = BTreeMap::new();
    for ((h, w), &l) in labels.indexed_iter() {
        if l == 0 {
            continue;
        }
        let acc = accs.entry(l).or_insert(Acc {
            min: (h, w),
            max: (h, w),
            sum: (0.0, 0.0),
            area: 0,
            contour: Vec::new(),
        });
        acc.min = (acc.min.0.min(h), acc.min.1.min(w));
        acc.max = (acc.max.0.max(h), acc.max.1.max(w));
        acc.sum.0 += w as f64;
        acc.sum.1 += h as f64;
        acc.area += 1;
        if is_region_border(labels.view(), (h, w), l) {
            acc.contour.push((w, h));
        }
    }

    accs.into_iter()
        .filter(|(_, a)| a.contour.len() >= 3)
        .map(|(l, a)| {
            let n = a.area as f64;
            let info = InstanceInfo {
                bbox: [a.min, (a.max.0 + 1, a.max.1 + 1)],
                centroid: [a.sum.0 / n, a.sum.1 / n],
                contour: a.contour,
                area: a.area,
                kind: 0,
                type_probability: 0.0,
            };
            (l, info)
        })
        .collect()
}

/// 判定每个实例的细胞核类别.
///
/// 类别 logits 取 argmax 后, 统计实例内各类别的像素数. 取像素最多的类别
/// (并列时取编号较小者); 若其为背景 0 且实例内还有其它类别, 改取第二多的类别.
/// 置信度为该类别像素数除以实例面积.
///
/// 类别图的 `(h, w)` 与实例图不一致时返回 [`PostProcError::SizeMismatch`], `map` 保持不变.
pub fn assign_nuclear_types(
    map: &mut InstanceMap,
    type_prediction: ArrayView3<f32>,
) -> PostProcResult<()> {
    let (_, h, w) = type_prediction.dim();
    if map.labels.dim() != (h, w) {
        return Err(PostProcError::SizeMismatch(map.labels.dim(), (h, w)));
    }
    let type_map = argmax_channels(type_prediction);
    let mut counts: BTreeMap<u32, BTreeMap<u8, usize>> = BTreeMap::new();
    Zip::from(&map.labels)
        .and(&type_map)
        .for_each(|&l, &t| {
            if l != 0 {
                *counts.entry(l).or_default().entry(t).or_default() += 1;
            }
        });

    for (l, info) in map.info.iter_mut() {
        let Some(c) = counts.get(l) else {
            continue;
        };
        // 稳定排序: 像素数相同时保持类别升序.
        let mut ranked: Vec<(u8, usize)> = c.iter().map(|(&t, &n)| (t, n)).collect();
        ranked.sort_by(|a, b| b.1.cmp(&a.1));
        let (mut kind, mut n) = ranked[0];
        if kind == 0 && ranked.len() > 1 {
            (kind, n) = ranked[1];
        }
        info.kind = kind;
        info.type_probability = n as f64 / (info.area as f64 + 1.0e-6);
    }
    Ok(())
}

/// 完整的两步后处理: 生成实例图, 再判定类别.
pub fn post_process(raw: &RawPrediction, cfg: &InstanceMapConfig) -> PostProcResult<InstanceMap> {
    let mut map = instance_map(raw, cfg)?;
    assign_nuclear_types(&mut map, raw.type_prediction().view())?;
    Ok(map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nucleus::testing::synthetic;
    use ndarray::Array3;

    #[test]
    fn test_empty_prediction_has_no_instances() {
        let raw = synthetic(32, &[]);
        let map = post_process(&raw, &InstanceMapConfig::default()).unwrap();
        assert!(map.is_empty());
        assert!(map.labels.iter().all(|&l| l == 0));
    }

    #[test]
    fn test_separate_nuclei_are_found() {
        let raw = synthetic(80, &[(20, 20, 9, 1), (56, 54, 10, 3)]);
        let map = post_process(&raw, &InstanceMapConfig::default()).unwrap();
        assert_eq!(map.len(), 2);

        let mut infos: Vec<&InstanceInfo> = map.info.values().collect();
        infos.sort_by(|a, b| a.centroid[1].total_cmp(&b.centroid[1]));
        let (a, b) = (infos[0], infos[1]);
        assert!((a.centroid[0] - 20.0).abs() < 1.0 && (a.centroid[1] - 20.0).abs() < 1.0);
        assert!((b.centroid[0] - 54.0).abs() < 1.0 && (b.centroid[1] - 56.0).abs() < 1.0);
        assert_eq!(a.kind, 1);
        assert_eq!(b.kind, 3);
        assert!(a.type_probability > 0.99);
        assert!(a.contour.len() >= 3);
        assert_eq!(a.bbox, [(11, 11), (30, 30)]);
    }

    #[test]
    fn test_small_objects_are_dropped() {
        let raw = synthetic(32, &[(10, 10, 1, 2)]);
        let map = post_process(&raw, &InstanceMapConfig::default()).unwrap();
        assert!(map.is_empty());
    }

    #[test]
    fn test_background_majority_falls_back_to_second_type() {
        let mut labels = Array2::<u32>::zeros((1, 5));
        labels.slice_mut(ndarray::s![0, 0..5]).fill(4);
        let mut info = BTreeMap::new();
        info.insert(
            4,
            InstanceInfo {
                bbox: [(0, 0), (1, 5)],
                centroid: [2.0, 0.0],
                contour: vec![],
                area: 5,
                kind: 0,
                type_probability: 0.0,
            },
        );
        let mut map = InstanceMap { labels, info };

        // 类别图: [0, 0, 0, 2, 2].
        let mut tp = Array3::<f32>::zeros((3, 1, 5));
        tp[(2, 0, 3)] = 1.0;
        tp[(2, 0, 4)] = 1.0;
        assign_nuclear_types(&mut map, tp.view()).unwrap();
        let i = &map.info[&4];
        assert_eq!(i.kind, 2);
        assert!((i.type_probability - 0.4).abs() < 1e-6);

        // 尺寸不一致的类别图被拒绝, 已有结果不变.
        let wrong = Array3::<f32>::zeros((3, 2, 5));
        assert!(matches!(
            assign_nuclear_types(&mut map, wrong.view()),
            Err(PostProcError::SizeMismatch((1, 5), (2, 5)))
        ));
        assert_eq!(map.info[&4].kind, 2);
    }

    #[test]
    fn test_invalid_kernel_size() {
        let raw = synthetic(16, &[]);
        let cfg = InstanceMapConfig {
            sobel_kernel_size: 4,
            ..Default::default()
        };
        assert!(instance_map(&raw, &cfg).is_err());
    }
}
