//! 二值形态学与连通域标记.

use crate::Idx2d;
use ndarray::{Array2, ArrayView2};
use std::collections::VecDeque;

/// 连通规则.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Connectivity {
    /// 4-相邻.
    Four,

    /// 8-相邻.
    Eight,
}

const N4: [(isize, isize); 4] = [(-1, 0), (1, 0), (0, -1), (0, 1)];
const N8: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

impl Connectivity {
    fn offsets(self) -> &'static [(isize, isize)] {
        match self {
            Connectivity::Four => &N4,
            Connectivity::Eight => &N8,
        }
    }
}

/// 平移 `(h, w)`, 越界时返回 `None`.
#[inline]
fn shifted((h, w): Idx2d, (dh, dw): (isize, isize), (height, width): Idx2d) -> Option<Idx2d> {
    let nh = h.checked_add_signed(dh)?;
    let nw = w.checked_add_signed(dw)?;
    (nh < height && nw < width).then_some((nh, nw))
}

/// 获得 `pos` 在给定连通规则下的所有不越界邻居.
pub fn neighbours(
    pos: Idx2d,
    shape: Idx2d,
    conn: Connectivity,
) -> impl Iterator<Item = Idx2d> {
    conn.offsets()
        .iter()
        .filter_map(move |&d| shifted(pos, d, shape))
}

/// 标记 `mask` 中的连通前景区域.
///
/// 按行优先顺序第一次遇到的区域编号为 1, 依此类推; 背景为 0.
/// 返回标记图与区域个数.
pub fn label_components(mask: ArrayView2<bool>, conn: Connectivity) -> (Array2<u32>, u32) {
    let shape = mask.dim();
    let mut labels = Array2::<u32>::zeros(shape);
    let mut next = 0u32;
    let mut q = VecDeque::with_capacity(16);

    for (pos, &fg) in mask.indexed_iter() {
        if !fg || labels[pos] != 0 {
            continue;
        }
        next += 1;
        labels[pos] = next;
        q.push_back(pos);
        while let Some(cur) = q.pop_front() {
            for n in neighbours(cur, shape, conn) {
                if mask[n] && labels[n] == 0 {
                    labels[n] = next;
                    q.push_back(n);
                }
            }
        }
    }
    (labels, next)
}

/// 各标记的像素个数, 下标为标记值.
pub fn label_areas(labels: ArrayView2<u32>) -> Vec<usize> {
    let max = labels.iter().copied().max().unwrap_or(0) as usize;
    let mut areas = vec![0usize; max + 1];
    labels.iter().for_each(|&l| areas[l as usize] += 1);
    areas
}

/// 把面积小于 `min_size` 的标记区域置为背景. 其余标记值保持不变.
///
/// 返回被移除的区域个数.
pub fn remove_small_labels(labels: &mut Array2<u32>, min_size: usize) -> usize {
    let areas = label_areas(labels.view());
    let removed = areas
        .iter()
        .skip(1)
        .filter(|&&a| a > 0 && a < min_size)
        .count();
    if removed > 0 {
        labels.mapv_inplace(|l| if areas[l as usize] < min_size { 0 } else { l });
    }
    removed
}

/// 移除二值图中面积小于 `min_size` 的 4-连通前景区域.
pub fn remove_small_objects(mask: ArrayView2<bool>, min_size: usize) -> Array2<bool> {
    let (mut labels, _) = label_components(mask, Connectivity::Four);
    remove_small_labels(&mut labels, min_size);
    labels.mapv(|l| l != 0)
}

/// 半径为 `radius` 的圆盘结构元, 以相对中心的偏移 `(dh, dw)` 表示,
/// 包含所有满足 `dh² + dw² <= radius²` 的偏移.
pub fn disk(radius: usize) -> Vec<(isize, isize)> {
    let r = radius as isize;
    let mut ans = Vec::with_capacity((2 * radius + 1).pow(2));
    for dh in -r..=r {
        for dw in -r..=r {
            if dh * dh + dw * dw <= r * r {
                ans.push((dh, dw));
            }
        }
    }
    ans
}

/// 二值腐蚀. 越界位置不参与判断 (视为前景).
pub fn erode(mask: ArrayView2<bool>, se: &[(isize, isize)]) -> Array2<bool> {
    let shape = mask.dim();
    Array2::from_shape_fn(shape, |pos| {
        mask[pos]
            && se
                .iter()
                .all(|&d| shifted(pos, d, shape).map_or(true, |n| mask[n]))
    })
}

/// 二值膨胀. 越界位置视为背景.
pub fn dilate(mask: ArrayView2<bool>, se: &[(isize, isize)]) -> Array2<bool> {
    let shape = mask.dim();
    Array2::from_shape_fn(shape, |pos| {
        se.iter()
            .any(|&(dh, dw)| shifted(pos, (-dh, -dw), shape).map_or(false, |n| mask[n]))
    })
}

/// 二值开运算: 先腐蚀后膨胀.
pub fn opening(mask: ArrayView2<bool>, se: &[(isize, isize)]) -> Array2<bool> {
    dilate(erode(mask, se).view(), se)
}

/// 判断 `pos` 是否位于 `label` 区域的边缘: 至少一个 4-邻居不属于该区域,
/// 或者 `pos` 位于图像边缘.
pub fn is_region_border(labels: ArrayView2<u32>, pos: Idx2d, label: u32) -> bool {
    let shape = labels.dim();
    N4.iter().any(|&d| match shifted(pos, d, shape) {
        Some(n) => labels[n] != label,
        None => true,
    })
}
