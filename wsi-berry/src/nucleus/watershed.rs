//! 以 marker 为种子的分水岭.

use super::morph::{neighbours, Connectivity};
use crate::Idx2d;
use binary_heap_plus::BinaryHeap;
use ndarray::{Array2, ArrayView2};

/// 优先队列元素: (高度, 入队序号, 位置).
type Entry = (f32, u64, Idx2d);

/// 在地形 `surface` 上, 从 `markers` 中的非零标记出发进行 4-相邻优先泛洪.
///
/// 每次弹出高度最低的像素 (高度相同则先入队者优先), 把它的标记扩散到
/// 尚未标记且位于 `mask` 内的 4-邻居. `mask` 外的像素保持为 0.
///
/// # 注意
///
/// 三个数组的形状必须一致, 否则程序 panic.
pub fn watershed(
    surface: ArrayView2<f32>,
    markers: ArrayView2<u32>,
    mask: ArrayView2<bool>,
) -> Array2<u32> {
    assert_eq!(surface.dim(), markers.dim());
    assert_eq!(surface.dim(), mask.dim());
    let shape = surface.dim();

    let mut out = Array2::<u32>::zeros(shape);
    // 堆顶为高度最低、序号最小的元素.
    let mut heap: BinaryHeap<Entry, _> =
        BinaryHeap::new_by(|a: &Entry, b: &Entry| b.0.total_cmp(&a.0).then(b.1.cmp(&a.1)));
    let mut age = 0u64;

    for (pos, &m) in markers.indexed_iter() {
        if m != 0 && mask[pos] {
            out[pos] = m;
            heap.push((surface[pos], age, pos));
            age += 1;
        }
    }

    while let Some((_, _, pos)) = heap.pop() {
        let label = out[pos];
        for n in neighbours(pos, shape, Connectivity::Four) {
            if out[n] == 0 && mask[n] {
                out[n] = label;
                heap.push((surface[n], age, n));
                age += 1;
            }
        }
    }
    out
}
