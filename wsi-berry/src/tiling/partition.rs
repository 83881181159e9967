//! 任务划分: 竖直条带、patch 内的小块起点、均匀分块.

use crate::XY;

/// 一个竖直条带读取任务. 坐标均以 **目标层级** 像素表示.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct StripTask {
    /// 任务序号 (从左到右).
    pub index: usize,

    /// 条带左边界.
    pub x: usize,

    /// 条带宽度, 总是大于 0.
    pub width: usize,
}

impl StripTask {
    /// 条带右边界 (不含).
    #[inline]
    pub fn end(&self) -> usize {
        self.x + self.width
    }
}

/// 将宽度 `width` 划分为至多 `workers` 个竖直条带.
///
/// 所有条带首尾相接、互不重叠, 恰好覆盖 `[0, width)`. 宽度不能整除时,
/// 余下的列依次分给最前面的条带, 因此任意两条带宽度至多相差 1.
/// `workers` 多于列数时, 每列单独成为一个条带; `width` 或 `workers` 为 0 时返回空.
pub fn partition_strips(width: usize, workers: usize) -> Vec<StripTask> {
    if width == 0 || workers == 0 {
        return Vec::new();
    }
    let n = workers.min(width);
    let (base, rem) = (width / n, width % n);
    let mut x = 0;
    (0..n)
        .map(|index| {
            let w = base + usize::from(index < rem);
            let task = StripTask { index, x, width: w };
            x += w;
            task
        })
        .collect()
}

/// 生成每个 patch 内所有 `tile_size` 小块的起点 (第 0 层坐标).
///
/// `patches` 为各 patch 的左上角. 每个 patch 内按行优先顺序
/// (先 y 后 x) 以步长 `tile_size` 遍历 `[0, patch_size)`.
///
/// # 注意
///
/// `tile_size` 为 0 时程序 panic.
pub fn tile_origins(patches: &[XY], patch_size: usize, tile_size: usize) -> Vec<XY> {
    assert_ne!(tile_size, 0, "小块边长不能为 0");
    let per_side = patch_size.div_ceil(tile_size);
    let mut ans = Vec::with_capacity(patches.len() * per_side * per_side);
    for &(px, py) in patches {
        for sy in (0..patch_size).step_by(tile_size) {
            for sx in (0..patch_size).step_by(tile_size) {
                ans.push((px + sx, py + sy));
            }
        }
    }
    ans
}

/// 将 `items` 按原顺序划分为至多 `chunks` 个连续块, 块大小至多相差 1.
///
/// `chunks` 为 0 时视为 1.
pub fn chunk_evenly<T: Clone>(items: &[T], chunks: usize) -> Vec<Vec<T>> {
    if items.is_empty() {
        return Vec::new();
    }
    let n = chunks.clamp(1, items.len());
    let (base, rem) = (items.len() / n, items.len() % n);
    let mut start = 0;
    (0..n)
        .map(|i| {
            let len = base + usize::from(i < rem);
            let chunk = items[start..start + len].to_vec();
            start += len;
            chunk
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 所有条带恰好覆盖宽度且互不重叠.
    fn assert_exact_cover(width: usize, workers: usize) {
        let tasks = partition_strips(width, workers);
        let mut covered = vec![0u32; width];
        for t in tasks.iter() {
            assert!(t.width > 0);
            for c in covered[t.x..t.end()].iter_mut() {
                *c += 1;
            }
        }
        assert!(covered.iter().all(|&c| c == 1), "{width} / {workers}");
        if let (Some(min), Some(max)) = (
            tasks.iter().map(|t| t.width).min(),
            tasks.iter().map(|t| t.width).max(),
        ) {
            assert!(max - min <= 1);
        }
    }

    #[test]
    fn test_partition_exact_cover() {
        for width in 0..=40 {
            for workers in 0..=12 {
                assert_exact_cover(width, workers);
            }
        }
        assert_exact_cover(46_000, 32);
    }

    #[test]
    fn test_partition_remainder_goes_first() {
        let tasks = partition_strips(10, 4);
        let widths: Vec<usize> = tasks.iter().map(|t| t.width).collect();
        assert_eq!(widths, vec![3, 3, 2, 2]);
        assert_eq!(tasks[2].x, 6);
    }

    #[test]
    fn test_partition_more_workers_than_columns() {
        let tasks = partition_strips(3, 16);
        assert_eq!(tasks.len(), 3);
        assert!(tasks.iter().all(|t| t.width == 1));
        assert!(partition_strips(0, 4).is_empty());
        assert!(partition_strips(4, 0).is_empty());
    }

    #[test]
    fn test_tile_origins_row_major() {
        let o = tile_origins(&[(100, 200)], 128, 64);
        assert_eq!(o, vec![(100, 200), (164, 200), (100, 264), (164, 264)]);
        // 不能整除时最后一块仍从 patch 内部开始.
        assert_eq!(tile_origins(&[(0, 0)], 100, 64).len(), 4);
        assert_eq!(tile_origins(&[(0, 0), (512, 0)], 256, 64).len(), 32);
    }

    #[test]
    fn test_chunk_evenly() {
        let v: Vec<u32> = (0..10).collect();
        let c = chunk_evenly(&v, 3);
        assert_eq!(c, vec![vec![0, 1, 2, 3], vec![4, 5, 6], vec![7, 8, 9]]);
        assert_eq!(chunk_evenly(&v, 0).len(), 1);
        assert_eq!(chunk_evenly(&v, 50).len(), 10);
        assert!(chunk_evenly::<u32>(&[], 3).is_empty());
    }
}
