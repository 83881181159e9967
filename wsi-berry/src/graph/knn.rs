//! 二维 k 近邻查询 (静态 kd 树).

use super::{GraphError, GraphResult};
use ndarray::Array2;

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IntoParallelIterator, ParallelIterator};

        /// 对 `0..n` 的每个下标并行求值.
        fn collect_rows<F>(n: usize, row: F) -> Vec<Vec<(f64, usize)>>
        where
            F: Fn(usize) -> Vec<(f64, usize)> + Sync + Send,
        {
            (0..n).into_par_iter().map(row).collect()
        }
    } else {
        /// 对 `0..n` 的每个下标依次求值.
        fn collect_rows<F>(n: usize, row: F) -> Vec<Vec<(f64, usize)>>
        where
            F: Fn(usize) -> Vec<(f64, usize)>,
        {
            (0..n).map(row).collect()
        }
    }
}

/// 距离度量.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Default)]
pub enum Metric {
    /// 欧氏距离.
    #[default]
    Euclidean,

    /// 欧氏距离的平方.
    SqEuclidean,
}

impl Metric {
    #[inline]
    fn from_squared(self, d2: f64) -> f64 {
        match self {
            Metric::Euclidean => d2.sqrt(),
            Metric::SqEuclidean => d2,
        }
    }
}

/// k 近邻查询结果. 第 `i` 行为第 `i` 个点的近邻, 第 0 列总是该点自身.
#[derive(Clone, Debug, PartialEq)]
pub struct Neighbors {
    /// `(n, k)` 近邻下标.
    pub indices: Array2<usize>,

    /// `(n, k)` 对应距离, 每行非降序.
    pub distances: Array2<f64>,
}

impl Neighbors {
    /// 点数.
    #[inline]
    pub fn len(&self) -> usize {
        self.indices.nrows()
    }

    /// 是否为空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 每行近邻数 (含自身).
    #[inline]
    pub fn k(&self) -> usize {
        self.indices.ncols()
    }
}

#[inline]
fn sq_dist(a: &[f64; 2], b: &[f64; 2]) -> f64 {
    (a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)
}

/// 基于静态平衡 kd 树的二维 k 近邻.
///
/// 树以隐式方式存放在下标数组中: 区间 `[lo, hi)` 的中点为划分节点,
/// 左右子树分别为 `[lo, mid)` 与 `[mid + 1, hi)`, 划分轴随深度在 x/y 间交替.
#[derive(Clone, Debug)]
pub struct NearestNeighbors {
    points: Vec<[f64; 2]>,
    order: Vec<usize>,
    metric: Metric,
}

impl NearestNeighbors {
    /// 以欧氏距离建树.
    pub fn fit(points: &[[f64; 2]]) -> Self {
        Self::fit_with(points, Metric::Euclidean)
    }

    /// 以指定度量建树.
    pub fn fit_with(points: &[[f64; 2]], metric: Metric) -> Self {
        let mut order: Vec<usize> = (0..points.len()).collect();
        build(points, &mut order, 0);
        Self {
            points: points.to_vec(),
            order,
            metric,
        }
    }

    /// 点数.
    #[inline]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// 是否为空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// 度量.
    #[inline]
    pub fn metric(&self) -> Metric {
        self.metric
    }

    /// 对每个已拟合的点查询 `k` 个近邻 (含自身).
    ///
    /// 第 0 列为点自身 (距离 0), 其余按距离升序, 距离相同时下标小者优先.
    /// `k` 为 0 或大于点数时返回 [`GraphError::InvalidK`].
    pub fn kneighbors(&self, k: usize) -> GraphResult<Neighbors> {
        let n = self.len();
        if k == 0 || k > n {
            return Err(GraphError::InvalidK(k, n));
        }

        let rows = collect_rows(n, |i| self.query_row(i, k));

        let mut indices = Array2::zeros((n, k));
        let mut distances = Array2::zeros((n, k));
        for (i, r) in rows.into_iter().enumerate() {
            for (j, (d2, idx)) in r.into_iter().enumerate() {
                indices[(i, j)] = idx;
                distances[(i, j)] = self.metric.from_squared(d2);
            }
        }
        Ok(Neighbors { indices, distances })
    }

    /// 第 `i` 个点的 `k` 个近邻 `(平方距离, 下标)`, 自身在首位.
    fn query_row(&self, i: usize, k: usize) -> Vec<(f64, usize)> {
        let mut best = Vec::with_capacity(k);
        if k > 1 {
            let mut cands = Candidates {
                m: k - 1,
                items: Vec::with_capacity(k),
            };
            self.search(&self.points[i], i, 0, self.order.len(), 0, &mut cands);
            best = cands.items;
        }
        best.insert(0, (0.0, i));
        best
    }

    fn search(
        &self,
        q: &[f64; 2],
        exclude: usize,
        lo: usize,
        hi: usize,
        depth: usize,
        cands: &mut Candidates,
    ) {
        if lo >= hi {
            return;
        }
        let mid = (lo + hi) / 2;
        let idx = self.order[mid];
        let p = &self.points[idx];
        if idx != exclude {
            cands.offer((sq_dist(q, p), idx));
        }

        let axis = depth % 2;
        let diff = q[axis] - p[axis];
        let (near, far) = if diff < 0.0 {
            ((lo, mid), (mid + 1, hi))
        } else {
            ((mid + 1, hi), (lo, mid))
        };
        self.search(q, exclude, near.0, near.1, depth + 1, cands);
        if cands.accepts_at(diff * diff) {
            self.search(q, exclude, far.0, far.1, depth + 1, cands);
        }
    }
}

/// 至多 `m` 个候选近邻, 按 `(平方距离, 下标)` 升序.
struct Candidates {
    m: usize,
    items: Vec<(f64, usize)>,
}

impl Candidates {
    #[inline]
    fn less(a: &(f64, usize), b: &(f64, usize)) -> bool {
        a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)).is_lt()
    }

    fn offer(&mut self, cand: (f64, usize)) {
        if self.items.len() == self.m {
            match self.items.last() {
                Some(worst) if Self::less(&cand, worst) => {
                    self.items.pop();
                }
                _ => return,
            }
        }
        let at = self.items.partition_point(|e| Self::less(e, &cand));
        self.items.insert(at, cand);
    }

    /// 平方距离为 `d2` 的点是否可能进入候选.
    #[inline]
    fn accepts_at(&self, d2: f64) -> bool {
        self.items.len() < self.m || self.items.last().map_or(true, |w| d2 <= w.0)
    }
}

/// 递归地把 `order` 排列为隐式 kd 树.
fn build(points: &[[f64; 2]], order: &mut [usize], depth: usize) {
    if order.len() <= 1 {
        return;
    }
    let axis = depth % 2;
    let mid = order.len() / 2;
    order.select_nth_unstable_by(mid, |&a, &b| points[a][axis].total_cmp(&points[b][axis]));
    let (left, right) = order.split_at_mut(mid);
    build(points, left, depth + 1);
    build(points, &mut right[1..], depth + 1);
}

#[cfg(test)]
mod tests {
    use super::*;

    /// 暴力求解, 用于对拍.
    fn brute(points: &[[f64; 2]], k: usize) -> Vec<Vec<usize>> {
        (0..points.len())
            .map(|i| {
                let mut others: Vec<(f64, usize)> = (0..points.len())
                    .filter(|&j| j != i)
                    .map(|j| (sq_dist(&points[i], &points[j]), j))
                    .collect();
                others.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
                std::iter::once(i)
                    .chain(others.into_iter().take(k - 1).map(|(_, j)| j))
                    .collect()
            })
            .collect()
    }

    /// 简单的线性同余伪随机数.
    fn lcg_points(n: usize, seed: u64) -> Vec<[f64; 2]> {
        let mut s = seed;
        let mut next = move || {
            s = s.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
            ((s >> 33) % 1000) as f64
        };
        (0..n).map(|_| [next(), next()]).collect()
    }

    #[test]
    fn test_matches_brute_force() {
        for (n, k) in [(1, 1), (2, 2), (10, 3), (200, 5), (500, 8)] {
            let pts = lcg_points(n, n as u64 + 7);
            let nn = NearestNeighbors::fit(&pts).kneighbors(k).unwrap();
            let expected = brute(&pts, k);
            for (i, row) in expected.iter().enumerate() {
                let got: Vec<usize> = nn.indices.row(i).to_vec();
                assert_eq!(&got, row, "n = {n}, k = {k}, row {i}");
            }
        }
    }

    #[test]
    fn test_grid_ties_break_by_index() {
        // 3x3 网格, 中心点 4 的四个等距近邻.
        let pts: Vec<[f64; 2]> = (0..9).map(|i| [(i % 3) as f64, (i / 3) as f64]).collect();
        let nn = NearestNeighbors::fit(&pts).kneighbors(5).unwrap();
        assert_eq!(nn.indices.row(4).to_vec(), vec![4, 1, 3, 5, 7]);
        assert_eq!(nn.distances.row(4).to_vec(), vec![0.0, 1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_self_first_with_duplicates() {
        let pts = [[1.0, 1.0], [1.0, 1.0], [5.0, 5.0]];
        let nn = NearestNeighbors::fit_with(&pts, Metric::SqEuclidean)
            .kneighbors(3)
            .unwrap();
        assert_eq!(nn.indices.row(1).to_vec(), vec![1, 0, 2]);
        assert_eq!(nn.distances[(1, 2)], 32.0);
    }

    #[test]
    fn test_invalid_k() {
        let nn = NearestNeighbors::fit(&[[0.0, 0.0], [1.0, 0.0]]);
        assert!(matches!(nn.kneighbors(0), Err(GraphError::InvalidK(0, 2))));
        assert!(matches!(nn.kneighbors(3), Err(GraphError::InvalidK(3, 2))));
        assert!(NearestNeighbors::fit(&[]).kneighbors(1).is_err());
    }
}
