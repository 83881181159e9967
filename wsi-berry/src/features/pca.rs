//! 主成分分析.

use super::jacobi::symmetric_eigen;
use super::{PcaError, PcaResult};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 未拟合的 PCA, 只记录主成分个数.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Pca {
    n_components: usize,
}

impl Pca {
    /// 保留 `n_components` 个主成分.
    #[inline]
    pub fn new(n_components: usize) -> Self {
        Self { n_components }
    }

    /// 在 `(n_samples, n_features)` 矩阵上拟合.
    ///
    /// 要求 `n_samples >= 2` 且 `1 <= n_components <= min(n_samples, n_features)`.
    pub fn fit(&self, x: ArrayView2<f64>) -> PcaResult<FittedPca> {
        let (n, f) = x.dim();
        if n < 2 {
            return Err(PcaError::TooFewSamples(n));
        }
        let max = n.min(f);
        if self.n_components == 0 || self.n_components > max {
            return Err(PcaError::InvalidComponents(self.n_components, max));
        }
        if x.iter().any(|v| !v.is_finite()) {
            return Err(PcaError::NonFinite);
        }

        // 不会为 None: n >= 2.
        let mean = x.mean_axis(Axis(0)).unwrap_or_else(|| Array1::zeros(f));
        let centered = &x - &mean;
        let cov = centered.t().dot(&centered) / (n - 1) as f64;
        let (eigvals, eigvecs) = symmetric_eigen(cov);

        let mut order: Vec<usize> = (0..f).collect();
        order.sort_by(|&a, &b| eigvals[b].total_cmp(&eigvals[a]));
        let total: f64 = eigvals.iter().map(|v| v.max(0.0)).sum();

        let k = self.n_components;
        let mut components = Array2::zeros((k, f));
        let mut explained_variance = Array1::zeros(k);
        for (row, &j) in order.iter().take(k).enumerate() {
            let mut c = eigvecs.column(j).to_owned();
            flip_sign(&mut c);
            components.row_mut(row).assign(&c);
            explained_variance[row] = eigvals[j].max(0.0);
        }
        let explained_variance_ratio = if total > 0.0 {
            &explained_variance / total
        } else {
            Array1::zeros(k)
        };
        log::debug!("PCA explained variance ratio: {explained_variance_ratio}");

        Ok(FittedPca {
            mean,
            components,
            explained_variance,
            explained_variance_ratio,
        })
    }

    /// 拟合并返回 `(n_samples, n_components)` 投影.
    pub fn fit_transform(&self, x: ArrayView2<f64>) -> PcaResult<(FittedPca, Array2<f64>)> {
        let fitted = self.fit(x)?;
        let projected = fitted.transform(x)?;
        Ok((fitted, projected))
    }
}

/// 使绝对值最大的分量为正.
fn flip_sign(c: &mut Array1<f64>) {
    let pivot = c
        .iter()
        .copied()
        .fold(0.0_f64, |best, v| if v.abs() > best.abs() { v } else { best });
    if pivot < 0.0 {
        c.mapv_inplace(|v| -v);
    }
}

/// 拟合完成的 PCA.
#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FittedPca {
    mean: Array1<f64>,
    components: Array2<f64>,
    explained_variance: Array1<f64>,
    explained_variance_ratio: Array1<f64>,
}

impl FittedPca {
    /// 每个特征的均值.
    #[inline]
    pub fn mean(&self) -> ArrayView1<'_, f64> {
        self.mean.view()
    }

    /// `(n_components, n_features)` 主成分, 按解释方差降序.
    #[inline]
    pub fn components(&self) -> ArrayView2<'_, f64> {
        self.components.view()
    }

    /// 各主成分的方差 (样本协方差的特征值).
    #[inline]
    pub fn explained_variance(&self) -> ArrayView1<'_, f64> {
        self.explained_variance.view()
    }

    /// 各主成分方差占总方差的比例.
    #[inline]
    pub fn explained_variance_ratio(&self) -> ArrayView1<'_, f64> {
        self.explained_variance_ratio.view()
    }

    /// 把 `(n_samples, n_features)` 投影到主成分上.
    pub fn transform(&self, x: ArrayView2<f64>) -> PcaResult<Array2<f64>> {
        let f = self.mean.len();
        if x.ncols() != f {
            return Err(PcaError::FeatureMismatch(f, x.ncols()));
        }
        Ok((&x - &self.mean).dot(&self.components.t()))
    }
}
