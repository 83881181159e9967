//! tile 特征矩阵的降维.
//!
//! 只实现 PCA. 协方差矩阵的特征分解使用纯 Rust 的 Jacobi 迭代, 不依赖 LAPACK.

mod error;
mod jacobi;
mod pca;

pub use error::{PcaError, PcaResult};
pub use pca::{FittedPca, Pca};
