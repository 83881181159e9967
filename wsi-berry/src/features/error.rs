use std::fmt::{self, Display, Formatter};

/// 主成分分析错误.
#[derive(Debug, Clone, PartialEq)]
pub enum PcaError {
    /// 样本数不足 2.
    TooFewSamples(usize),

    /// 主成分个数不合法. 参数依次为请求的个数与允许的最大个数.
    InvalidComponents(usize, usize),

    /// 输入的特征数与拟合时不同. 参数依次为期望与实际特征数.
    FeatureMismatch(usize, usize),

    /// 输入含有 NaN 或无穷.
    NonFinite,
}

/// PCA 结果.
pub type PcaResult<T> = Result<T, PcaError>;

impl Display for PcaError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::TooFewSamples(n) => write!(f, "PCA needs at least 2 samples, got {n}"),
            Self::InvalidComponents(k, max) => {
                write!(f, "n_components = {k} is invalid, expected 1..={max}")
            }
            Self::FeatureMismatch(want, got) => {
                write!(f, "expected {want} features, got {got}")
            }
            Self::NonFinite => write!(f, "input contains NaN or infinity"),
        }
    }
}

impl std::error::Error for PcaError {}
