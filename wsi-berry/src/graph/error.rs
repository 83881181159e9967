use std::fmt::{self, Display, Formatter};

/// k-NN 图构建与绘制错误.
#[derive(Debug)]
pub enum GraphError {
    /// 近邻数不合法. 参数依次为 `k` 与点数; 要求 `1 <= k <= 点数`.
    InvalidK(usize, usize),

    /// 细胞核类别不在 `1..=4` 内.
    InvalidNucleusType(u8),

    /// 图像编码错误.
    Image(image::ImageError),

    /// 底层 I/O 错误.
    Io(std::io::Error),
}

/// 图相关操作结果.
pub type GraphResult<T> = Result<T, GraphError>;

impl Display for GraphError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidK(k, n) => write!(f, "k = {k} is invalid for {n} points"),
            Self::InvalidNucleusType(t) => {
                write!(f, "nucleus type needs to be >0 and <=4, got {t}")
            }
            Self::Image(e) => write!(f, "image error: {e}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for GraphError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Image(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<image::ImageError> for GraphError {
    fn from(e: image::ImageError) -> Self {
        Self::Image(e)
    }
}

impl From<std::io::Error> for GraphError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
