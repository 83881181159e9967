//! 细胞核后处理错误.

use crate::slide::ReadError;
use ndarray_npy::{ReadNpzError, WriteNpzError};
use std::fmt::{self, Display, Formatter};

/// 细胞核检测与后处理的运行时错误.
#[derive(Debug)]
pub enum PostProcError {
    /// 原始预测图的形状不合法. 参数依次为预测图名称与实际形状.
    BadShape(&'static str, Vec<usize>),

    /// 各预测图的空间尺寸不一致. 参数依次为期望 `(h, w)` 与实际 `(h, w)`.
    SizeMismatch((usize, usize), (usize, usize)),

    /// sobel 核大小必须为不小于 3 的奇数.
    InvalidKernelSize(usize),

    /// 找不到某个 patch 位置的预测结果.
    MissingPrediction(String),

    /// 读取 patch 失败.
    Read(ReadError),

    /// npz 读取错误.
    Npz(ReadNpzError),

    /// npz 写入错误.
    NpzWrite(WriteNpzError),

    /// 底层 I/O 错误.
    Io(std::io::Error),
}

/// 细胞核后处理结果.
pub type PostProcResult<T> = Result<T, PostProcError>;

impl Display for PostProcError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadShape(name, sh) => write!(f, "{name}: unexpected shape {sh:?}"),
            Self::SizeMismatch(a, b) => {
                write!(f, "prediction maps disagree in size: {a:?} vs {b:?}")
            }
            Self::InvalidKernelSize(k) => {
                write!(f, "sobel kernel size must be odd and >= 3, got {k}")
            }
            Self::MissingPrediction(key) => write!(f, "no prediction stored under `{key}`"),
            Self::Read(e) => write!(f, "read failed: {e}"),
            Self::Npz(e) => write!(f, "npz error: {e}"),
            Self::NpzWrite(e) => write!(f, "npz write error: {e}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
        }
    }
}

impl std::error::Error for PostProcError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Read(e) => Some(e),
            Self::Npz(e) => Some(e),
            Self::NpzWrite(e) => Some(e),
            Self::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ReadError> for PostProcError {
    fn from(e: ReadError) -> Self {
        Self::Read(e)
    }
}

impl From<ReadNpzError> for PostProcError {
    fn from(e: ReadNpzError) -> Self {
        Self::Npz(e)
    }
}

impl From<WriteNpzError> for PostProcError {
    fn from(e: WriteNpzError) -> Self {
        Self::NpzWrite(e)
    }
}

impl From<std::io::Error> for PostProcError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}
