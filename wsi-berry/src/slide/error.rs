//! 切片读取错误.

use ndarray_npy::ReadNpzError;
use std::fmt::{self, Display, Formatter};

/// 金字塔切片读取的运行时错误.
#[derive(Debug)]
pub enum ReadError {
    /// 金字塔层级越界. 第一个参数为请求层级, 第二个参数为实际层数.
    LevelOutOfRange(usize, usize),

    /// 请求区域宽或高为 0.
    EmptyRegion,

    /// 数据形状不符合 `(h, w, 3)`.
    BadShape(Vec<usize>),

    /// 底层 I/O 错误.
    Io(std::io::Error),

    /// 图像解码错误.
    Image(image::ImageError),

    /// npz 归档读取错误.
    Npz(ReadNpzError),
}

impl Display for ReadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::LevelOutOfRange(level, count) => {
                write!(f, "level {level} out of range (slide has {count} levels)")
            }
            Self::EmptyRegion => f.write_str("requested region is empty"),
            Self::BadShape(sh) => write!(f, "expected an (h, w, 3) array, got shape {sh:?}"),
            Self::Io(e) => write!(f, "I/O error: {e}"),
            Self::Image(e) => write!(f, "image error: {e}"),
            Self::Npz(e) => write!(f, "npz error: {e}"),
        }
    }
}

impl std::error::Error for ReadError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(e) => Some(e),
            Self::Image(e) => Some(e),
            Self::Npz(e) => Some(e),
            _ => None,
        }
    }
}

impl From<std::io::Error> for ReadError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<image::ImageError> for ReadError {
    fn from(e: image::ImageError) -> Self {
        Self::Image(e)
    }
}

impl From<ReadNpzError> for ReadError {
    fn from(e: ReadNpzError) -> Self {
        Self::Npz(e)
    }
}
