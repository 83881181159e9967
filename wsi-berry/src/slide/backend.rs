//! 读取后端选择.

use super::{ImagePyramid, NpzPyramid, PyramidRead, ReadResult, RgbRegion};
use crate::{Size2d, XY};
use std::path::Path;

/// 切片读取后端.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Backend {
    /// 普通光栅图像, 由 `image` 解码后在内存中构建金字塔.
    Image,

    /// 按层存储的 npz 金字塔.
    Npz,
}

impl Backend {
    /// 按文件扩展名推断后端: `.npz` 为 [`Backend::Npz`], 其余为 [`Backend::Image`].
    pub fn from_path<P: AsRef<Path>>(path: P) -> Self {
        match path.as_ref().extension().and_then(|s| s.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("npz") => Self::Npz,
            _ => Self::Image,
        }
    }
}

/// 任一后端打开的切片.
#[derive(Clone, Debug)]
pub enum AnySlide {
    /// 见 [`ImagePyramid`].
    Image(ImagePyramid),

    /// 见 [`NpzPyramid`].
    Npz(NpzPyramid),
}

/// 用指定后端打开 `path` 处的切片.
pub fn open_slide<P: AsRef<Path>>(path: P, backend: Backend) -> ReadResult<AnySlide> {
    let path = path.as_ref();
    log::debug!("opening slide {} with {backend:?} backend", path.display());
    Ok(match backend {
        Backend::Image => AnySlide::Image(ImagePyramid::open(path)?),
        Backend::Npz => AnySlide::Npz(NpzPyramid::open(path)?),
    })
}

macro_rules! dispatch {
    ($self: ident, $s: ident => $e: expr) => {
        match $self {
            AnySlide::Image($s) => $e,
            AnySlide::Npz($s) => $e,
        }
    };
}

impl PyramidRead for AnySlide {
    fn level_count(&self) -> usize {
        dispatch!(self, s => s.level_count())
    }

    fn level_dimensions(&self, level: usize) -> Option<Size2d> {
        dispatch!(self, s => s.level_dimensions(level))
    }

    fn level_downsample(&self, level: usize) -> Option<f64> {
        dispatch!(self, s => s.level_downsample(level))
    }

    fn read_region(&self, location: XY, level: usize, size: Size2d) -> ReadResult<RgbRegion> {
        dispatch!(self, s => s.read_region(location, level, size))
    }
}
