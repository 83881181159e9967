//! 细胞核检测后处理与质心提取.
//!
//! 推理本身由外部完成 (见 [`Segmenter`]), 本模块只负责把三张原始预测图
//! (前景/背景, 水平/竖直距离, 类别) 依次经过 "实例图 → 类别判定 → 质心"
//! 三步处理为质心记录. patch 偏移以显式参数传入 [`extract_centroids`],
//! 因此各 patch 可以任意顺序、并行处理.

mod centroid;
mod detector;
mod error;
pub mod filters;
mod instance;
pub mod morph;
mod raw;
mod watershed;

pub use centroid::{extract_centroids, CentroidRecord, CentroidTable};
pub use detector::{NucleusDetector, PatchGrid};
pub use error::{PostProcError, PostProcResult};
pub use instance::{
    assign_nuclear_types, instance_map, post_process, InstanceInfo, InstanceMap,
    InstanceMapConfig,
};
pub use raw::{save_predictions, NpzPredictions, RawPrediction, Segmenter};
#[doc(hidden)]
pub use raw::testing;
pub use watershed::watershed;

use crate::consts::rgb::{Rgb, NUCLEUS_PALETTE};
use crate::consts::NUCLEUS_TYPES;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// 细胞核类别, 取值 `1..=4`.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NucleusType(u8);

impl NucleusType {
    /// 合法时返回 `Some`.
    #[inline]
    pub fn new(kind: u8) -> Option<Self> {
        (1..=NUCLEUS_TYPES).contains(&kind).then_some(Self(kind))
    }

    /// 类别编号.
    #[inline]
    pub fn get(self) -> u8 {
        self.0
    }

    /// 绘图颜色: 蓝, 金, 草绿, 红.
    #[inline]
    pub fn color(self) -> Rgb {
        NUCLEUS_PALETTE[(self.0 - 1) as usize]
    }

    /// 所有类别, 升序.
    pub fn all() -> impl Iterator<Item = Self> {
        (1..=NUCLEUS_TYPES).map(Self)
    }
}

impl TryFrom<u8> for NucleusType {
    type Error = u8;

    fn try_from(kind: u8) -> Result<Self, u8> {
        Self::new(kind).ok_or(kind)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nucleus_type() {
        assert!(NucleusType::new(0).is_none());
        assert!(NucleusType::new(5).is_none());
        assert_eq!(NucleusType::new(3).map(|t| t.get()), Some(3));
        assert_eq!(NucleusType::try_from(9), Err(9));
        assert_eq!(NucleusType::all().count(), 4);
        assert_eq!(
            NucleusType::new(4).unwrap().color(),
            crate::consts::rgb::RED
        );
    }
}
