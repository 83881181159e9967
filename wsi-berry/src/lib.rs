#![warn(missing_docs)] // <= 合适时移除它.
// #![warn(clippy::missing_docs_in_private_items)]  // <= too strict.

//! 核心库. 提供全切片病理图像 (WSI) 的金字塔读取、并行分块加载、
//! 细胞核检测后处理以及空间 k-NN 图分析.
//!
//! 该 crate 目前仅提供 `safe` 接口.
//!
//! # 注意
//!
//! 1. 模型推理不在本 crate 内完成. 细胞核分割网络的原始输出通过
//!   [`nucleus::Segmenter`] 接入 (例如从导出的 `.npz` 文件读取).
//! 2. 切片坐标一律以 **第 0 层** 像素表示, 形如 `(x, y)`; 数组索引形如 `(h, w)`.
//!   两者不要混用, 见 [`XY`] 与 [`Idx2d`].
//! 3. 在非期望情况下 (文档中 `# 注意` 一节所述), 程序会直接 panic, 而不会导致内存错误.
//!
//! # 模块
//!
//! ### 金字塔读取与计时 ✅
//!
//! 两种后端 (普通栅格图像自建金字塔, `.npz` 存储的多层数组), 以及按层级计时读取.
//!
//! 实现位于 `wsi-berry/src/slide` 与 `wsi-berry/src/timing.rs`.
//!
//! ### 并行分块读取 ✅
//!
//! 按列条带划分一整层, 固定大小线程池读取, 显式收集每个条带的错误;
//! 以及 patch 内小块的组织阈值筛选.
//!
//! 实现位于 `wsi-berry/src/tiling`.
//!
//! ### 强度归一化 ✅
//!
//! 实现位于 `wsi-berry/src/normalize.rs`.
//!
//! ### 细胞核后处理 ✅
//!
//! 实例图 (sobel + marker 分水岭) → 类别判定 → 带显式偏移的质心提取.
//!
//! 实现位于 `wsi-berry/src/nucleus`.
//!
//! ### k-NN 图与 k-core ✅
//!
//! 实现位于 `wsi-berry/src/graph`.
//!
//! ### PCA ✅
//!
//! 实现位于 `wsi-berry/src/features`.

/// 二维数组索引 `(h, w)`.
pub type Idx2d = (usize, usize);

/// 切片像素坐标 `(x, y)`.
pub type XY = (usize, usize);

/// 二维尺寸 (宽, 高).
pub type Size2d = (usize, usize);

pub mod consts;
pub mod features;
pub mod graph;
pub mod normalize;
pub mod nucleus;
pub mod prelude;
pub mod slide;
pub mod store;
pub mod tiling;
pub mod timing;
