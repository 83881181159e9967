//! 切片的并行分块读取.
//!
//! 包含两种读取模式:
//!
//! 1. 把一整层按列划分为若干竖直条带, 由固定大小的线程池并行读取后拼接 ([`StripLoader`]);
//! 2. 在若干 patch 内按固定边长生成小块, 并行读取并按组织阈值筛选 ([`par_threshold_tiles`]).

mod partition;
mod pool;
mod threshold;

pub use partition::{chunk_evenly, partition_strips, tile_origins, StripTask};
pub use pool::{LoadError, StripFailure, StripLoadReport, StripLoader};
#[cfg(feature = "rayon")]
pub use threshold::par_threshold_tiles;
pub use threshold::{compile_results, threshold_tiles, Tile, TileIndex, TissueThreshold};
