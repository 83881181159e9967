//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::{Idx2d, Size2d, XY};

pub use crate::slide::{open_slide, AnySlide, Backend, PyramidRead, ReadError, RgbRegion};
pub use crate::timing::{time_all_levels, time_loading_at_resolution, ResolutionProfile};

pub use crate::tiling::{StripLoader, TileIndex, TissueThreshold};

pub use crate::normalize::NormalizeIntensity;

pub use crate::nucleus::{
    extract_centroids, CentroidRecord, CentroidTable, InstanceMapConfig, NucleusDetector,
    NucleusType, PatchGrid, Segmenter,
};

pub use crate::graph::{
    mean_core_numbers_by_type, nucleus_graph, tile_graph, KnnGraph, NearestNeighbors,
};

pub use crate::features::Pca;
