pub mod core_numbers;
pub mod graph;
pub mod normalize;
pub mod nuclei;
pub mod pca;
pub mod resolution;
pub mod strips;
pub mod tiles;
