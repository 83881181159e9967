use crate::args::{CmdResult, RoiArgs, SlideArgs};
use clap::Args;
use std::path::PathBuf;
use utils::loader;
use wsi_berry::consts::{DEFAULT_PATCH_SIZE, DEFAULT_TILE_SIZE};
use wsi_berry::nucleus::PatchGrid;
use wsi_berry::slide::PyramidRead;
use wsi_berry::store;
use wsi_berry::tiling::{chunk_evenly, par_threshold_tiles, tile_origins, TileIndex, TissueThreshold};

#[derive(Args, Debug)]
pub struct Tiles {
    #[command(flatten)]
    slide: SlideArgs,

    #[command(flatten)]
    roi: RoiArgs,

    /// patch 边长.
    #[arg(long, default_value_t = DEFAULT_PATCH_SIZE)]
    patch_size: usize,

    /// 小块边长.
    #[arg(long, default_value_t = DEFAULT_TILE_SIZE)]
    tile_size: usize,

    /// 背景亮度阈值, 亮度低于它的像素视为组织.
    #[arg(long, default_value_t = TissueThreshold::default().background_luma)]
    background_luma: f64,

    /// 组织像素占比阈值.
    #[arg(long, default_value_t = TissueThreshold::default().min_tissue_fraction)]
    min_tissue_fraction: f64,

    /// tile 索引保存路径. 缺省时为数据目录下的 `tiles_xy.bin`.
    #[arg(long, short)]
    output: Option<PathBuf>,
}

impl Tiles {
    pub fn run(&self) -> CmdResult {
        if self.patch_size == 0 || self.tile_size == 0 {
            return Err("patch size and tile size must be positive".into());
        }
        let slide = loader::open_slide_or_default(self.slide.slide.as_deref())?;
        let (origin, size) = self.roi.resolve(slide.checked_level(0)?);
        let patches = PatchGrid::new(origin, size, self.patch_size).locations();
        let starts = tile_origins(&patches, self.patch_size, self.tile_size);
        let chunks = chunk_evenly(&starts, utils::cpus());
        log::info!(
            "{} patches, {} tiles in {} chunks",
            patches.len(),
            starts.len(),
            chunks.len()
        );

        let threshold = TissueThreshold {
            background_luma: self.background_luma,
            min_tissue_fraction: self.min_tissue_fraction,
        };
        let tiles = par_threshold_tiles(&slide, &chunks, self.tile_size, &threshold)?;
        let index: TileIndex = tiles.iter().collect();
        println!("{} of {} tiles hold tissue", index.len(), starts.len());

        let out = self
            .output
            .clone()
            .unwrap_or_else(|| loader::data_file("tiles_xy.bin"));
        store::save(&out, &index)?;
        Ok(())
    }
}
