use crate::args::{CmdResult, RoiArgs, SlideArgs};
use clap::Args;
use std::num::NonZeroUsize;
use std::path::PathBuf;
use utils::loader;
use wsi_berry::consts::DEFAULT_PATCH_SIZE;
use wsi_berry::nucleus::{
    CentroidTable, InstanceMapConfig, NpzPredictions, NucleusDetector, PatchGrid,
};
use wsi_berry::slide::PyramidRead;
use wsi_berry::store::{self, write_table_tsv};

#[derive(Args, Debug)]
pub struct Nuclei {
    #[command(flatten)]
    slide: SlideArgs,

    #[command(flatten)]
    roi: RoiArgs,

    /// 导出的分割网络原始输出 (npz).
    #[arg(long, short)]
    predictions: PathBuf,

    /// patch 边长.
    #[arg(long, default_value_t = DEFAULT_PATCH_SIZE)]
    patch_size: usize,

    /// 质心表保存路径. 缺省时为数据目录下的 `centroids.bin`.
    #[arg(long, short)]
    output: Option<PathBuf>,

    /// 同时导出 TSV.
    #[arg(long)]
    tsv: Option<PathBuf>,
}

impl Nuclei {
    pub fn run(&self) -> CmdResult {
        if self.patch_size == 0 {
            return Err("patch size must be positive".into());
        }
        let slide = loader::open_slide_or_default(self.slide.slide.as_deref())?;
        let (origin, size) = self.roi.resolve(slide.checked_level(0)?);
        let grid = PatchGrid::new(origin, size, self.patch_size);

        let workers = NonZeroUsize::new(utils::cpus()).unwrap_or(NonZeroUsize::MIN);
        let predictions = NpzPredictions::open(workers, &self.predictions)?;
        let detector = NucleusDetector::new(predictions, InstanceMapConfig::default());
        let table = CentroidTable::from(detector.par_detect(&slide, &grid)?);

        for (kind, n) in table.kind_histogram().iter().enumerate().skip(1) {
            println!("type {kind}: {n} nuclei");
        }
        let out = self
            .output
            .clone()
            .unwrap_or_else(|| loader::data_file("centroids.bin"));
        store::save(&out, &table)?;
        if let Some(p) = &self.tsv {
            write_table_tsv(std::io::BufWriter::new(std::fs::File::create(p)?), &table)?;
        }
        Ok(())
    }
}
