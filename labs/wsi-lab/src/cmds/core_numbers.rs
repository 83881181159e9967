use crate::args::CmdResult;
use crate::report;
use clap::Args;
use std::path::PathBuf;
use utils::loader;
use wsi_berry::consts::rgb::NUCLEUS_PALETTE;
use wsi_berry::consts::{DEFAULT_DISTANCE_THRESHOLD, NUCLEUS_KNN_K};
use wsi_berry::graph::{mean_core_numbers_by_type, render_bar_chart};
use wsi_berry::nucleus::CentroidTable;
use wsi_berry::store;

#[derive(Args, Debug)]
pub struct CoreNumbers {
    /// 质心表. 缺省时为数据目录下的 `centroids.bin`.
    #[arg(long, short)]
    input: Option<PathBuf>,

    /// 近邻数 (含自身).
    #[arg(long, short, default_value_t = NUCLEUS_KNN_K)]
    k: usize,

    /// 距离阈值 (像素).
    #[arg(long, default_value_t = DEFAULT_DISTANCE_THRESHOLD)]
    threshold: f64,

    /// 柱状图保存路径.
    #[arg(long, short)]
    output: Option<PathBuf>,
}

impl CoreNumbers {
    pub fn run(&self) -> CmdResult {
        let p = self
            .input
            .clone()
            .unwrap_or_else(|| loader::data_file("centroids.bin"));
        let table: CentroidTable = store::load(p)?;
        let means = mean_core_numbers_by_type(&table.records, self.k, self.threshold)?;
        report::print_with(|w| report::describe_core_numbers(&means, w))?;

        if let Some(out) = &self.output {
            render_bar_chart(&means, &NUCLEUS_PALETTE, (400, 300)).save(out)?;
            log::info!("saved {}", out.display());
        }
        Ok(())
    }
}
