use crate::args::{CmdResult, SlideArgs};
use crate::report;
use clap::Args;
use std::path::PathBuf;
use std::sync::Arc;
use utils::loader;
use wsi_berry::timing::timed;
use wsi_berry::tiling::StripLoader;

#[derive(Args, Debug)]
pub struct Strips {
    #[command(flatten)]
    slide: SlideArgs,

    /// 读取的层级.
    #[arg(long, short, default_value_t = 0)]
    level: usize,

    /// 工作线程数. 缺省时为可并行核心数.
    #[arg(long, short)]
    workers: Option<usize>,

    /// 拼接结果的保存路径.
    #[arg(long, short)]
    output: Option<PathBuf>,
}

impl Strips {
    pub fn run(&self) -> CmdResult {
        let slide = Arc::new(loader::open_slide_or_default(self.slide.slide.as_deref())?);
        let workers = self.workers.unwrap_or_else(utils::cpus);
        let loader = StripLoader::new(slide, workers);

        let (report, total) = timed(|| loader.load_level(self.level));
        let report = report?;
        report::print_with(|w| report::describe_strips(&report, total, w))?;

        if !report.is_complete() {
            log::warn!("{} strips failed", report.failures.len());
        }
        if let Some(p) = &self.output {
            report.image.save(p)?;
            log::info!("saved {}", p.display());
        }
        Ok(())
    }
}
