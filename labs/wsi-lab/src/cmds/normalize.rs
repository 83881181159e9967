use crate::args::CmdResult;
use clap::Args;
use std::path::PathBuf;
use wsi_berry::normalize::{region_to_chw, to_display, NormalizeIntensity};
use wsi_berry::slide::RgbRegion;

#[derive(Args, Debug)]
pub struct Normalize {
    /// 输入图像.
    #[arg(long, short)]
    input: PathBuf,

    /// 输出图像.
    #[arg(long, short)]
    output: PathBuf,

    /// 只用非零像素计算统计量.
    #[arg(long)]
    nonzero: bool,

    /// 每个通道单独归一化.
    #[arg(long)]
    channel_wise: bool,
}

impl Normalize {
    pub fn run(&self) -> CmdResult {
        let img = image::open(&self.input)?.to_rgb8();
        let chw = region_to_chw(&RgbRegion::from_image(&img));
        let t = NormalizeIntensity {
            nonzero: self.nonzero,
            channel_wise: self.channel_wise,
        };
        let normalized = t.apply(&chw.view());
        let display = to_display(&normalized.view()).ok_or("unsupported channel count")?;
        display.save(&self.output)?;
        log::info!("saved {}", self.output.display());
        Ok(())
    }
}
