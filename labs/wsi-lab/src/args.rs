use crate::cmds;
use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// 子命令的统一返回类型.
pub type CmdResult<T = ()> = Result<T, Box<dyn std::error::Error>>;

#[derive(Parser, Debug)]
#[command(name = "wsi-lab")]
#[command(about = "全切片病理图像 (WSI) 的读取、分块、细胞核与 k-NN 图实验.")]
#[command(version, long_about = None)]
pub struct Cli {
    /// 输出 debug 级别日志.
    #[arg(long, short, global = true)]
    pub verbose: bool,

    /// 子命令.
    #[command(subcommand)]
    command: Commands,
}

impl Cli {
    pub fn run_program(&self) -> CmdResult {
        match &self.command {
            Commands::Resolution(v) => v.run(),
            Commands::Strips(v) => v.run(),
            Commands::Tiles(v) => v.run(),
            Commands::Normalize(v) => v.run(),
            Commands::Nuclei(v) => v.run(),
            Commands::Graph(v) => v.run(),
            Commands::CoreNumbers(v) => v.run(),
            Commands::Pca(v) => v.run(),
        }
    }
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 对每个层级整层读取并计时.
    Resolution(cmds::resolution::Resolution),
    /// 用固定大小线程池按列条带并行读取一整层.
    Strips(cmds::strips::Strips),
    /// 在 ROI 内按组织阈值筛选小块, 保存 tile 索引.
    Tiles(cmds::tiles::Tiles),
    /// 对图像做强度归一化并保存可视化结果.
    Normalize(cmds::normalize::Normalize),
    /// 对导出的分割网络原始输出做后处理, 保存质心表.
    Nuclei(cmds::nuclei::Nuclei),
    /// 构建并绘制 k-NN 图.
    Graph(cmds::graph::Graph),
    /// 各类细胞核 k-NN 图的平均 core number 柱状图.
    CoreNumbers(cmds::core_numbers::CoreNumbers),
    /// 对特征矩阵做 PCA.
    Pca(cmds::pca::Pca),
}

/// 切片来源.
#[derive(Args, Debug)]
pub struct SlideArgs {
    /// 切片文件. 缺省时读取 `$WSI_SLIDE`, 再退回 `$HOME/dataset/wsi/patient_100_node_0.tif`.
    #[arg(long, short)]
    pub slide: Option<PathBuf>,
}

/// 第 0 层上的矩形感兴趣区域.
#[derive(Args, Debug, Clone, Copy)]
pub struct RoiArgs {
    /// ROI 左上角 x.
    #[arg(long, default_value_t = 0)]
    pub x: usize,
    /// ROI 左上角 y.
    #[arg(long, default_value_t = 0)]
    pub y: usize,
    /// ROI 宽度. 缺省时取到第 0 层右边界.
    #[arg(long)]
    pub width: Option<usize>,
    /// ROI 高度. 缺省时取到第 0 层下边界.
    #[arg(long)]
    pub height: Option<usize>,
}

impl RoiArgs {
    /// 以第 0 层尺寸 `(w, h)` 补全缺省值, 返回 `((x, y), (w, h))`.
    pub fn resolve(&self, (w, h): (usize, usize)) -> ((usize, usize), (usize, usize)) {
        let rw = self.width.unwrap_or_else(|| w.saturating_sub(self.x));
        let rh = self.height.unwrap_or_else(|| h.saturating_sub(self.y));
        ((self.x, self.y), (rw, rh))
    }
}

/// k-NN 图的节点来源.
#[derive(ValueEnum, Clone, Copy, Debug)]
pub enum GraphSource {
    /// tile 索引.
    Tiles,
    /// 细胞核质心表.
    Nuclei,
}
