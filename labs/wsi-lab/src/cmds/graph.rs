use crate::args::{CmdResult, GraphSource};
use clap::Args;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use utils::loader;
use wsi_berry::consts::{DEFAULT_DISTANCE_THRESHOLD, NUCLEUS_KNN_K, TILE_KNN_K};
use wsi_berry::graph::{nucleus_graph, render_graph, tile_graph, SpatialGraph};
use wsi_berry::nucleus::CentroidTable;
use wsi_berry::store::{self, write_table_tsv};
use wsi_berry::tiling::TileIndex;

#[derive(Args, Debug)]
pub struct Graph {
    /// 节点来源.
    #[arg(long, value_enum, default_value_t = GraphSource::Nuclei)]
    source: GraphSource,

    /// tile 索引或质心表. 缺省时为数据目录下的 `tiles_xy.bin` / `centroids.bin`.
    #[arg(long, short)]
    input: Option<PathBuf>,

    /// 细胞核类别 (1..=4), 仅用于细胞核图.
    #[arg(long = "type", short, default_value_t = 4)]
    kind: u8,

    /// 近邻数 (含自身). 缺省时细胞核图为 5, tile 图为 3.
    #[arg(long, short)]
    k: Option<usize>,

    /// 距离阈值 (像素), 仅用于细胞核图.
    #[arg(long, default_value_t = DEFAULT_DISTANCE_THRESHOLD)]
    threshold: f64,

    /// 图片宽度.
    #[arg(long, default_value_t = 1024)]
    width: usize,

    /// 图片高度.
    #[arg(long, default_value_t = 1024)]
    height: usize,

    /// 绘图保存路径.
    #[arg(long, short)]
    output: PathBuf,

    /// 节点表与边表 TSV 的保存目录.
    #[arg(long)]
    tsv_dir: Option<PathBuf>,
}

impl Graph {
    fn build(&self) -> CmdResult<SpatialGraph> {
        Ok(match self.source {
            GraphSource::Tiles => {
                let p = self
                    .input
                    .clone()
                    .unwrap_or_else(|| loader::data_file("tiles_xy.bin"));
                let index: TileIndex = store::load(p)?;
                tile_graph(&index, self.k.unwrap_or(TILE_KNN_K))?
            }
            GraphSource::Nuclei => {
                let p = self
                    .input
                    .clone()
                    .unwrap_or_else(|| loader::data_file("centroids.bin"));
                let table: CentroidTable = store::load(p)?;
                let k = self.k.unwrap_or(NUCLEUS_KNN_K);
                nucleus_graph(&table.records, self.kind, k, self.threshold)?
            }
        })
    }

    pub fn run(&self) -> CmdResult {
        let g = self.build()?;
        println!(
            "{} nodes, {} edges, {} vertices in graph, mean core number {:?}",
            g.nodes.len(),
            g.edges.len(),
            g.graph.node_count(),
            g.graph.mean_core_number()
        );
        render_graph(&g, (self.width, self.height)).save(&self.output)?;
        log::info!("saved {}", self.output.display());

        if let Some(dir) = &self.tsv_dir {
            std::fs::create_dir_all(dir)?;
            write_table_tsv(BufWriter::new(File::create(dir.join("nodes.tsv"))?), &g.nodes)?;
            write_table_tsv(BufWriter::new(File::create(dir.join("edges.tsv"))?), &g.edges)?;
        }
        Ok(())
    }
}
