use crate::args::CmdResult;
use clap::Args;
use ndarray::{s, Array2};
use ndarray_npy::{read_npy, write_npy};
use std::path::PathBuf;

#[derive(Args, Debug)]
pub struct Pca {
    /// `(n_samples, n_features)` 特征矩阵 (npy, f64).
    #[arg(long, short)]
    input: PathBuf,

    /// 主成分个数.
    #[arg(long, short = 'n', default_value_t = 4)]
    components: usize,

    /// 只使用前若干个特征列.
    #[arg(long)]
    features: Option<usize>,

    /// 只使用前若干个样本.
    #[arg(long)]
    samples: Option<usize>,

    /// 投影结果保存路径 (npy).
    #[arg(long, short)]
    output: Option<PathBuf>,
}

impl Pca {
    pub fn run(&self) -> CmdResult {
        let x: Array2<f64> = read_npy(&self.input)?;
        let (n, f) = x.dim();
        let n = self.samples.map_or(n, |v| v.min(n));
        let f = self.features.map_or(f, |v| v.min(f));
        let x = x.slice(s![..n, ..f]);

        let (fitted, projected) = wsi_berry::features::Pca::new(self.components).fit_transform(x)?;
        println!(
            "Explained variation per principal component: {}",
            fitted.explained_variance_ratio()
        );
        println!("{projected:.4}");
        if let Some(p) = &self.output {
            write_npy(p, &projected)?;
        }
        Ok(())
    }
}
