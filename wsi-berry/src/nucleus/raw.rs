//! 分割网络的原始输出, 以及外部推理接口.

use super::{PostProcError, PostProcResult};
use crate::slide::RgbRegion;
use crate::{Idx2d, XY};
use ndarray::{Array3, Ix3, OwnedRepr};
use ndarray_npy::{NpzReader, NpzWriter};
use std::fs::{File, OpenOptions};
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// 一个 patch 的三张原始预测图, 形状均为 `(c, h, w)`.
#[derive(Clone, Debug, PartialEq)]
pub struct RawPrediction {
    nucleus_prediction: Array3<f32>,
    horizontal_vertical: Array3<f32>,
    type_prediction: Array3<f32>,
}

impl RawPrediction {
    /// 校验并组合三张预测图.
    ///
    /// `nucleus_prediction` 为 `(2, h, w)` 的前景/背景 logits,
    /// `horizontal_vertical` 为 `(2, h, w)` 的水平/竖直距离图,
    /// `type_prediction` 为 `(c, h, w)` 的类别 logits (`c >= 1`, 通道 0 为背景).
    pub fn new(
        nucleus_prediction: Array3<f32>,
        horizontal_vertical: Array3<f32>,
        type_prediction: Array3<f32>,
    ) -> PostProcResult<Self> {
        let (c, h, w) = nucleus_prediction.dim();
        if c != 2 {
            return Err(PostProcError::BadShape(
                "nucleus_prediction",
                nucleus_prediction.shape().to_vec(),
            ));
        }
        let (c, hh, ww) = horizontal_vertical.dim();
        if c != 2 {
            return Err(PostProcError::BadShape(
                "horizontal_vertical",
                horizontal_vertical.shape().to_vec(),
            ));
        }
        if (hh, ww) != (h, w) {
            return Err(PostProcError::SizeMismatch((h, w), (hh, ww)));
        }
        let (c, th, tw) = type_prediction.dim();
        if c == 0 {
            return Err(PostProcError::BadShape(
                "type_prediction",
                type_prediction.shape().to_vec(),
            ));
        }
        if (th, tw) != (h, w) {
            return Err(PostProcError::SizeMismatch((h, w), (th, tw)));
        }
        Ok(Self {
            nucleus_prediction,
            horizontal_vertical,
            type_prediction,
        })
    }

    /// 空间尺寸 `(h, w)`.
    #[inline]
    pub fn shape(&self) -> Idx2d {
        let (_, h, w) = self.nucleus_prediction.dim();
        (h, w)
    }

    /// 前景/背景 logits.
    #[inline]
    pub fn nucleus_prediction(&self) -> &Array3<f32> {
        &self.nucleus_prediction
    }

    /// 水平/竖直距离图.
    #[inline]
    pub fn horizontal_vertical(&self) -> &Array3<f32> {
        &self.horizontal_vertical
    }

    /// 类别 logits.
    #[inline]
    pub fn type_prediction(&self) -> &Array3<f32> {
        &self.type_prediction
    }
}

/// 外部推理: 给定 patch 的第 0 层位置与像素, 产生原始预测图.
pub trait Segmenter: Send + Sync {
    /// 对位于 `location` 的 `patch` 推理.
    fn predict(&self, location: XY, patch: &RgbRegion) -> PostProcResult<RawPrediction>;
}

impl<S: Segmenter + ?Sized> Segmenter for &S {
    #[inline]
    fn predict(&self, location: XY, patch: &RgbRegion) -> PostProcResult<RawPrediction> {
        (**self).predict(location, patch)
    }
}

const FIELDS: [&str; 3] = [
    "nucleus_prediction",
    "horizontal_vertical",
    "type_prediction",
];

/// 数组名 `{x}_{y}_{field}` (不含 `.npy` 后缀).
#[inline]
fn entry_name((x, y): XY, field: &str) -> String {
    format!("{x}_{y}_{field}")
}

/// 在归档文件名列表中查找数组 `stem`, 兼容带或不带 `.npy` 后缀的两种写法.
fn resolve<'a>(names: &'a [String], stem: &str) -> Option<&'a str> {
    names
        .iter()
        .find(|n| n.strip_suffix(".npy").unwrap_or(n.as_str()) == stem)
        .map(String::as_str)
}

/// 预先导出到 npz 归档中的推理结果.
///
/// 每个 patch 位置 `(x, y)` 对应三个数组 `{x}_{y}_nucleus_prediction`,
/// `{x}_{y}_horizontal_vertical`, `{x}_{y}_type_prediction`.
/// 内部持有若干个独立的读取通道, 以轮转方式分配给并发的调用者.
pub struct NpzPredictions {
    entries: Vec<Mutex<NpzReader<File>>>,
    turn: AtomicUsize,
}

impl NpzPredictions {
    /// 从路径 `p` 打开 `workers` 个读取通道.
    pub fn open<P: AsRef<Path>>(workers: NonZeroUsize, p: P) -> PostProcResult<Self> {
        let workers = workers.get();
        let mut v = Vec::with_capacity(workers);
        for _ in 0..workers {
            let file = OpenOptions::new().read(true).open(p.as_ref())?;
            v.push(Mutex::new(NpzReader::new(file)?));
        }
        Ok(Self {
            entries: v,
            turn: AtomicUsize::new(0),
        })
    }

    /// 读取通道个数.
    #[inline]
    pub fn worker_len(&self) -> usize {
        self.entries.len()
    }

    /// 归档中所有 patch 位置, 升序.
    pub fn locations(&self) -> PostProcResult<Vec<XY>> {
        let names = self.with_reader(|r| r.names())?;
        let suffix = format!("_{}", FIELDS[0]);
        let mut ans: Vec<XY> = names
            .iter()
            .filter_map(|n| {
                let stem = n.strip_suffix(".npy").unwrap_or(n.as_str());
                let (x, y) = stem.strip_suffix(suffix.as_str())?.split_once('_')?;
                Some((x.parse().ok()?, y.parse().ok()?))
            })
            .collect();
        ans.sort_unstable();
        Ok(ans)
    }

    /// 读取 `location` 处的三张预测图.
    pub fn get(&self, location: XY) -> PostProcResult<RawPrediction> {
        let [np, hv, tp] = FIELDS.map(|f| entry_name(location, f));
        self.with_reader(|r| {
            let names = r.names()?;
            let mut load = |stem: &str| -> PostProcResult<Array3<f32>> {
                let name = resolve(&names, stem)
                    .ok_or_else(|| PostProcError::MissingPrediction(stem.to_string()))?;
                Ok(r.by_name::<OwnedRepr<f32>, Ix3>(name)?)
            };
            RawPrediction::new(load(&np)?, load(&hv)?, load(&tp)?)
        })
    }

    fn with_reader<T, E>(
        &self,
        f: impl FnOnce(&mut NpzReader<File>) -> Result<T, E>,
    ) -> Result<T, E> {
        let slot = self.turn.fetch_add(1, Ordering::Relaxed) % self.worker_len();
        // 其它线程 panic 不会破坏 reader 本身, 继续使用.
        let mut guard = self.entries[slot]
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        f(&mut guard)
    }
}

impl Segmenter for NpzPredictions {
    fn predict(&self, location: XY, _patch: &RgbRegion) -> PostProcResult<RawPrediction> {
        self.get(location)
    }
}

/// 把若干 patch 的预测图导出为 [`NpzPredictions`] 可读取的 npz 归档.
pub fn save_predictions<'a, P, I>(path: P, predictions: I) -> PostProcResult<()>
where
    P: AsRef<Path>,
    I: IntoIterator<Item = (XY, &'a RawPrediction)>,
{
    let mut npz = NpzWriter::new(File::create(path.as_ref())?);
    for (loc, pred) in predictions {
        let arrays = [
            &pred.nucleus_prediction,
            &pred.horizontal_vertical,
            &pred.type_prediction,
        ];
        for (field, arr) in FIELDS.iter().zip(arrays) {
            npz.add_array(entry_name(loc, field), arr)?;
        }
    }
    npz.finish()?;
    Ok(())
}

/// 合成预测图, 供测试构造已知答案的输入.
#[doc(hidden)]
pub mod testing {
    use super::RawPrediction;
    use ndarray::{Array3, Axis};

    /// 构造含若干个圆形细胞核的 `size` 见方合成预测, 类别通道数为 5.
    ///
    /// 对每个 `(cy, cx, r, kind)`: 前景 logits 在圆内指向前景;
    /// 水平/竖直距离图为圆内像素相对圆心的归一化偏移; 类别 logits 在圆内指向 `kind`.
    ///
    /// # 注意
    ///
    /// `r` 为 0 或 `kind > 4` 时程序 panic.
    pub fn synthetic(size: usize, nuclei: &[(usize, usize, usize, u8)]) -> RawPrediction {
        let mut np = Array3::<f32>::zeros((2, size, size));
        np.index_axis_mut(Axis(0), 0).fill(1.0);
        let mut hv = Array3::<f32>::zeros((2, size, size));
        let mut tp = Array3::<f32>::zeros((5, size, size));
        tp.index_axis_mut(Axis(0), 0).fill(1.0);

        for &(cy, cx, r, kind) in nuclei {
            assert!(r > 0 && kind <= 4, "非法的合成细胞核 ({cy}, {cx}, {r}, {kind})");
            for y in 0..size {
                for x in 0..size {
                    let (dy, dx) = (y as f32 - cy as f32, x as f32 - cx as f32);
                    if dy * dy + dx * dx <= (r * r) as f32 {
                        np[(0, y, x)] = 0.0;
                        np[(1, y, x)] = 1.0;
                        hv[(0, y, x)] = dx / r as f32;
                        hv[(1, y, x)] = dy / r as f32;
                        tp[(0, y, x)] = 0.0;
                        tp[(kind as usize, y, x)] = 1.0;
                    }
                }
            }
        }
        // 三张图形状一致, 无需再校验.
        RawPrediction {
            nucleus_prediction: np,
            horizontal_vertical: hv,
            type_prediction: tp,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zeros(c: usize, h: usize, w: usize) -> Array3<f32> {
        Array3::zeros((c, h, w))
    }

    #[test]
    fn test_shape_validation() {
        assert!(RawPrediction::new(zeros(2, 4, 4), zeros(2, 4, 4), zeros(5, 4, 4)).is_ok());
        assert!(matches!(
            RawPrediction::new(zeros(3, 4, 4), zeros(2, 4, 4), zeros(5, 4, 4)),
            Err(PostProcError::BadShape("nucleus_prediction", _))
        ));
        assert!(matches!(
            RawPrediction::new(zeros(2, 4, 4), zeros(2, 4, 5), zeros(5, 4, 4)),
            Err(PostProcError::SizeMismatch((4, 4), (4, 5)))
        ));
        assert!(RawPrediction::new(zeros(2, 4, 4), zeros(2, 4, 4), zeros(0, 4, 4)).is_err());
    }

    #[test]
    fn test_npz_predictions_roundtrip() {
        let mut path = std::env::temp_dir();
        path.push(format!("wsi-berry-predictions-{}.npz", std::process::id()));

        let mut tp = zeros(5, 3, 3);
        tp[(2, 1, 1)] = 4.0;
        let a = RawPrediction::new(zeros(2, 3, 3), zeros(2, 3, 3), tp).unwrap();
        let b = RawPrediction::new(zeros(2, 3, 3), zeros(2, 3, 3), zeros(5, 3, 3)).unwrap();
        save_predictions(&path, [((256, 0), &a), ((0, 256), &b)]).unwrap();

        let store = NpzPredictions::open(NonZeroUsize::new(2).unwrap(), &path).unwrap();
        assert_eq!(store.worker_len(), 2);
        assert_eq!(store.locations().unwrap(), vec![(0, 256), (256, 0)]);
        assert_eq!(store.get((256, 0)).unwrap(), a);
        assert_eq!(store.get((0, 256)).unwrap(), b);
        assert!(matches!(
            store.get((1, 1)),
            Err(PostProcError::MissingPrediction(_))
        ));
        std::fs::remove_file(&path).ok();
    }
}
