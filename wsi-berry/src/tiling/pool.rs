//! 有界线程池并行读取一整层.

use super::partition::{partition_strips, StripTask};
use crate::slide::{to_level0_coord, PyramidRead, ReadError, ReadResult, RgbRegion};
use crate::timing::timed;
use ndarray::s;
use std::fmt::{self, Display, Formatter};
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;
use threadpool::ThreadPool;

/// 单个条带任务失败的原因.
#[derive(Debug)]
pub enum LoadError {
    /// 读取出错.
    Read(ReadError),

    /// 工作线程在返回结果前退出 (panic).
    WorkerLost,
}

impl Display for LoadError {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Read(e) => write!(f, "read failed: {e}"),
            Self::WorkerLost => f.write_str("worker exited without reporting a result"),
        }
    }
}

impl std::error::Error for LoadError {}

/// 失败的条带.
#[derive(Debug)]
pub struct StripFailure {
    /// 对应任务.
    pub task: StripTask,

    /// 失败原因.
    pub error: LoadError,
}

/// 一次整层并行读取的汇总.
#[derive(Debug)]
pub struct StripLoadReport {
    /// 拼接好的整层图像. 失败条带所在的列保持白色背景.
    pub image: RgbRegion,

    /// 成功条带及其读取耗时, 按任务序号升序.
    pub timings: Vec<(StripTask, Duration)>,

    /// 失败条带, 按任务序号升序.
    pub failures: Vec<StripFailure>,
}

impl StripLoadReport {
    /// 所有条带是否均读取成功.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }

    /// 单个条带的最长读取耗时.
    pub fn slowest(&self) -> Option<Duration> {
        self.timings.iter().map(|(_, d)| *d).max()
    }
}

/// 工作线程发回的消息.
struct StripOutcome {
    task: StripTask,
    elapsed: Duration,
    result: ReadResult<RgbRegion>,
}

/// 以竖直条带为任务单位、由固定大小线程池消费任务队列的整层读取器.
///
/// 每个任务显式携带 `(x, width)`; 结果与错误经由通道回到调用者,
/// 由调用者写入输出图像, 工作线程之间不共享可变状态.
pub struct StripLoader<R> {
    reader: Arc<R>,
    workers: usize,
}

impl<R: PyramidRead + 'static> StripLoader<R> {
    /// 以 `workers` 个工作线程初始化. `workers` 为 0 时视为 1.
    pub fn new(reader: Arc<R>, workers: usize) -> Self {
        Self {
            reader,
            workers: workers.max(1),
        }
    }

    /// 以逻辑核心数个工作线程初始化.
    pub fn with_default_workers(reader: Arc<R>) -> Self {
        Self::new(reader, num_cpus::get())
    }

    /// 工作线程数.
    #[inline]
    pub fn workers(&self) -> usize {
        self.workers
    }

    /// 把第 `level` 层划分为 `self.workers()` 个条带并行读取, 然后拼接.
    ///
    /// 层级越界时直接返回错误; 单个条带的错误不会中断其它条带,
    /// 而是收集在 [`StripLoadReport::failures`] 中.
    pub fn load_level(&self, level: usize) -> ReadResult<StripLoadReport> {
        let (width, height) = self.reader.checked_level(level)?;
        let downsample = self.reader.level_downsample(level).unwrap_or(1.0);
        let tasks = partition_strips(width, self.workers);
        log::info!(
            "loading level {level} ({width} x {height}) as {} strips on {} workers",
            tasks.len(),
            self.workers
        );

        let pool = ThreadPool::new(self.workers);
        let (tx, rx) = mpsc::channel::<StripOutcome>();
        for task in tasks.iter().copied() {
            let tx = tx.clone();
            let reader = Arc::clone(&self.reader);
            pool.execute(move || {
                log::debug!("strip {} starting at x = {}", task.index, task.x);
                // 条带坐标位于目标层级, 读取起点需换算回第 0 层.
                let x0 = to_level0_coord(task.x, downsample);
                let (result, elapsed) =
                    timed(|| reader.read_region((x0, 0), level, (task.width, height)));
                log::debug!(
                    "strip {} finished, running time = {} us",
                    task.index,
                    elapsed.as_micros()
                );
                // 接收端只会在所有结果收齐后才关闭.
                let _ = tx.send(StripOutcome {
                    task,
                    elapsed,
                    result,
                });
            });
        }
        drop(tx);

        let mut outcomes: Vec<StripOutcome> = rx.iter().collect();
        pool.join();
        outcomes.sort_unstable_by_key(|o| o.task.index);

        let mut image = RgbRegion::background((width, height));
        let mut timings = Vec::with_capacity(tasks.len());
        let mut failures = Vec::new();
        let mut reported = vec![false; tasks.len()];

        for StripOutcome {
            task,
            elapsed,
            result,
        } in outcomes
        {
            reported[task.index] = true;
            match result {
                Ok(region) => {
                    image
                        .view_mut()
                        .slice_mut(s![.., task.x..task.end(), ..])
                        .assign(&region.view());
                    timings.push((task, elapsed));
                }
                Err(e) => {
                    log::warn!("strip {} failed: {e}", task.index);
                    failures.push(StripFailure {
                        task,
                        error: LoadError::Read(e),
                    });
                }
            }
        }

        for task in tasks.iter().filter(|t| !reported[t.index]) {
            log::warn!("strip {} lost its worker", task.index);
            failures.push(StripFailure {
                task: *task,
                error: LoadError::WorkerLost,
            });
        }
        failures.sort_unstable_by_key(|f| f.task.index);

        Ok(StripLoadReport {
            image,
            timings,
            failures,
        })
    }
}
