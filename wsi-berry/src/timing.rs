//! 不同金字塔层级的整层加载计时.

use crate::slide::{PyramidRead, ReadResult};
use crate::Size2d;
use std::time::{Duration, Instant};

/// 执行 `f`, 返回其结果与墙钟耗时.
#[inline]
pub fn timed<T, F: FnOnce() -> T>(f: F) -> (T, Duration) {
    let since = Instant::now();
    let ans = f();
    (ans, since.elapsed())
}

/// 在第 `level` 层以该层完整宽高读取整幅图像, 返回所用的墙钟时间.
///
/// 层级越界等读取错误原样返回.
pub fn time_loading_at_resolution<R: PyramidRead + ?Sized>(
    reader: &R,
    level: usize,
) -> ReadResult<Duration> {
    let size = reader.checked_level(level)?;
    let (region, d) = timed(|| reader.read_region((0, 0), level, size));
    let region = region?;
    log::debug!(
        "level {level}: loaded {}x{} in {} us",
        region.width(),
        region.height(),
        d.as_micros()
    );
    Ok(d)
}

/// 单层计时结果.
#[derive(Copy, Clone, Debug)]
pub struct LevelTiming {
    /// 层级.
    pub level: usize,

    /// 该层尺寸 (宽, 高).
    pub dimensions: Size2d,

    /// 整层读取耗时.
    pub elapsed: Duration,
}

impl LevelTiming {
    /// 每秒读取的像素数. 耗时为 0 时返回 `None`.
    pub fn pixels_per_second(&self) -> Option<f64> {
        let secs = self.elapsed.as_secs_f64();
        let (w, h) = self.dimensions;
        (secs > 0.0).then(|| (w * h) as f64 / secs)
    }
}

/// 一张切片所有层级的计时结果, 按层级升序.
#[derive(Clone, Debug, Default)]
pub struct ResolutionProfile {
    levels: Vec<LevelTiming>,
    total: Duration,
}

impl ResolutionProfile {
    /// 追加一层的结果, 同时累计总耗时.
    pub fn push(&mut self, timing: LevelTiming) {
        self.total += timing.elapsed;
        self.levels.push(timing);
    }

    /// 各层结果.
    #[inline]
    pub fn levels(&self) -> &[LevelTiming] {
        &self.levels
    }

    /// 所有层级的读取总耗时.
    #[inline]
    pub fn total(&self) -> Duration {
        self.total
    }

    /// 读取最快的层级.
    pub fn fastest(&self) -> Option<&LevelTiming> {
        self.levels.iter().min_by_key(|t| t.elapsed)
    }
}

/// 依次对所有层级计时. 任一层失败时立即返回错误.
pub fn time_all_levels<R: PyramidRead + ?Sized>(reader: &R) -> ReadResult<ResolutionProfile> {
    let mut ans = ResolutionProfile::default();
    for level in 0..reader.level_count() {
        let dimensions = reader.checked_level(level)?;
        log::info!("level {level}: {} x {}", dimensions.0, dimensions.1);
        let elapsed = time_loading_at_resolution(reader, level)?;
        ans.push(LevelTiming {
            level,
            dimensions,
            elapsed,
        });
    }
    log::info!("all levels loaded in {} us", ans.total().as_micros());
    Ok(ans)
}
