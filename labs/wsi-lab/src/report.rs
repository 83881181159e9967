//! 实验结果的文本输出.

use std::io::{self, Write};
use std::time::Duration;
use wsi_berry::timing::ResolutionProfile;
use wsi_berry::tiling::StripLoadReport;

const S4: &str = "    ";

#[inline]
fn f64_to_display(f: Option<f64>) -> String {
    match f {
        Some(f) => format!("{f:.6}"),
        None => "/".to_string(),
    }
}

#[inline]
fn us(d: Duration) -> u128 {
    d.as_micros()
}

/// 各层计时结果.
pub fn describe_levels<W: Write>(profile: &ResolutionProfile, w: &mut W) -> io::Result<()> {
    writeln!(w, "Loading at resolution:")?;
    for t in profile.levels() {
        let (width, height) = t.dimensions;
        let mpx = t.pixels_per_second().map(|v| v / 1e6);
        writeln!(
            w,
            "{S4}level {}: {width} x {height}, {} us, {} Mpx/s",
            t.level,
            us(t.elapsed),
            f64_to_display(mpx)
        )?;
    }
    write!(w, "{S4}Total: {} us", us(profile.total()))?;
    Ok(())
}

/// 一次条带并行读取的结果.
pub fn describe_strips<W: Write>(
    report: &StripLoadReport,
    total: Duration,
    w: &mut W,
) -> io::Result<()> {
    let (width, height) = report.image.size();
    writeln!(w, "Strip loading: {width} x {height}")?;
    writeln!(w, "{S4}Succeeded strips: {}", report.timings.len())?;
    writeln!(w, "{S4}Failed strips: {}", report.failures.len())?;
    for (task, d) in &report.timings {
        writeln!(
            w,
            "{S4}{S4}strip {} [{}, {}): {} us",
            task.index,
            task.x,
            task.end(),
            us(*d)
        )?;
    }
    for f in &report.failures {
        writeln!(
            w,
            "{S4}{S4}strip {} [{}, {}) failed: {}",
            f.task.index,
            f.task.x,
            f.task.end(),
            f.error
        )?;
    }
    let slowest = report.slowest().map(|d| d.as_micros() as f64);
    writeln!(w, "{S4}Slowest strip: {} us", f64_to_display(slowest))?;
    write!(w, "{S4}Total machine time: {} us", us(total))?;
    Ok(())
}

/// 各类细胞核的平均 core number.
pub fn describe_core_numbers<W: Write>(means: &[Option<f64>], w: &mut W) -> io::Result<()> {
    writeln!(w, "Mean core number per nucleus type:")?;
    for (i, m) in means.iter().enumerate() {
        writeln!(w, "{S4}type {}: {}", i + 1, f64_to_display(*m))?;
    }
    Ok(())
}

/// 打印到标准输出, 前后加分隔线.
pub fn print_with<F>(f: F) -> io::Result<()>
where
    F: FnOnce(&mut Vec<u8>) -> io::Result<()>,
{
    let mut buf = Vec::with_capacity(512);
    f(&mut buf)?;
    utils::sep();
    println!("{}", String::from_utf8_lossy(&buf));
    utils::sep();
    Ok(())
}
