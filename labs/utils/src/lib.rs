//! 各实验程序依赖的通用组件.

pub mod loader;

const SEP: &str = "--------------------------------------------------------";

/// 简单分隔线.
#[inline]
pub fn sep() {
    println!("{SEP}");
}

/// 获得可并行核心数.
pub fn cpus() -> usize {
    std::thread::available_parallelism().map_or_else(|_| num_cpus::get(), usize::from)
}

/// 初始化日志. `verbose` 为真时输出 `debug` 级别, 否则输出 `info` 级别.
///
/// 重复初始化时忽略.
pub fn init_logger(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    if simple_logger::SimpleLogger::new()
        .with_level(level)
        .init()
        .is_err()
    {
        log::debug!("logger already initialised");
    }
}
