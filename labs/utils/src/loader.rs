//! 实验数据路径的解析. 优先读取环境变量, 否则退回到用户主目录下的 `dataset/wsi`.

use std::env;
use std::path::{Path, PathBuf};
use wsi_berry::slide::{open_slide, AnySlide, Backend, ReadResult};

/// 切片路径环境变量.
pub const SLIDE_ENV: &str = "WSI_SLIDE";

/// 数据目录环境变量.
pub const DATA_DIR_ENV: &str = "WSI_DATA_DIR";

/// 默认切片文件名.
pub const DEFAULT_SLIDE: &str = "patient_100_node_0.tif";

/// 获取 `{用户主目录}/dataset` 目录下给定继续项组成的全路径.
pub fn home_dataset_dir_with<P: AsRef<Path>, I: IntoIterator<Item = P>>(it: I) -> Option<PathBuf> {
    let mut ans = dirs::home_dir()?;
    ans.push("dataset");
    ans.extend(it);
    Some(ans)
}

/// 获取数据目录.
///
/// 1. 若环境变量 `$WSI_DATA_DIR` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/wsi`. 找不到主目录时返回 `None`.
pub fn data_dir_from_env_or_home() -> Option<PathBuf> {
    match env::var(DATA_DIR_ENV) {
        Ok(d) if !d.is_empty() => Some(PathBuf::from(d)),
        _ => home_dataset_dir_with(["wsi"]),
    }
}

/// 获取切片路径.
///
/// 1. 若环境变量 `$WSI_SLIDE` 非空, 则返回其值;
/// 2. 否则, 返回数据目录下的 `patient_100_node_0.tif`.
pub fn slide_path_from_env_or_home() -> Option<PathBuf> {
    match env::var(SLIDE_ENV) {
        Ok(p) if !p.is_empty() => Some(PathBuf::from(p)),
        _ => data_dir_from_env_or_home().map(|d| d.join(DEFAULT_SLIDE)),
    }
}

/// 打开切片. `path` 为 `None` 时按 [`slide_path_from_env_or_home`] 解析,
/// 后端由扩展名推断.
pub fn open_slide_or_default(path: Option<&Path>) -> ReadResult<AnySlide> {
    let path = match path {
        Some(p) => p.to_path_buf(),
        None => slide_path_from_env_or_home().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::NotFound, "cannot locate home directory")
        })?,
    };
    log::info!("slide: {}", path.display());
    open_slide(&path, Backend::from_path(&path))
}

/// 数据目录下的文件路径; 数据目录不可用时退回当前目录.
pub fn data_file(name: &str) -> PathBuf {
    data_dir_from_env_or_home()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(name)
}
