//! 对 `tau-berry::dataset` 的更一层封装. 提供更直接的数据集定位方式.

use std::env;
use std::path::PathBuf;
use tau_berry::consts::naming::HOME_SUBDIR;

/// 指定数据集根目录的环境变量.
pub const DATASET_ENV: &str = "PCSCAN_DIR";

/// 获取数据集根目录.
///
/// 1. 若环境变量 `$PCSCAN_DIR` 非空, 则返回其值;
/// 2. 否则, 返回 `$HOME/dataset/pcscan`. 无法确定主目录时返回 `None`.
pub fn dataset_dir_from_env_or_home() -> Option<PathBuf> {
    match env::var(DATASET_ENV) {
        Ok(d) if !d.is_empty() => Some(PathBuf::from(d)),
        _ => tau_berry::dataset::home_dataset_dir_with([HOME_SUBDIR]),
    }
}
