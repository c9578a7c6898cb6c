//! 数据集操作.
//!
//! 数据集根目录下每个重复组对应一个子目录 (如 `PCScan4_R3`), 其中每个时间点对应一个扫描文件
//! (如 `PCScan4_t4.nrrd`).

use crate::consts::naming::{REPEAT_PREFIX, SCAN_PATTERN, TIME_PLACEHOLDER};
use crate::{LoadError, PcScan};
use std::io;
use std::path::{Path, PathBuf};

/// 获取 `{用户主目录}/dataset` 目录.
pub fn home_dataset_dir() -> Option<PathBuf> {
    let mut ans = dirs::home_dir()?;
    ans.push("dataset");
    Some(ans)
}

/// 获取 `{用户主目录}/dataset` 目录下给定继续项组成的全路径.
pub fn home_dataset_dir_with<P: AsRef<Path>, I: IntoIterator<Item = P>>(it: I) -> Option<PathBuf> {
    let mut ans = home_dataset_dir()?;
    ans.extend(it);
    Some(ans)
}

/// 一个重复组 (一次独立的扫描序列).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RepeatDir {
    /// 目录名末尾的编号.
    pub index: u32,

    /// 目录路径.
    pub path: PathBuf,
}

impl RepeatDir {
    /// 用于报告的名称, 即目录名.
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| format!("R{}", self.index))
    }
}

/// 若 `name` 形如 `{prefix}{n}`, 则返回 `n`.
fn repeat_index(name: &str, prefix: &str) -> Option<u32> {
    let digits = name.strip_prefix(prefix)?;
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok()
}

/// 枚举 `root` 下名为 `{prefix}{n}` 的子目录, 按 `n` 升序排列,
/// 并去掉编号最大的 `drop_last` 个.
pub fn discover_repeats<P: AsRef<Path>>(
    root: P,
    prefix: &str,
    drop_last: usize,
) -> io::Result<Vec<RepeatDir>> {
    let mut ans = Vec::new();
    for entry in std::fs::read_dir(root.as_ref())? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        let name = entry.file_name();
        if let Some(index) = repeat_index(&name.to_string_lossy(), prefix) {
            ans.push(RepeatDir {
                index,
                path: entry.path(),
            });
        }
    }
    ans.sort_by_key(|r| r.index);
    ans.truncate(ans.len().saturating_sub(drop_last));
    Ok(ans)
}

/// 以默认前缀和默认丢弃个数枚举重复组.
#[inline]
pub fn discover_default_repeats<P: AsRef<Path>>(root: P) -> io::Result<Vec<RepeatDir>> {
    use crate::consts::naming::DROP_LAST_REPEATS;
    discover_repeats(root, REPEAT_PREFIX, DROP_LAST_REPEATS)
}

/// 扫描文件名模式, 其中的 `{t}` 会被替换为时间点.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanPattern(String);

impl ScanPattern {
    /// 创建模式. 若其中不含 `{t}` 则返回 `None`.
    pub fn new<S: Into<String>>(pattern: S) -> Option<Self> {
        let pattern = pattern.into();
        pattern.contains(TIME_PLACEHOLDER).then_some(Self(pattern))
    }

    /// 时间点 `time` 对应的文件名.
    #[inline]
    pub fn file_name(&self, time: u32) -> String {
        self.0.replace(TIME_PLACEHOLDER, &time.to_string())
    }

    /// 重复组 `repeat` 下时间点 `time` 对应的文件路径.
    #[inline]
    pub fn path(&self, repeat: &RepeatDir, time: u32) -> PathBuf {
        repeat.path.join(self.file_name(time))
    }
}

impl Default for ScanPattern {
    fn default() -> Self {
        Self(SCAN_PATTERN.to_string())
    }
}

/// 扫描来源. 批处理通过它按 (重复组, 时间点) 获取扫描.
pub trait ScanSource {
    /// 扫描的位置, 用于报告.
    fn locate(&self, repeat: &RepeatDir, time: u32) -> PathBuf;

    /// 加载扫描.
    fn open(&self, repeat: &RepeatDir, time: u32) -> Result<PcScan, LoadError>;
}

/// 按文件名模式从磁盘加载扫描.
#[derive(Debug, Clone, Default)]
pub struct PatternSource {
    pattern: ScanPattern,
}

impl PatternSource {
    /// 以 `pattern` 创建.
    #[inline]
    pub fn new(pattern: ScanPattern) -> Self {
        Self { pattern }
    }
}

impl ScanSource for PatternSource {
    #[inline]
    fn locate(&self, repeat: &RepeatDir, time: u32) -> PathBuf {
        self.pattern.path(repeat, time)
    }

    #[inline]
    fn open(&self, repeat: &RepeatDir, time: u32) -> Result<PcScan, LoadError> {
        PcScan::open(self.locate(repeat, time))
    }
}

/// 从来源、重复组和时间点序列创建扫描加载器. 加载器按 `times` 的顺序迭代.
pub fn time_loader<'a, S: ScanSource + ?Sized, I: IntoIterator<Item = u32>>(
    source: &'a S,
    repeat: &'a RepeatDir,
    times: I,
) -> TimeLoader<'a, S> {
    let mut data: Vec<u32> = times.into_iter().collect();
    data.reverse();

    TimeLoader {
        source,
        repeat,
        data_rev: data,
    }
}

/// 单个重复组的扫描加载器.
pub struct TimeLoader<'a, S: ScanSource + ?Sized> {
    source: &'a S,
    repeat: &'a RepeatDir,
    data_rev: Vec<u32>,
}

impl<S: ScanSource + ?Sized> Iterator for TimeLoader<'_, S> {
    type Item = (u32, Result<PcScan, LoadError>);

    fn next(&mut self) -> Option<Self::Item> {
        let time = self.data_rev.pop()?;
        Some((time, self.source.open(self.repeat, time)))
    }
}

impl<S: ScanSource + ?Sized> ExactSizeIterator for TimeLoader<'_, S> {
    #[inline]
    fn len(&self) -> usize {
        self.data_rev.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_repeat_index() {
        assert_eq!(repeat_index("PCScan4_R12", "PCScan4_R"), Some(12));
        assert_eq!(repeat_index("PCScan4_R", "PCScan4_R"), None);
        assert_eq!(repeat_index("PCScan4_R1b", "PCScan4_R"), None);
        assert_eq!(repeat_index("PCScan4_R-1", "PCScan4_R"), None);
        assert_eq!(repeat_index("Other_R1", "PCScan4_R"), None);
    }

    #[test]
    fn test_discover_sorted_numerically_and_drop_last() {
        let root = tempfile::tempdir().unwrap();
        for n in [10, 2, 1, 7, 3] {
            fs::create_dir(root.path().join(format!("PCScan4_R{n}"))).unwrap();
        }
        fs::create_dir(root.path().join("PCScan4_Rx")).unwrap();
        fs::write(root.path().join("PCScan4_R99"), b"not a dir").unwrap();

        let all = discover_repeats(root.path(), "PCScan4_R", 0).unwrap();
        let idx: Vec<u32> = all.iter().map(|r| r.index).collect();
        assert_eq!(idx, [1, 2, 3, 7, 10]);
        assert_eq!(all[4].name(), "PCScan4_R10");

        let kept = discover_default_repeats(root.path()).unwrap();
        let idx: Vec<u32> = kept.iter().map(|r| r.index).collect();
        assert_eq!(idx, [1, 2, 3]);

        assert!(discover_repeats(root.path(), "PCScan4_R", 9).unwrap().is_empty());
    }

    #[test]
    fn test_scan_pattern() {
        assert!(ScanPattern::new("scan.nrrd").is_none());
        let repeat = RepeatDir {
            index: 3,
            path: PathBuf::from("/data/PCScan4_R3"),
        };
        let p = ScanPattern::default();
        assert_eq!(p.file_name(8), "PCScan4_t8.nrrd");
        assert_eq!(
            p.path(&repeat, 12),
            PathBuf::from("/data/PCScan4_R3/PCScan4_t12.nrrd")
        );
    }

    #[test]
    fn test_time_loader_order() {
        let root = tempfile::tempdir().unwrap();
        let repeat = RepeatDir {
            index: 0,
            path: root.path().to_owned(),
        };
        let src = PatternSource::new(ScanPattern::new("t{t}.npy").unwrap());
        let data = ndarray::Array3::<f32>::zeros((1, 2, 2));
        ndarray_npy::write_npy(root.path().join("t4.npy"), &data).unwrap();

        let loader = time_loader(&src, &repeat, [4, 0, 4]);
        assert_eq!(loader.len(), 3);
        let got: Vec<(u32, bool)> = loader.map(|(t, r)| (t, r.is_ok())).collect();
        assert_eq!(got, [(4, true), (0, false), (4, true)]);
    }
}
