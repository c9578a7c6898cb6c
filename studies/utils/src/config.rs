//! 研究配置. 层次为: 内置默认值 → TOML 文件 → 命令行参数.
//!
//! ```toml
//! root = "/data/pcscan"
//! times = [0, 2, 4, 6]
//! policy = "fail-soft"
//!
//! [thresholds]
//! lower = 60.0
//! upper = 120.0
//!
//! [walk]
//! nt = 10000
//! nw = 20000
//!
//! [dataset]
//! prefix = "PCScan4_R"
//! pattern = "PCScan4_t{t}.nrrd"
//! drop_last = 2
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use tau_berry::batch::{BatchConfig, ErrorPolicy};
use tau_berry::consts::{gray, naming, TIME_POINTS};
use tau_berry::dataset::ScanPattern;
use tau_berry::walk::WalkConfig;
use tau_berry::{TauError, Thresholds};

/// 配置错误.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 读取配置文件失败.
    #[error("cannot read `{}`: {source}", path.display())]
    Io {
        /// 配置文件.
        path: PathBuf,

        /// 底层错误.
        source: std::io::Error,
    },

    /// TOML 语法或字段错误.
    #[error(transparent)]
    Toml(#[from] toml::de::Error),

    /// 文件名模式中没有 `{t}`.
    #[error("scan pattern `{0}` has no `{{t}}` placeholder")]
    Pattern(String),

    /// 阈值非法.
    #[error(transparent)]
    Threshold(#[from] TauError),
}

/// 阈值配置.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ThresholdConfig {
    /// 孔隙相上界.
    pub lower: f32,

    /// 沉淀相上界.
    pub upper: f32,
}

impl Default for ThresholdConfig {
    fn default() -> Self {
        Self {
            lower: gray::POROSITY_UPPER,
            upper: gray::PRECIPITATE_UPPER,
        }
    }
}

/// 数据集组织方式.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DatasetConfig {
    /// 重复组目录前缀.
    pub prefix: String,

    /// 扫描文件名模式.
    pub pattern: String,

    /// 丢弃编号最大的若干重复组.
    pub drop_last: usize,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            prefix: naming::REPEAT_PREFIX.to_string(),
            pattern: naming::SCAN_PATTERN.to_string(),
            drop_last: naming::DROP_LAST_REPEATS,
        }
    }
}

/// 一次迂曲度研究的完整配置.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StudyConfig {
    /// 数据集根目录. 为空时从环境变量或主目录推断.
    pub root: Option<PathBuf>,

    /// 时间点.
    pub times: Vec<u32>,

    /// 阈值.
    pub thresholds: ThresholdConfig,

    /// 随机游走参数.
    pub walk: WalkConfig,

    /// 数据集组织方式.
    pub dataset: DatasetConfig,

    /// 失败处理策略.
    pub policy: ErrorPolicy,

    /// 掩膜预览目录.
    pub preview: Option<PathBuf>,
}

impl Default for StudyConfig {
    fn default() -> Self {
        Self {
            root: None,
            times: TIME_POINTS.to_vec(),
            thresholds: ThresholdConfig::default(),
            walk: WalkConfig::default(),
            dataset: DatasetConfig::default(),
            policy: ErrorPolicy::default(),
            preview: None,
        }
    }
}

impl StudyConfig {
    /// 从 TOML 文件加载. 文件中未出现的字段取默认值.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_owned(),
            source,
        })?;
        Self::parse(&text)
    }

    /// 从 TOML 文本解析.
    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// 扫描文件名模式.
    pub fn pattern(&self) -> Result<ScanPattern, ConfigError> {
        ScanPattern::new(self.dataset.pattern.as_str())
            .ok_or_else(|| ConfigError::Pattern(self.dataset.pattern.clone()))
    }

    /// 转换为批处理配置. 会校验阈值.
    pub fn batch_config(&self) -> Result<BatchConfig, ConfigError> {
        let thresholds = Thresholds::new(self.thresholds.lower, self.thresholds.upper)?;
        let cpus = crate::cpus();
        if self.walk.num_proc > cpus {
            log::warn!(
                "num_proc = {} exceeds the {cpus} available core(s)",
                self.walk.num_proc
            );
        }
        Ok(BatchConfig {
            thresholds,
            times: self.times.clone(),
            walk: self.walk,
            policy: self.policy,
            preview: self.preview.clone(),
        })
    }
}
