//! 运行时错误.

use crate::data::LoadError;
use crate::walk::SimulationError;
use std::fmt;
use std::path::PathBuf;

/// 单张扫描处理过程中的错误.
#[derive(Debug, thiserror::Error)]
pub enum TauError {
    /// 扫描文件缺失、损坏或形状不对.
    #[error("failed to load `{}`: {source}", path.display())]
    Load {
        /// 出错的文件.
        path: PathBuf,

        /// 底层错误.
        #[source]
        source: LoadError,
    },

    /// 阈值对不满足 `lower < upper`.
    #[error("invalid threshold pair: lower = {lower}, upper = {upper}")]
    InvalidThreshold {
        /// 下阈值.
        lower: f32,

        /// 上阈值.
        upper: f32,
    },

    /// 某相掩膜中没有任何体素, 随机游走无处起步.
    #[error("phase mask has no voxels")]
    EmptyPhase,

    /// 随机游走引擎报告的错误.
    #[error("simulation failed: {0}")]
    Simulation(#[from] SimulationError),

    /// 拟合斜率为零或无意义, 迂曲度无定义.
    #[error("degenerate fit (slope = {slope})")]
    DegenerateFit {
        /// 拟合得到的斜率. 样本不足时为 `NaN`.
        slope: f64,
    },
}

/// 迂曲度计算结果.
pub type TauResult<T> = Result<T, TauError>;

/// 错误种类. 结果表中用它记录失败的格子.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FailureKind {
    /// 见 [`TauError::Load`].
    LoadFailure,

    /// 见 [`TauError::InvalidThreshold`].
    InvalidThreshold,

    /// 见 [`TauError::EmptyPhase`].
    EmptyPhase,

    /// 见 [`TauError::Simulation`].
    SimulationFailure,

    /// 见 [`TauError::DegenerateFit`].
    DegenerateFit,
}

impl TauError {
    /// 获取错误种类.
    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Load { .. } => FailureKind::LoadFailure,
            Self::InvalidThreshold { .. } => FailureKind::InvalidThreshold,
            Self::EmptyPhase => FailureKind::EmptyPhase,
            Self::Simulation(_) => FailureKind::SimulationFailure,
            Self::DegenerateFit { .. } => FailureKind::DegenerateFit,
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::LoadFailure => "LoadFailure",
            Self::InvalidThreshold => "InvalidThreshold",
            Self::EmptyPhase => "EmptyPhase",
            Self::SimulationFailure => "SimulationFailure",
            Self::DegenerateFit => "DegenerateFit",
        };
        f.write_str(s)
    }
}
