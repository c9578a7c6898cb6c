//! 随机游走引擎接口.
//!
//! 迂曲度计算只依赖 [`WalkEngine`] 这一能力: 在布尔掩膜内运行随机游走, 然后给出
//! 每一步的均方位移 (MSD). 任何满足该约定的实现均可互换.

use ndarray::ArrayView3;

mod lattice;

pub use lattice::LatticeWalker;

/// 随机游走引擎报告的错误. 内容按原样透传给调用者.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct SimulationError(pub String);

impl SimulationError {
    /// 由错误信息构建.
    #[inline]
    pub fn new<S: Into<String>>(msg: S) -> Self {
        Self(msg.into())
    }
}

/// 随机游走参数.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct WalkConfig {
    /// 模拟步数 `nt`. MSD 序列长度为 `nt + 1`.
    pub nt: usize,

    /// 游走粒子个数 `nw`.
    pub nw: usize,

    /// 所有粒子是否从同一个随机体素出发. 否则各自随机选取起点.
    pub same_start: bool,

    /// 每步位移的体素数.
    pub stride: usize,

    /// 并行度提示.
    pub num_proc: usize,

    /// 随机种子. 为 `None` 时每次运行使用新的种子.
    pub seed: Option<u64>,
}

impl Default for WalkConfig {
    fn default() -> Self {
        use crate::consts::walk::*;
        Self {
            nt: TIME_STEPS,
            nw: WALKERS,
            same_start: false,
            stride: STRIDE,
            num_proc: NUM_PROC,
            seed: None,
        }
    }
}

/// 随机游走引擎.
///
/// `run` 是阻塞调用, 可在内部自行并行, 对调用者不可见.
pub trait WalkEngine {
    /// 在 `mask` 为 `true` 的体素内按 `config` 运行随机游走, 并保存内部轨迹状态.
    fn run(&mut self, mask: ArrayView3<bool>, config: &WalkConfig) -> Result<(), SimulationError>;

    /// 根据最近一次 `run` 的结果计算每一步的均方位移.
    fn compute_msd(&self) -> Result<Vec<f64>, SimulationError>;
}

impl<E: WalkEngine + ?Sized> WalkEngine for &mut E {
    #[inline]
    fn run(&mut self, mask: ArrayView3<bool>, config: &WalkConfig) -> Result<(), SimulationError> {
        (**self).run(mask, config)
    }

    #[inline]
    fn compute_msd(&self) -> Result<Vec<f64>, SimulationError> {
        (**self).compute_msd()
    }
}

impl<E: WalkEngine + ?Sized> WalkEngine for Box<E> {
    #[inline]
    fn run(&mut self, mask: ArrayView3<bool>, config: &WalkConfig) -> Result<(), SimulationError> {
        (**self).run(mask, config)
    }

    #[inline]
    fn compute_msd(&self) -> Result<Vec<f64>, SimulationError> {
        (**self).compute_msd()
    }
}
