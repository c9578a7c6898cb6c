#![warn(missing_docs)] // <= 合适时移除它.

//! 核心库. 对多孔介质 (含沉淀相) 的 3D CT 扫描进行阈值分相,
//! 并基于随机游走的均方位移 (MSD) 曲线计算各相的路径迂曲度 (tortuosity).
//!
//! 该 crate 目前仅提供 `safe` 接口.
//!
//! # 注意
//!
//! 1. 随机游走本身被建模为外部协作者 ([`walk::WalkEngine`]). 本 crate 提供一个简单的
//!   格点实现 [`walk::LatticeWalker`], 但任何满足该 trait 的引擎都可以替换它.
//! 2. 所有数值边界情况 (空相、零斜率拟合等) 都以显式错误返回, 不会静默产生 `inf` 或 `NaN`.
//!
//! # 开发计划
//!
//! ### 体数据加载 ✅
//!
//! 支持 NRRD (raw / gzip), nifti 与 npy 三种格式.
//!
//! 实现位于 `tau-berry/src/data`.
//!
//! ### 双阈值三相分割 ✅
//!
//! 孔隙相 `v < lower`, 沉淀相 `lower < v < upper`, 总空隙相为二者的并.
//! 恰好等于阈值的体素不属于沉淀相.
//!
//! 实现位于 `tau-berry/src/data/phase.rs`.
//!
//! ### 最小二乘直线拟合 ✅
//!
//! 实现位于 `tau-berry/src/fitting`.
//!
//! ### 格点随机游走引擎 ✅
//!
//! 镜像周期边界, 可选 `rayon` 并行.
//!
//! 实现位于 `tau-berry/src/walk`.
//!
//! ### 批处理驱动与结果表 ✅
//!
//! 按 (重复组, 时间点) 顺序依次计算, 支持 fail-fast / fail-soft 两种策略.
//!
//! 实现位于 `tau-berry/src/batch`.
//!
//! ### 并行处理多个 (重复组, 时间点) ⌛️
//!
//! 每个任务独占结果表的一个格子, 最后合并即可, 不需要加锁.

/// 三维索引, 按 `(z, y, x)` 组织.
pub type Idx3d = (usize, usize, usize);

/// 有符号三维坐标. 随机游走在无界空间中记录位移时会用到.
type Idx3dI64 = (i64, i64, i64);

/// 3D 扫描数据结构与分相.
mod data;

pub use data::{LoadError, MaskWriteVis, PcScan, Phase, PhaseMasks, Thresholds};

pub use data::phase::segment;

pub mod consts;

mod error;

pub use error::{FailureKind, TauError, TauResult};

pub mod fitting;

pub mod walk;

mod estimate;

pub use estimate::estimate_tortuosity;

pub mod batch;
pub mod dataset;
pub mod prelude;
