//! 迂曲度估计: 在相掩膜内运行随机游走, 对 MSD 曲线做直线拟合, 取斜率倒数.

use crate::fitting::{self, CalcError};
use crate::walk::{SimulationError, WalkConfig, WalkEngine};
use crate::{TauError, TauResult};
use ndarray::{Array1, ArrayView1, ArrayView3};

/// 计算 `mask` 所代表的相的迂曲度.
///
/// 时间轴为 `0..=nt` 上的 `nt + 1` 个等距点, 对 `msd ≈ m·t + c` 做最小二乘拟合, 返回 `1/m`.
///
/// # 错误
///
/// 1. `mask` 中没有 `true` 体素时返回 [`TauError::EmptyPhase`], 此时不会调用引擎.
/// 2. 引擎报错, 或 MSD 序列长度不是 `nt + 1` 时返回 [`TauError::Simulation`].
/// 3. 样本不足两个、斜率为零或非有限时返回 [`TauError::DegenerateFit`].
pub fn estimate_tortuosity<E: WalkEngine + ?Sized>(
    mask: ArrayView3<bool>,
    config: &WalkConfig,
    engine: &mut E,
) -> TauResult<f64> {
    if !mask.iter().any(|v| *v) {
        return Err(TauError::EmptyPhase);
    }

    engine.run(mask, config)?;
    let msd = engine.compute_msd()?;
    if msd.len() != config.nt + 1 {
        return Err(SimulationError::new(format!(
            "expected {} MSD values, got {}",
            config.nt + 1,
            msd.len()
        ))
        .into());
    }

    tortuosity_from_msd(ArrayView1::from(&msd[..]), config.nt)
}

/// 由 MSD 曲线直接计算迂曲度. 时间轴为 `0..=nt` 上与 `msd` 等长的等距点.
pub(crate) fn tortuosity_from_msd(msd: ArrayView1<f64>, nt: usize) -> TauResult<f64> {
    let t = Array1::linspace(0.0, nt as f64, msd.len());
    let line = fitting::linear_f64(t.view(), msd).map_err(|e| match e {
        CalcError::ZeroVariance => TauError::DegenerateFit { slope: 0.0 },
        _ => TauError::DegenerateFit { slope: f64::NAN },
    })?;

    let slope = line.slope;
    if slope == 0.0 || !slope.is_finite() {
        return Err(TauError::DegenerateFit { slope });
    }
    if slope < 0.0 {
        log::warn!("negative MSD slope {slope}, tortuosity will be negative");
    }
    Ok(1.0 / slope)
}
