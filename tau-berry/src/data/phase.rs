//! 双阈值三相分割.

use crate::{PcScan, TauError, TauResult};
use ndarray::{Array3, ArrayView3, Zip};
use std::fmt;

/// 阈值对 `(lower, upper)`, 保证 `lower < upper` 且均为有限值.
#[derive(Copy, Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Thresholds {
    lower: f32,
    upper: f32,
}

impl Thresholds {
    /// 构建阈值对. 若 `lower >= upper` 或任一值非有限, 则返回 `InvalidThreshold`.
    pub fn new(lower: f32, upper: f32) -> TauResult<Self> {
        if lower.is_finite() && upper.is_finite() && lower < upper {
            Ok(Self { lower, upper })
        } else {
            Err(TauError::InvalidThreshold { lower, upper })
        }
    }

    /// 孔隙相上界.
    #[inline]
    pub fn lower(&self) -> f32 {
        self.lower
    }

    /// 沉淀相上界.
    #[inline]
    pub fn upper(&self) -> f32 {
        self.upper
    }

    /// 对扫描进行三相分割.
    #[inline]
    pub fn segment(&self, scan: &PcScan) -> PhaseMasks {
        self.segment_view(scan.data())
    }

    /// 对任意 3D 灰度视图进行三相分割.
    pub fn segment_view(&self, data: ArrayView3<f32>) -> PhaseMasks {
        let (lower, upper) = (self.lower, self.upper);
        let porosity = data.mapv(|v| v < lower);
        let precipitate = data.mapv(|v| lower < v && v < upper);

        // 直接取并集. 恰好等于 `lower` 的体素因此不属于任何一相.
        let total = Zip::from(&porosity)
            .and(&precipitate)
            .map_collect(|&p, &q| p || q);

        PhaseMasks {
            porosity,
            precipitate,
            total,
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        use crate::consts::gray::*;
        Self {
            lower: POROSITY_UPPER,
            upper: PRECIPITATE_UPPER,
        }
    }
}

/// 分割 `scan`. 等价于 `Thresholds::new(lower, upper)?.segment(scan)`.
pub fn segment(scan: &PcScan, lower: f32, upper: f32) -> TauResult<PhaseMasks> {
    Ok(Thresholds::new(lower, upper)?.segment(scan))
}

/// 材料相.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Phase {
    /// 孔隙.
    Porosity,

    /// 沉淀.
    Precipitate,

    /// 总空隙 (孔隙 + 沉淀).
    Total,
}

impl Phase {
    /// 所有相, 按结果表中的顺序排列.
    pub const ALL: [Phase; 3] = [Phase::Porosity, Phase::Precipitate, Phase::Total];

    /// 在结果表中的下标.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// 名称.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Porosity => "porosity",
            Self::Precipitate => "precipitate",
            Self::Total => "total",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 三个带名字的相掩膜, 形状与源扫描一致.
///
/// 满足 `total == porosity | precipitate`, 且 `porosity & precipitate` 恒为空.
#[derive(Debug, Clone, PartialEq)]
pub struct PhaseMasks {
    /// 孔隙相.
    pub porosity: Array3<bool>,

    /// 沉淀相.
    pub precipitate: Array3<bool>,

    /// 总空隙相.
    pub total: Array3<bool>,
}

impl PhaseMasks {
    /// 获取某一相的掩膜.
    #[inline]
    pub fn get(&self, phase: Phase) -> ArrayView3<'_, bool> {
        match phase {
            Phase::Porosity => self.porosity.view(),
            Phase::Precipitate => self.precipitate.view(),
            Phase::Total => self.total.view(),
        }
    }

    /// 按 [`Phase::ALL`] 顺序迭代所有掩膜.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (Phase, ArrayView3<'_, bool>)> {
        Phase::ALL.into_iter().map(|p| (p, self.get(p)))
    }

    /// 掩膜形状 `(z, y, x)`.
    #[inline]
    pub fn shape(&self) -> crate::Idx3d {
        self.total.dim()
    }

    /// 某一相的体素个数.
    #[inline]
    pub fn count(&self, phase: Phase) -> usize {
        self.get(phase).iter().filter(|v| **v).count()
    }

    /// 某一相的体积分数. 空体数据返回 0.
    pub fn fraction(&self, phase: Phase) -> f64 {
        let size = self.total.len();
        if size == 0 {
            0.0
        } else {
            self.count(phase) as f64 / size as f64
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{segment, Phase, PhaseMasks, Thresholds};
    use crate::{PcScan, TauError};
    use ndarray::{Array3, Zip};

    /// 灰度值覆盖两个阈值本身及其两侧.
    fn ramp_scan() -> PcScan {
        PcScan::from_array(Array3::from_shape_fn((3, 4, 5), |(z, y, x)| {
            (z * 20 + y * 5 + x) as f32 * 3.0
        }))
        .unwrap()
    }

    fn check_invariant(m: &PhaseMasks) {
        Zip::from(&m.porosity)
            .and(&m.precipitate)
            .and(&m.total)
            .for_each(|&p, &q, &t| {
                assert_eq!(t, p || q);
                assert!(!(p && q));
            });
    }

    #[test]
    fn test_union_and_exclusive() {
        let scan = ramp_scan();
        for (l, u) in [(30.0, 90.0), (0.5, 1.0), (-10.0, 500.0), (60.0, 61.0)] {
            let m = segment(&scan, l, u).unwrap();
            assert_eq!(m.shape(), scan.shape());
            check_invariant(&m);
        }
    }

    #[test]
    fn test_threshold_values_excluded_from_precipitate() {
        let scan = PcScan::from_array(Array3::from_shape_vec(
            (1, 1, 5),
            vec![9.0, 10.0, 15.0, 20.0, 21.0],
        )
        .unwrap())
        .unwrap();
        let m = segment(&scan, 10.0, 20.0).unwrap();

        let por: Vec<bool> = m.porosity.iter().copied().collect();
        let pre: Vec<bool> = m.precipitate.iter().copied().collect();
        let tot: Vec<bool> = m.total.iter().copied().collect();
        assert_eq!(por, [true, false, false, false, false]);
        assert_eq!(pre, [false, false, true, false, false]);
        assert_eq!(tot, [true, false, true, false, false]);
        check_invariant(&m);
    }

    #[test]
    fn test_deterministic() {
        let scan = ramp_scan();
        let t = Thresholds::new(20.0, 100.0).unwrap();
        assert_eq!(t.segment(&scan), t.segment(&scan));
    }

    #[test]
    fn test_invalid_threshold() {
        let scan = ramp_scan();
        for (l, u) in [(5.0, 5.0), (6.0, 5.0), (f32::NAN, 1.0), (0.0, f32::INFINITY)] {
            assert!(matches!(
                segment(&scan, l, u),
                Err(TauError::InvalidThreshold { .. })
            ));
        }
        assert!(segment(&scan, 5.0, 5.0001).is_ok());
    }

    #[test]
    fn test_counts_and_fraction() {
        let scan = ramp_scan();
        let m = segment(&scan, 30.0, 90.0).unwrap();
        // 灰度为 0, 3, ..., 27 的 10 个体素.
        assert_eq!(m.count(Phase::Porosity), 10);
        // 灰度为 33, ..., 87 的 19 个体素.
        assert_eq!(m.count(Phase::Precipitate), 19);
        assert_eq!(m.count(Phase::Total), 29);
        assert!((m.fraction(Phase::Total) - 29.0 / 60.0).abs() < 1e-12);

        let names: Vec<&str> = m.iter().map(|(p, _)| p.name()).collect();
        assert_eq!(names, ["porosity", "precipitate", "total"]);
    }
}
