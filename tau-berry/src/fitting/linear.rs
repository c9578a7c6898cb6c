//! 最小二乘直线.

use super::{CalcError, CalcResult, Line};
use ndarray::ArrayView1;

pub(crate) struct LinearImp<'a> {
    x: ArrayView1<'a, f64>,
    y: ArrayView1<'a, f64>,
}

impl<'a> LinearImp<'a> {
    pub fn new(x: ArrayView1<'a, f64>, y: ArrayView1<'a, f64>) -> CalcResult<Self> {
        if x.len() != y.len() {
            return Err(CalcError::LengthMismatch(x.len(), y.len()));
        }
        if x.len() < 2 {
            return Err(CalcError::TooFewSamples(x.len(), 2));
        }
        Ok(Self { x, y })
    }

    /// 解正规方程. 先对数据去中心化, 避免 `x` 很大时 `Σx²` 的精度损失.
    pub fn fit(&self) -> CalcResult<Line> {
        // `new` 已保证非空, `mean` 不会返回 `None`.
        let (Some(mx), Some(my)) = (self.x.mean(), self.y.mean()) else {
            return Err(CalcError::TooFewSamples(0, 2));
        };

        let dx = self.x.mapv(|v| v - mx);
        let dy = self.y.mapv(|v| v - my);
        let sxx = dx.dot(&dx);
        if sxx == 0.0 {
            return Err(CalcError::ZeroVariance);
        }

        let slope = dx.dot(&dy) / sxx;
        Ok(Line {
            slope,
            intercept: my - slope * mx,
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::fitting::{linear_f64, CalcError};
    use ndarray::{Array1, ArrayView1};

    fn f64_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-8
    }

    #[test]
    fn test_exact_line() {
        let x = Array1::linspace(0.0, 100.0, 101);
        let y = x.mapv(|v| 2.0 * v + 5.0);
        let line = linear_f64(x.view(), y.view()).unwrap();
        assert!(f64_eq(line.slope, 2.0));
        assert!(f64_eq(line.intercept, 5.0));
        assert!(f64_eq(line.eval(10.0), 25.0));
    }

    /// `x` 与 `y` 来自生命周期不同的数组.
    fn fit_against(x: ArrayView1<f64>) -> f64 {
        let y = x.mapv(|v| 3.0 - v);
        linear_f64(x, y.view()).unwrap().slope
    }

    #[test]
    fn test_views_of_different_lifetimes() {
        let x = Array1::linspace(0.0, 9.0, 10);
        assert!(f64_eq(fit_against(x.view()), -1.0));
    }

    #[test]
    fn test_noisy_symmetric() {
        // 手算: Σdx·dy = 9, Σdx² = 5.
        let x = ArrayView1::from(&[0.0, 1.0, 2.0, 3.0]);
        let y = ArrayView1::from(&[1.5, 2.5, 5.5, 6.5]);
        let line = linear_f64(x, y).unwrap();
        assert!(f64_eq(line.slope, 1.8));
        assert!(f64_eq(line.intercept, 1.3));
    }

    #[test]
    fn test_flat_gives_zero_slope() {
        let x = Array1::linspace(0.0, 9.0, 10);
        let y = Array1::from_elem(10, 5.0);
        let line = linear_f64(x.view(), y.view()).unwrap();
        assert_eq!(line.slope, 0.0);
    }

    #[test]
    fn test_degenerate_inputs() {
        let one = ArrayView1::from(&[1.0]);
        assert_eq!(
            linear_f64(one, one).unwrap_err(),
            CalcError::TooFewSamples(1, 2)
        );

        let x = ArrayView1::from(&[3.0, 3.0, 3.0]);
        let y = ArrayView1::from(&[1.0, 2.0, 3.0]);
        assert_eq!(linear_f64(x, y).unwrap_err(), CalcError::ZeroVariance);

        let y2 = ArrayView1::from(&[1.0, 2.0]);
        assert_eq!(
            linear_f64(x, y2).unwrap_err(),
            CalcError::LengthMismatch(3, 2)
        );
    }
}
