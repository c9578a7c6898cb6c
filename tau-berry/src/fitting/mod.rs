//! 曲线拟合.
//!
//! 给定一系列点 `(x, y)`, 该模块可以基于最小二乘法拟合出一条直线.

use ndarray::ArrayView1;

mod linear;

/// 拟合运行时错误.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum CalcError {
    /// `x` 与 `y` 长度不一致.
    #[error("x has {0} values but y has {1}")]
    LengthMismatch(usize, usize),

    /// 采样点不足以做实际拟合工作.
    ///
    /// 第一个参数代表目前已有的点, 第二个参数代表实际拟合需要的最少点数.
    #[error("too few samples: {0} < {1}")]
    TooFewSamples(usize, usize),

    /// 自变量方差为零, 斜率无定义.
    #[error("x has zero variance")]
    ZeroVariance,
}

/// 拟合运行时结果.
pub type CalcResult<T> = Result<T, CalcError>;

/// 直线 `y = slope * x + intercept`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Line {
    /// 斜率.
    pub slope: f64,

    /// 截距.
    pub intercept: f64,
}

impl Line {
    /// 求 `x` 处的函数值.
    #[inline]
    pub fn eval(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// 基于最小二乘法拟合直线 (设计矩阵 `[x, 1]`, 无正则化).
///
/// `x` 是自变量数组, `y` 是对应函数值, 二者长度须一致且不少于 2.
pub fn linear_f64(x: ArrayView1<f64>, y: ArrayView1<f64>) -> CalcResult<Line> {
    linear::LinearImp::new(x.view(), y.view())?.fit()
}
