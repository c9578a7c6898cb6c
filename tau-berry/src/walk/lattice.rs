//! 格点随机游走.
//!
//! 每一步等概率选择六个轴向之一, 若目标体素在相内则移动 `stride` 个体素, 否则原地不动.
//! 体数据之外的空间由镜像平铺延拓, 因此粒子可以走出原始体数据, 位移在无界坐标下记录.

use super::{SimulationError, WalkConfig, WalkEngine};
use crate::{Idx3d, Idx3dI64};
use ndarray::ArrayView3;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// 简单的格点随机游走引擎.
///
/// MSD 按 `stride²` 归一化, 因此在自由空间中斜率为 1.
#[derive(Debug, Default, Clone)]
pub struct LatticeWalker {
    msd: Option<Vec<f64>>,
}

impl LatticeWalker {
    /// 创建引擎.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }
}

/// 镜像平铺: 把无界坐标 `c` 映射回长度为 `n` 的轴上.
#[inline]
fn mirror(c: i64, n: i64) -> usize {
    let m = c.rem_euclid(2 * n);
    (if m < n { m } else { 2 * n - 1 - m }) as usize
}

/// 单个粒子的游走所需的只读上下文.
struct Walk<'a> {
    mask: ArrayView3<'a, bool>,
    dims: Idx3dI64,
    nt: usize,
    stride: i64,
}

impl Walk<'_> {
    #[inline]
    fn open(&self, (z, y, x): Idx3dI64) -> bool {
        let (nz, ny, nx) = self.dims;
        self.mask[(mirror(z, nz), mirror(y, ny), mirror(x, nx))]
    }

    /// 运行一个粒子, 把每一步的平方位移累加进 `acc`.
    fn walk_into(&self, acc: &mut [f64], start: Idx3d, rng: &mut StdRng) {
        let origin = (start.0 as i64, start.1 as i64, start.2 as i64);
        let mut pos = origin;
        for slot in acc.iter_mut().take(self.nt + 1).skip(1) {
            let s = if rng.gen::<bool>() {
                self.stride
            } else {
                -self.stride
            };
            let cand = match rng.gen_range(0..3u8) {
                0 => (pos.0 + s, pos.1, pos.2),
                1 => (pos.0, pos.1 + s, pos.2),
                _ => (pos.0, pos.1, pos.2 + s),
            };
            if self.open(cand) {
                pos = cand;
            }
            let (dz, dy, dx) = (pos.0 - origin.0, pos.1 - origin.1, pos.2 - origin.2);
            *slot += (dz * dz + dy * dy + dx * dx) as f64;
        }
    }
}

/// 第 `i` 个粒子的起点与随机数发生器.
fn walker_state(i: usize, base: u64, starts: &[Idx3d], shared: Option<Idx3d>) -> (Idx3d, StdRng) {
    let mut rng = StdRng::seed_from_u64(base.wrapping_add(i as u64 + 1));
    let start = shared.unwrap_or_else(|| starts[rng.gen_range(0..starts.len())]);
    (start, rng)
}

cfg_if::cfg_if! {
    if #[cfg(feature = "rayon")] {
        use rayon::iter::{IntoParallelIterator, ParallelIterator};

        /// 借助 `rayon`, 在 `threads` 个线程上运行所有粒子, 返回各步平方位移之和.
        fn accumulate(
            walk: &Walk,
            nw: usize,
            threads: usize,
            base: u64,
            starts: &[Idx3d],
            shared: Option<Idx3d>,
        ) -> Result<Vec<f64>, SimulationError> {
            let len = walk.nt + 1;
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(threads)
                .build()
                .map_err(|e| SimulationError::new(format!("cannot start workers: {e}")))?;

            Ok(pool.install(|| {
                (0..nw)
                    .into_par_iter()
                    .fold(
                        || vec![0.0; len],
                        |mut acc, i| {
                            let (start, mut rng) = walker_state(i, base, starts, shared);
                            walk.walk_into(&mut acc, start, &mut rng);
                            acc
                        },
                    )
                    .reduce(
                        || vec![0.0; len],
                        |mut a, b| {
                            a.iter_mut().zip(b).for_each(|(x, y)| *x += y);
                            a
                        },
                    )
            }))
        }
    } else {
        fn accumulate(
            walk: &Walk,
            nw: usize,
            _threads: usize,
            base: u64,
            starts: &[Idx3d],
            shared: Option<Idx3d>,
        ) -> Result<Vec<f64>, SimulationError> {
            let mut acc = vec![0.0; walk.nt + 1];
            for i in 0..nw {
                let (start, mut rng) = walker_state(i, base, starts, shared);
                walk.walk_into(&mut acc, start, &mut rng);
            }
            Ok(acc)
        }
    }
}

impl WalkEngine for LatticeWalker {
    fn run(&mut self, mask: ArrayView3<bool>, config: &WalkConfig) -> Result<(), SimulationError> {
        self.msd = None;
        if config.nw == 0 {
            return Err(SimulationError::new("at least one walker is required"));
        }
        if config.stride == 0 {
            return Err(SimulationError::new("stride must be positive"));
        }
        if config.num_proc == 0 {
            return Err(SimulationError::new("num_proc must be positive"));
        }

        let starts: Vec<Idx3d> = mask
            .indexed_iter()
            .filter_map(|(pos, &v)| v.then_some(pos))
            .collect();
        if starts.is_empty() {
            return Err(SimulationError::new("mask has no voxels to start from"));
        }

        let base = config.seed.unwrap_or_else(rand::random);
        let shared = config.same_start.then(|| {
            let mut rng = StdRng::seed_from_u64(base);
            starts[rng.gen_range(0..starts.len())]
        });

        let (nz, ny, nx) = mask.dim();
        let walk = Walk {
            mask,
            dims: (nz as i64, ny as i64, nx as i64),
            nt: config.nt,
            stride: config.stride as i64,
        };
        log::debug!(
            "walking {} x {} steps on {} voxels ({} threads)",
            config.nw,
            config.nt,
            starts.len(),
            config.num_proc
        );

        let sum = accumulate(&walk, config.nw, config.num_proc, base, &starts, shared)?;
        let norm = (config.nw * config.stride * config.stride) as f64;
        self.msd = Some(sum.into_iter().map(|v| v / norm).collect());
        Ok(())
    }

    fn compute_msd(&self) -> Result<Vec<f64>, SimulationError> {
        self.msd
            .clone()
            .ok_or_else(|| SimulationError::new("no walk has been run"))
    }
}

#[cfg(test)]
mod tests {
    use super::{mirror, LatticeWalker};
    use crate::fitting::linear_f64;
    use crate::walk::{WalkConfig, WalkEngine};
    use ndarray::{Array1, Array3};

    fn config(nt: usize, nw: usize) -> WalkConfig {
        WalkConfig {
            nt,
            nw,
            seed: Some(7),
            num_proc: 2,
            ..WalkConfig::default()
        }
    }

    fn slope(msd: &[f64]) -> f64 {
        let x = Array1::linspace(0.0, (msd.len() - 1) as f64, msd.len());
        let y = Array1::from_vec(msd.to_vec());
        linear_f64(x.view(), y.view()).unwrap().slope
    }

    #[test]
    fn test_mirror() {
        let got: Vec<usize> = (-4..8).map(|c| mirror(c, 3)).collect();
        assert_eq!(got, [2, 2, 1, 0, 0, 1, 2, 2, 1, 0, 0, 1]);
        assert_eq!(mirror(-1, 1), 0);
        assert_eq!(mirror(5, 1), 0);
    }

    #[test]
    fn test_free_space_slope_near_one() {
        let mask = Array3::from_elem((6, 6, 6), true);
        let mut engine = LatticeWalker::new();
        engine.run(mask.view(), &config(200, 2000)).unwrap();
        let msd = engine.compute_msd().unwrap();

        assert_eq!(msd.len(), 201);
        assert_eq!(msd[0], 0.0);
        assert!((slope(&msd) - 1.0).abs() < 0.1);
    }

    #[test]
    fn test_stride_is_normalised() {
        let mask = Array3::from_elem((5, 5, 5), true);
        let mut engine = LatticeWalker::new();
        let cfg = WalkConfig {
            stride: 2,
            ..config(200, 2000)
        };
        engine.run(mask.view(), &cfg).unwrap();
        assert!((slope(&engine.compute_msd().unwrap()) - 1.0).abs() < 0.1);
    }

    #[test]
    fn test_channel_restricts_transport() {
        // 只有 z = 0, y = 0 这一行可通行. 镜像后粒子只能在 x 方向自由扩散.
        let mut mask = Array3::from_elem((4, 4, 16), false);
        for x in 0..16 {
            mask[(0, 0, x)] = true;
        }
        let mut engine = LatticeWalker::new();
        engine.run(mask.view(), &config(300, 2000)).unwrap();
        let tau = 1.0 / slope(&engine.compute_msd().unwrap());
        assert!(tau > 2.0 && tau < 4.5, "tau = {tau}");
    }

    #[test]
    fn test_seed_reproducible() {
        let mask = Array3::from_shape_fn((4, 5, 6), |(z, y, x)| (z + y + x) % 3 != 0);
        let cfg = WalkConfig {
            same_start: true,
            ..config(50, 300)
        };
        let mut a = LatticeWalker::new();
        let mut b = LatticeWalker::new();
        a.run(mask.view(), &cfg).unwrap();
        b.run(mask.view(), &cfg).unwrap();
        assert_eq!(a.compute_msd().unwrap(), b.compute_msd().unwrap());
    }

    #[test]
    fn test_errors() {
        let engine = LatticeWalker::new();
        assert!(engine.compute_msd().is_err());

        let mut engine = LatticeWalker::new();
        let empty = Array3::from_elem((2, 2, 2), false);
        assert!(engine.run(empty.view(), &config(10, 10)).is_err());

        let full = Array3::from_elem((2, 2, 2), true);
        let cfg = WalkConfig {
            nw: 0,
            ..config(10, 10)
        };
        assert!(engine.run(full.view(), &cfg).is_err());
        assert!(engine.compute_msd().is_err());
    }
}
