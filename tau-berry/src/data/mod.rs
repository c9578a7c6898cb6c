//! 3D 扫描数据结构, 以及多种体数据格式的加载.

use std::ops::Index;
use std::path::Path;

use ndarray::{Array3, ArrayView3, Ix3};
use nifti::{IntoNdArray, NiftiObject, ReaderOptions};

use crate::Idx3d;

mod nrrd;
pub mod phase;
mod save;

pub use phase::{Phase, PhaseMasks, Thresholds};
pub use save::MaskWriteVis;

/// 加载体数据时的错误.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// 底层 I/O 错误.
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// nifti 文件错误.
    #[error(transparent)]
    Nifti(#[from] nifti::NiftiError),

    /// npy 文件错误.
    #[error(transparent)]
    Npy(#[from] ndarray_npy::ReadNpyError),

    /// NRRD 文件头格式错误.
    #[error("malformed header: {0}")]
    Header(String),

    /// 不支持的编码、类型或分离式数据文件.
    #[error("unsupported: {0}")]
    Unsupported(String),

    /// 数据不是三维的.
    #[error("expected a 3D volume, found {0} dimension(s)")]
    Dimension(usize),

    /// 数据长度与文件头声明不一致.
    #[error("data length mismatch: expected {expected} bytes, found {found}")]
    Length {
        /// 文件头声明的字节数.
        expected: usize,

        /// 实际字节数.
        found: usize,
    },

    /// 数据中含有 `NaN` 或 `inf`.
    #[error("volume contains non-finite values")]
    NonFinite,

    /// 无法从扩展名识别文件格式.
    #[error("unknown volume format `{0}`")]
    Extension(String),
}

/// 支持的体数据文件格式.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
enum Format {
    Nrrd,
    Nifti,
    Npy,
}

impl Format {
    fn from_path(path: &Path) -> Result<Self, LoadError> {
        let name = path
            .file_name()
            .map(|s| s.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        if name.ends_with(".nrrd") {
            Ok(Self::Nrrd)
        } else if name.ends_with(".nii") || name.ends_with(".nii.gz") {
            Ok(Self::Nifti)
        } else if name.ends_with(".npy") {
            Ok(Self::Npy)
        } else {
            Err(LoadError::Extension(name))
        }
    }
}

/// 3D 孔隙 CT 扫描. 灰度值以 `f32` 保存, 按 `(z, y, x)` 访问.
///
/// 加载后不可变.
#[derive(Debug, Clone)]
pub struct PcScan {
    data: Array3<f32>,
    spacing: [f64; 3],
}

impl Index<Idx3d> for PcScan {
    type Output = f32;

    #[inline]
    fn index(&self, index: Idx3d) -> &Self::Output {
        &self.data[index]
    }
}

impl PcScan {
    /// 打开体数据文件. 根据扩展名选择 NRRD (`.nrrd`), nifti (`.nii`, `.nii.gz`)
    /// 或 npy (`.npy`) 读取方式.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, LoadError> {
        let path = path.as_ref();
        match Format::from_path(path)? {
            Format::Nrrd => {
                let (data, spacing) = nrrd::read_file(path)?;
                Self::from_array(data).map(|s| s.with_spacing(spacing))
            }
            Format::Nifti => Self::open_nifti(path),
            Format::Npy => Self::from_array(ndarray_npy::read_npy::<_, Array3<f32>>(path)?),
        }
    }

    fn open_nifti(path: &Path) -> Result<Self, LoadError> {
        let obj = ReaderOptions::new().read_file(path)?;
        let [_, px, py, pz, ..] = obj.header().pixdim;

        // [x, y, z] -> [z, y, x].
        let data = obj.into_volume().into_ndarray::<f32>()?;
        let ndim = data.ndim();
        let data = data
            .into_dimensionality::<Ix3>()
            .map_err(|_| LoadError::Dimension(ndim))?
            .permuted_axes([2, 1, 0]);
        let data = data.as_standard_layout().into_owned();

        Self::from_array(data).map(|s| s.with_spacing([pz as f64, py as f64, px as f64]))
    }

    /// 从内存数据直接创建扫描. `data` 按 `(z, y, x)` 组织, 体素间距默认为 1.
    ///
    /// 若数据中存在非有限值则返回 `Err`.
    pub fn from_array(data: Array3<f32>) -> Result<Self, LoadError> {
        if data.iter().any(|v| !v.is_finite()) {
            return Err(LoadError::NonFinite);
        }
        Ok(Self {
            data,
            spacing: [1.0; 3],
        })
    }

    /// 设置体素间距, 按 `[z, y, x]` 顺序. 非正或非有限的分量按 1 处理.
    pub fn with_spacing(mut self, spacing: [f64; 3]) -> Self {
        self.spacing = spacing.map(|s| if s.is_finite() && s > 0.0 { s } else { 1.0 });
        self
    }

    /// 数据形状 `(z, y, x)`.
    #[inline]
    pub fn shape(&self) -> Idx3d {
        self.data.dim()
    }

    /// 体素个数.
    #[inline]
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// 体素间距 `[z, y, x]`.
    #[inline]
    pub fn spacing(&self) -> [f64; 3] {
        self.spacing
    }

    /// 获得数据的一份不可变 shallow copy.
    #[inline]
    pub fn data(&self) -> ArrayView3<'_, f32> {
        self.data.view()
    }
}
