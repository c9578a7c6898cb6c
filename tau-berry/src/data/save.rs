//! 掩膜切片的持久化存储, 便于肉眼检查分割效果.

use super::phase::PhaseMasks;
use image::{GrayImage, ImageResult, Luma};
use ndarray::{Array3, ArrayView3, Axis};
use std::path::Path;

/// 表明一个可以按 **可视化友好** 模式保存水平切片的 3D 掩膜.
///
/// 相内体素保存为白色, 其余为黑色.
pub trait MaskWriteVis {
    /// 将第 `z_index` 层切片保存到 `path`. 当 `z_index` 越界时 panic.
    fn save_slice<P: AsRef<Path>>(&self, z_index: usize, path: P) -> ImageResult<()>;
}

fn save_view<P: AsRef<Path>>(mask: ArrayView3<bool>, z_index: usize, path: P) -> ImageResult<()> {
    let sli = mask.index_axis(Axis(0), z_index);
    let (height, width) = sli.dim();
    let mut buf = GrayImage::new(width as u32, height as u32);
    for ((h, w), &v) in sli.indexed_iter() {
        buf.put_pixel(w as u32, h as u32, Luma([if v { u8::MAX } else { u8::MIN }]));
    }
    buf.save(path)
}

macro_rules! impl_mask_vis {
    ($($mask: ty),+) => {
        $(
            impl MaskWriteVis for $mask {
                #[inline]
                fn save_slice<P: AsRef<Path>>(&self, z_index: usize, path: P) -> ImageResult<()> {
                    save_view(self.view(), z_index, path)
                }
            }
        )+
    };
}

impl_mask_vis!(Array3<bool>, ArrayView3<'_, bool>);

impl PhaseMasks {
    /// 将三个掩膜的中间层切片保存到 `dir` 目录, 文件名为 `{stem}_{phase}.png`.
    ///
    /// 深度为 0 的掩膜没有切片可保存, 此时什么也不写, 返回 `Ok(false)`.
    pub fn save_mid_slices<P: AsRef<Path>>(&self, dir: P, stem: &str) -> ImageResult<bool> {
        let depth = self.shape().0;
        if depth == 0 {
            return Ok(false);
        }
        let z = depth / 2;
        for (phase, mask) in self.iter() {
            let path = dir.as_ref().join(format!("{stem}_{phase}.png"));
            mask.save_slice(z, path)?;
        }
        Ok(true)
    }
}
