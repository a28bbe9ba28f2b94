//! 批量点序列的随机增强.
//!
//! 训练时对每个批次做整批翻转与加性高斯噪声, 再把绝对坐标点序列转换为
//! 相邻差分方向向量. 验证/测试配置下关闭全部随机性, 输出是确定的.

use crate::consts::{DEFAULT_FLIP_P, DEFAULT_NOISE_STD};
use ndarray::{s, Array3, Axis};
use rand::Rng;
use rand_distr::{Distribution, Normal};

/// 批量增强参数, 包含整批翻转概率和加性高斯噪声标准差.
///
/// 该参数是只读的. 若要修改参数, 你应该创建新的实例.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Copy, Clone, Debug)]
pub struct AugmentSpec {
    flip_p: f64,
    noise_std: f32,
}

impl AugmentSpec {
    /// 构建增强参数.
    ///
    /// `flip_p` 必须在 `[0, 1]` 内, `noise_std` 必须非负且有限, 否则返回 `None`.
    pub fn new(flip_p: f64, noise_std: f32) -> Option<AugmentSpec> {
        if (0.0..=1.0).contains(&flip_p) && noise_std >= 0.0 && noise_std.is_finite() {
            Some(Self { flip_p, noise_std })
        } else {
            None
        }
    }

    /// 构建训练默认的增强参数. 翻转概率为 0.5, 噪声标准差为 0.1.
    #[inline]
    pub const fn for_training() -> AugmentSpec {
        Self {
            flip_p: DEFAULT_FLIP_P,
            noise_std: DEFAULT_NOISE_STD,
        }
    }

    /// 构建关闭一切随机性的增强参数. 验证/测试集使用.
    #[inline]
    pub const fn disabled() -> AugmentSpec {
        Self {
            flip_p: 0.0,
            noise_std: 0.0,
        }
    }

    /// 整批翻转概率.
    #[inline]
    pub fn flip_p(&self) -> f64 {
        self.flip_p
    }

    /// 加性高斯噪声标准差.
    #[inline]
    pub fn noise_std(&self) -> f32 {
        self.noise_std
    }

    /// 是否不含任何随机性.
    #[inline]
    pub fn is_disabled(&self) -> bool {
        self.flip_p == 0.0 && self.noise_std == 0.0
    }

    /// 对一批点序列 (形状 (B, L, 3)) 做随机增强.
    ///
    /// 翻转判定以 **整批** 为单位: 单次抽签决定批内所有 streamline
    /// 是否一起沿点序轴反转. 噪声为逐坐标独立的 N(0, noise_std²).
    pub fn apply<R: Rng>(&self, rng: &mut R, points: &mut Array3<f32>) {
        if self.flip_p > 0.0 && rng.gen_bool(self.flip_p) {
            points.invert_axis(Axis(1));
        }
        if self.noise_std > 0.0 {
            // unwrap 安全: 构造时已验证 noise_std 非负且有限.
            let normal = Normal::new(0.0_f32, self.noise_std).unwrap();
            for v in points.iter_mut() {
                *v += normal.sample(rng);
            }
        }
    }
}

/// 将一批点序列转换为相邻差分方向向量. 输出每条比输入少一个点.
///
/// # 注意
///
/// 每条 streamline 至少要有 2 个点, 否则程序 panic.
pub fn directions(points: &Array3<f32>) -> Array3<f32> {
    let len = points.len_of(Axis(1));
    assert!(len >= 2);
    let head = points.slice(s![.., 1.., ..]);
    let tail = points.slice(s![.., ..len - 1, ..]);
    &head - &tail
}
