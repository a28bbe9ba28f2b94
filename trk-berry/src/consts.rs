//! 通用常量.

/// streamline 打分值.
pub mod score {
    /// 打分管线中, 解剖学上有效的 streamline 的打分.
    pub const VALID: f32 = 1.0;

    /// 打分管线中, 无效 streamline 的打分.
    pub const INVALID: f32 = 0.0;

    /// 连续打分的二值化阈值.
    pub const THRESHOLD: f32 = 0.5;

    /// 打分是否判为有效?
    #[inline]
    pub fn is_valid(s: f32) -> bool {
        s >= THRESHOLD
    }

    /// 打分是否判为无效?
    #[inline]
    pub fn is_invalid(s: f32) -> bool {
        !is_valid(s)
    }
}

/// HDF5 容器中 streamline 组的键名.
pub const STREAMLINES_GROUP: &str = "streamlines";

/// streamline 组内点序列数组的键名. 数组形状为 (N, L, 3).
pub const POINTS_DATASET: &str = "data";

/// streamline 组内打分数组的键名. 数组形状为 (N,) 或 (N, K).
pub const SCORES_DATASET: &str = "scores";

/// 训练集在索引空间中的占比.
pub const TRAIN_FRACTION: f64 = 0.7;

/// 训练集 + 验证集在索引空间中的占比, 即验证集的右边界.
pub const VALID_BOUNDARY: f64 = 0.9;

/// 训练默认的加性高斯噪声标准差.
pub const DEFAULT_NOISE_STD: f32 = 0.1;

/// 训练默认的整批翻转概率.
pub const DEFAULT_FLIP_P: f64 = 0.5;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_score_predicates() {
        assert!(score::is_valid(score::VALID));
        assert!(!score::is_valid(score::INVALID));
        assert!(score::is_invalid(0.2));
        assert!(score::is_valid(0.8));
    }

    #[test]
    fn test_fraction_sanity() {
        assert!(0.0 < TRAIN_FRACTION);
        assert!(TRAIN_FRACTION < VALID_BOUNDARY);
        assert!(VALID_BOUNDARY < 1.0);
    }
}
