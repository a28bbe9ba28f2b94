//! 采样器. 决定一个 epoch 内记录索引的迭代顺序.

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};

/// 弱洗牌采样器.
///
/// 以窗口为单位打乱索引空间: 窗口内部保持连续 (把随机读限制在局部,
/// 控制磁盘寻道开销), 窗口之间的顺序每个 epoch 重新洗牌. 每个索引在一个
/// epoch 中恰好出现一次; 末尾不完整的窗口同样会被完整产出.
#[derive(Copy, Clone, Debug)]
pub struct WeakShuffleSampler {
    len: usize,
    window: usize,
}

impl WeakShuffleSampler {
    /// 构建采样器. `len` 为索引空间大小, `window` 为窗口大小
    /// (通常取批大小).
    ///
    /// # 注意
    ///
    /// `window` 必须非零, 否则程序 panic.
    pub fn new(len: usize, window: usize) -> WeakShuffleSampler {
        assert!(window > 0);
        Self { len, window }
    }

    /// 索引空间大小.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// 索引空间是否为空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// 窗口大小.
    #[inline]
    pub fn window(&self) -> usize {
        self.window
    }

    /// 窗口个数. 末尾不完整的窗口也计入.
    #[inline]
    pub fn window_count(&self) -> usize {
        self.len.div_ceil(self.window)
    }

    /// 产生一个 epoch 的索引序列. 每次调用重新洗牌窗口顺序.
    pub fn iter_epoch(&self) -> EpochIter {
        self.epoch_with_rng(&mut rand::thread_rng())
    }

    /// 以给定种子产生一个 epoch 的索引序列. 相同种子产生相同顺序.
    pub fn iter_epoch_seeded(&self, seed: u64) -> EpochIter {
        self.epoch_with_rng(&mut StdRng::seed_from_u64(seed))
    }

    fn epoch_with_rng<R: Rng>(&self, rng: &mut R) -> EpochIter {
        let mut order: Vec<usize> = (0..self.window_count()).collect();
        order.shuffle(rng);
        EpochIter {
            len: self.len,
            window: self.window,
            order,
            cursor: 0,
            offset: 0,
            emitted: 0,
        }
    }
}

/// 弱洗牌采样器产生的单个 epoch 索引迭代器.
#[derive(Debug)]
pub struct EpochIter {
    len: usize,
    window: usize,
    order: Vec<usize>,
    cursor: usize,
    offset: usize,
    emitted: usize,
}

impl Iterator for EpochIter {
    type Item = usize;

    fn next(&mut self) -> Option<Self::Item> {
        let w = *self.order.get(self.cursor)?;
        let start = w * self.window;
        let width = self.window.min(self.len - start);

        let ans = start + self.offset;
        self.offset += 1;
        if self.offset == width {
            self.offset = 0;
            self.cursor += 1;
        }
        self.emitted += 1;
        Some(ans)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let rem = self.len - self.emitted;
        (rem, Some(rem))
    }
}

impl ExactSizeIterator for EpochIter {}

/// 顺序采样器. 验证/测试集使用.
#[derive(Copy, Clone, Debug)]
pub struct SequentialSampler {
    len: usize,
}

impl SequentialSampler {
    /// 构建采样器.
    #[inline]
    pub fn new(len: usize) -> SequentialSampler {
        Self { len }
    }

    /// 索引空间大小.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// 索引空间是否为空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// 产生一个 epoch 的索引序列. 顺序固定为 `0..len`.
    #[inline]
    pub fn iter_epoch(&self) -> std::ops::Range<usize> {
        0..self.len
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check_epoch(len: usize, window: usize, seed: u64) {
        let sampler = WeakShuffleSampler::new(len, window);
        let epoch: Vec<usize> = sampler.iter_epoch_seeded(seed).collect();
        assert_eq!(epoch.len(), len);

        // 每个索引恰好出现一次.
        let mut seen = vec![false; len];
        for &i in &epoch {
            assert!(!seen[i]);
            seen[i] = true;
        }

        // 窗口内部保持连续递增, 且窗口起点对齐.
        let mut cursor = 0;
        while cursor < len {
            let start = epoch[cursor];
            assert_eq!(start % window, 0);
            let width = window.min(len - start);
            for k in 1..width {
                assert_eq!(epoch[cursor + k], start + k);
            }
            cursor += width;
        }
    }

    #[test]
    fn test_epoch_covers_index_space_exactly_once() {
        for &(len, window) in &[(100, 10), (10, 4), (7, 7), (5, 8), (97, 10), (1, 1)] {
            for seed in 0..4 {
                check_epoch(len, window, seed);
            }
        }
    }

    #[test]
    fn test_empty_index_space() {
        let sampler = WeakShuffleSampler::new(0, 4);
        assert!(sampler.is_empty());
        assert_eq!(sampler.window_count(), 0);
        assert_eq!(sampler.iter_epoch().count(), 0);
    }

    #[test]
    fn test_seeded_epochs_reproducible() {
        let sampler = WeakShuffleSampler::new(256, 8);
        let a: Vec<usize> = sampler.iter_epoch_seeded(42).collect();
        let b: Vec<usize> = sampler.iter_epoch_seeded(42).collect();
        assert_eq!(a, b);

        let c: Vec<usize> = sampler.iter_epoch_seeded(43).collect();
        assert_ne!(a, c);
    }

    #[test]
    fn test_exact_size_iterator() {
        let sampler = WeakShuffleSampler::new(10, 3);
        let mut it = sampler.iter_epoch();
        assert_eq!(it.len(), 10);
        it.next();
        assert_eq!(it.len(), 9);
        assert_eq!(it.count(), 9);
    }

    #[test]
    fn test_sequential_sampler() {
        let s = SequentialSampler::new(5);
        assert_eq!(s.len(), 5);
        assert_eq!(s.iter_epoch().collect::<Vec<_>>(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    #[should_panic]
    fn test_zero_window_panics() {
        WeakShuffleSampler::new(10, 0);
    }
}
