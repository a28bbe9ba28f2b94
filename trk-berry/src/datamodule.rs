//! 训练/验证/测试三分的批量装载编排.

use crate::augment::AugmentSpec;
use crate::consts::{TRAIN_FRACTION, VALID_BOUNDARY};
use crate::dataset::{ArchiveResult, StreamlineArchive, StreamlineDataset};
use crate::sampler::{EpochIter, SequentialSampler, WeakShuffleSampler};
use crate::DirBatch;
use either::Either;
use std::ops::Range;
use std::path::{Path, PathBuf};

#[cfg(feature = "rayon")]
use crate::dataset::ArchivePool;
#[cfg(feature = "rayon")]
use std::num::NonZeroUsize;

/// 数据子集标识.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Split {
    /// 训练集.
    Train,

    /// 验证集.
    Valid,

    /// 测试集.
    Test,
}

/// 按固定比例划分的三分索引区间.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SplitRanges {
    /// 训练区间 `[0, floor(0.7 N))`.
    pub train: Range<usize>,

    /// 验证区间 `[floor(0.7 N), floor(0.9 N))`.
    pub valid: Range<usize>,

    /// 测试区间 `[floor(0.9 N), N)`.
    pub test: Range<usize>,
}

impl SplitRanges {
    /// 从记录总数计算三分区间. 区间连续, 互不重叠, 且完整覆盖 `0..n`.
    ///
    /// 划分只按存储位置进行, 索引空间的顺序被视为任意;
    /// 本层不提供 subject 级防泄漏保证.
    pub fn from_len(n: usize) -> SplitRanges {
        let train_end = (n as f64 * TRAIN_FRACTION) as usize;
        let valid_end = (n as f64 * VALID_BOUNDARY) as usize;
        SplitRanges {
            train: 0..train_end,
            valid: train_end..valid_end,
            test: valid_end..n,
        }
    }

    /// 给定子集对应的区间.
    pub fn get(&self, split: Split) -> Range<usize> {
        match split {
            Split::Train => self.train.clone(),
            Split::Valid => self.valid.clone(),
            Split::Test => self.test.clone(),
        }
    }
}

/// streamline 数据装载模块.
///
/// 打开数据集文件后一次性建立索引空间并划分三分区间, 随后为每个子集配置
/// 相应的采样器, 尾批策略与增强参数:
///
/// 1. 训练集: 弱洗牌采样 (窗口大小 = 批大小), 丢弃不完整尾批, 开启增强.
/// 2. 验证集: 顺序采样, 丢弃不完整尾批, 关闭增强.
/// 3. 测试集: 顺序采样, 保留不完整尾批 (所有记录都被评估), 关闭增强.
#[derive(Debug)]
pub struct StreamlineDataModule {
    path: PathBuf,
    batch_size: usize,
    splits: SplitRanges,
    input_size: usize,
    train_augment: AugmentSpec,
}

impl StreamlineDataModule {
    /// 打开数据集文件并计算三分区间.
    ///
    /// # 注意
    ///
    /// `batch_size` 必须非零, 否则程序 panic.
    pub fn open<P: AsRef<Path>>(p: P, batch_size: usize) -> ArchiveResult<StreamlineDataModule> {
        assert!(batch_size > 0);
        let mut archive = StreamlineArchive::new(p.as_ref());
        let index = archive.build_index()?;
        let point_len = archive.point_len()?;
        archive.close();

        let splits = SplitRanges::from_len(index.end);
        log::info!(
            "split sizes: train {} / valid {} / test {}",
            splits.train.len(),
            splits.valid.len(),
            splits.test.len()
        );
        Ok(Self {
            path: p.as_ref().to_owned(),
            batch_size,
            splits,
            input_size: (point_len - 1) * 3,
            train_augment: AugmentSpec::for_training(),
        })
    }

    /// 替换训练集的增强参数. 验证/测试集始终关闭增强.
    pub fn with_train_augment(mut self, spec: AugmentSpec) -> StreamlineDataModule {
        self.train_augment = spec;
        self
    }

    /// 批大小.
    #[inline]
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// 三分索引区间.
    #[inline]
    pub fn splits(&self) -> &SplitRanges {
        &self.splits
    }

    /// 模型单条输入的特征宽度, 即 (L - 1) * 3.
    #[inline]
    pub fn input_size(&self) -> usize {
        self.input_size
    }

    /// 创建训练集装载器, 开启一个新的训练 epoch.
    pub fn train_loader(&self) -> ArchiveResult<BatchLoader> {
        let dataset = StreamlineDataset::open(&self.path, self.train_augment)?;
        let range = self.splits.train.clone();
        let sampler = WeakShuffleSampler::new(range.len(), self.batch_size);
        Ok(BatchLoader {
            dataset,
            indices: Either::Left(sampler.iter_epoch()),
            offset: range.start,
            batch_size: self.batch_size,
            drop_last: true,
            dead: false,
        })
    }

    /// 创建验证集装载器. 顺序采样, 丢弃不完整尾批.
    pub fn valid_loader(&self) -> ArchiveResult<BatchLoader> {
        self.sequential_loader(self.splits.valid.clone(), true)
    }

    /// 创建测试集装载器. 顺序采样, 保留不完整尾批.
    pub fn test_loader(&self) -> ArchiveResult<BatchLoader> {
        self.sequential_loader(self.splits.test.clone(), false)
    }

    fn sequential_loader(&self, range: Range<usize>, drop_last: bool) -> ArchiveResult<BatchLoader> {
        let dataset = StreamlineDataset::open(&self.path, AugmentSpec::disabled())?;
        let sampler = SequentialSampler::new(range.len());
        Ok(BatchLoader {
            dataset,
            indices: Either::Right(sampler.iter_epoch()),
            offset: range.start,
            batch_size: self.batch_size,
            drop_last,
            dead: false,
        })
    }
}

#[cfg(feature = "rayon")]
impl StreamlineDataModule {
    /// 用 `workers` 个独立只读通道并行生产 `split` 子集一个 epoch 的所有
    /// 批次, 对每个完成的批次调用 `f`.
    ///
    /// 各通道独立打开同一归档文件 (HDF5 支持多句柄并发只读), 随机增强在
    /// 工作线程内完成, 因此线程间没有共享可变状态. 批次的完成顺序不保证
    /// 与采样顺序一致. 任何一个批次失败会取消整个 epoch 并返回该错误.
    pub fn par_epoch<F>(&self, split: Split, workers: NonZeroUsize, f: F) -> ArchiveResult<()>
    where
        F: Fn(DirBatch) + Send + Sync,
    {
        use rayon::prelude::*;

        let pool = ArchivePool::new(workers, &self.path)?;
        let range = self.splits.get(split);
        let (augment, drop_last) = match split {
            Split::Train => (self.train_augment, true),
            Split::Valid => (AugmentSpec::disabled(), true),
            Split::Test => (AugmentSpec::disabled(), false),
        };

        let order: Vec<usize> = match split {
            Split::Train => WeakShuffleSampler::new(range.len(), self.batch_size)
                .iter_epoch()
                .map(|i| i + range.start)
                .collect(),
            _ => range.collect(),
        };
        let mut batches: Vec<&[usize]> = order.chunks(self.batch_size).collect();
        if drop_last {
            batches.retain(|b| b.len() == self.batch_size);
        }

        batches.into_par_iter().try_for_each(|b| {
            let (mut points, scores) = pool.read_batch(b)?;
            augment.apply(&mut rand::thread_rng(), &mut points);
            f((crate::augment::directions(&points), scores));
            Ok(())
        })
    }
}

/// 单个子集上一个 epoch 的批量装载器.
///
/// 惰性产出 (方向向量, 打分) 批. 迭代一旦产出 `Err`, 本 epoch 即中止,
/// 之后的 `next` 返回 `None`. 迭代结束后不可重置, 新 epoch 需通过
/// [`StreamlineDataModule`] 重新创建.
#[derive(Debug)]
pub struct BatchLoader {
    dataset: StreamlineDataset,
    indices: Either<EpochIter, Range<usize>>,
    offset: usize,
    batch_size: usize,
    drop_last: bool,
    dead: bool,
}

impl BatchLoader {
    /// 本 epoch 剩余的批次个数.
    pub fn batch_count(&self) -> usize {
        let rem = match &self.indices {
            Either::Left(it) => it.len(),
            Either::Right(r) => r.len(),
        };
        if self.drop_last {
            rem / self.batch_size
        } else {
            rem.div_ceil(self.batch_size)
        }
    }

    /// 底层数据集.
    #[inline]
    pub fn dataset(&self) -> &StreamlineDataset {
        &self.dataset
    }
}

impl Iterator for BatchLoader {
    type Item = ArchiveResult<DirBatch>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.dead {
            return None;
        }
        let offset = self.offset;
        let batch: Vec<usize> = self
            .indices
            .by_ref()
            .take(self.batch_size)
            .map(|i| i + offset)
            .collect();
        if batch.is_empty() || (self.drop_last && batch.len() < self.batch_size) {
            return None;
        }

        let ans = self.dataset.get_batch(&batch);
        if ans.is_err() {
            self.dead = true;
        }
        Some(ans)
    }
}
