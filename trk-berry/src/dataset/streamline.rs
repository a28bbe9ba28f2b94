//! streamline 打分数据集.

use super::archive::{ArchiveResult, StreamlineArchive};
use crate::augment::{self, AugmentSpec};
use crate::DirBatch;
use std::path::Path;

/// streamline 打分数据集.
///
/// 在归档访问之上叠加随机增强与方向向量转换, 输出训练可直接消费的
/// (方向向量, 打分) 批. 构建时打开一次归档完成 schema 校验与计数,
/// 随后立即关闭句柄; 之后的批量读取会按需重新打开.
///
/// 每个子集 (训练/验证/测试) 各自创建一个数据集实例, 并配置不同的
/// 增强参数: 训练集开启增强, 验证/测试集关闭.
#[derive(Debug)]
pub struct StreamlineDataset {
    archive: StreamlineArchive,
    augment: AugmentSpec,
    len: usize,
    input_size: usize,
    subjects: Vec<String>,
}

impl StreamlineDataset {
    /// 打开数据集并建立索引.
    pub fn open<P: AsRef<Path>>(p: P, augment: AugmentSpec) -> ArchiveResult<StreamlineDataset> {
        let mut archive = StreamlineArchive::new(p.as_ref());
        let index = archive.build_index()?;
        let point_len = archive.point_len()?;
        let subjects = archive.subject_keys()?;
        archive.close();

        Ok(Self {
            archive,
            augment,
            len: index.end,
            input_size: (point_len - 1) * 3,
            subjects,
        })
    }

    /// 记录总数.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    /// 数据集是否为空.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// 模型单条输入的特征宽度, 即 (L - 1) * 3.
    #[inline]
    pub fn input_size(&self) -> usize {
        self.input_size
    }

    /// 归档文件的 top-level 键. 通常对应上游合并时的来源 subject 列表,
    /// 仅供参考.
    #[inline]
    pub fn subject_keys(&self) -> &[String] {
        &self.subjects
    }

    /// 增强参数.
    #[inline]
    pub fn augment(&self) -> AugmentSpec {
        self.augment
    }

    /// 底层句柄当前是否打开.
    #[inline]
    pub fn is_open(&self) -> bool {
        self.archive.is_open()
    }

    /// 关闭底层句柄. 幂等; 之后的批量读取会重新打开.
    #[inline]
    pub fn close(&mut self) {
        self.archive.close()
    }

    /// 读取一批记录, 做随机增强并转换为方向向量.
    ///
    /// 索引请求必须是单段连续区间, 或回卷的两段连续区间
    /// (见 [`StreamlineArchive::read_batch`]).
    ///
    /// # 注意
    ///
    /// `indices` 不能为空, 否则程序 panic.
    pub fn get_batch(&mut self, indices: &[usize]) -> ArchiveResult<DirBatch> {
        let (mut points, scores) = self.archive.read_batch(indices)?;
        self.augment.apply(&mut rand::thread_rng(), &mut points);
        Ok((augment::directions(&points), scores))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::testutil::create_store;

    #[test]
    fn test_dataset_lifecycle() {
        let path = create_store("dataset-basic", 12, 5);
        let mut dataset = StreamlineDataset::open(&path, AugmentSpec::disabled()).unwrap();
        assert_eq!(dataset.len(), 12);
        assert!(!dataset.is_empty());
        assert_eq!(dataset.input_size(), 12); // (5 - 1) * 3
        assert!(!dataset.is_open()); // 建完索引后句柄已关闭.

        let (dirs, scores) = dataset.get_batch(&[2, 3, 4]).unwrap();
        assert!(dataset.is_open());
        assert_eq!(dirs.dim(), (3, 4, 3));
        assert_eq!(scores.shape(), &[3]);

        // 关闭增强时, 方向向量等于原始点序列的相邻差分:
        // 测试归档中每一步的每个分量都是 3.
        for v in dirs.iter() {
            assert_eq!(*v, 3.0);
        }

        dataset.close();
        assert!(!dataset.is_open());
    }

    #[test]
    fn test_batch_rollover_through_dataset() {
        let path = create_store("dataset-rollover", 10, 4);
        let mut dataset = StreamlineDataset::open(&path, AugmentSpec::disabled()).unwrap();
        let (dirs, scores) = dataset.get_batch(&[8, 9, 0, 1]).unwrap();
        assert_eq!(dirs.dim(), (4, 3, 3));
        assert_eq!(scores[[0]], 8.0);
        assert_eq!(scores[[1]], 9.0);
        assert_eq!(scores[[2]], 0.0);
        assert_eq!(scores[[3]], 1.0);
    }

    #[test]
    fn test_train_augment_keeps_shape() {
        let path = create_store("dataset-augment", 8, 6);
        let mut dataset = StreamlineDataset::open(&path, AugmentSpec::for_training()).unwrap();
        let (dirs, scores) = dataset.get_batch(&[0, 1, 2, 3]).unwrap();
        assert_eq!(dirs.dim(), (4, 5, 3));
        assert_eq!(scores.shape(), &[4]);
    }

    #[test]
    fn test_subject_keys_listed() {
        let path = create_store("dataset-subjects", 4, 4);
        let dataset = StreamlineDataset::open(&path, AugmentSpec::disabled()).unwrap();
        assert_eq!(dataset.subject_keys().len(), 1);
        assert_eq!(dataset.subject_keys()[0], "streamlines");
    }
}
