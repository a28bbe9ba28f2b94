//! streamline 打分归档的底层访问.

use crate::consts::{POINTS_DATASET, SCORES_DATASET, STREAMLINES_GROUP};
use itertools::Itertools;
use ndarray::{s, Array3, ArrayD, Axis, Ix3, IxDyn};
use std::ops::Range;
use std::path::{Path, PathBuf};

/// 打开或读取 streamline 归档的错误.
#[derive(Debug)]
pub enum ArchiveError {
    /// 归档文件不存在.
    NotFound(PathBuf),

    /// 点数组与打分数组的布局不满足契约 (期望点数组为 (N, L, 3) 且
    /// L >= 2, 打分数组为 (N,) 或 (N, K)). 参数为两者的实际形状.
    SchemaMismatch(Vec<usize>, Vec<usize>),

    /// 请求的索引范围超出记录总数.
    OutOfRange {
        /// 请求区间起点.
        start: usize,
        /// 请求区间终点 (不含).
        end: usize,
        /// 归档中的记录总数.
        len: usize,
    },

    /// 批量索引请求无法分解为至多两段递增连续区间.
    MalformedBatchRequest {
        /// 请求中的首个索引.
        first: usize,
        /// 请求中的末个索引.
        last: usize,
    },

    /// workers 太大. 最多支持 64.
    TooManyWorkers(usize),

    /// 其他底层 HDF5 错误.
    Hdf5(hdf5::Error),
}

impl From<hdf5::Error> for ArchiveError {
    fn from(e: hdf5::Error) -> Self {
        ArchiveError::Hdf5(e)
    }
}

/// 归档操作结果.
pub type ArchiveResult<T> = Result<T, ArchiveError>;

/// 已打开归档的内部状态.
#[derive(Debug)]
struct Handle {
    file: hdf5::File,
    points: hdf5::Dataset,
    scores: hdf5::Dataset,
    len: usize,
    point_len: usize,
    score_ndim: usize,
    score_width: usize,
}

impl Handle {
    fn open(path: &Path) -> ArchiveResult<Handle> {
        if !path.is_file() {
            return Err(ArchiveError::NotFound(path.to_owned()));
        }
        let file = hdf5::File::open(path)?;
        let group = file.group(STREAMLINES_GROUP)?;
        let points = group.dataset(POINTS_DATASET)?;
        let scores = group.dataset(SCORES_DATASET)?;

        let p_shape = points.shape();
        let s_shape = scores.shape();
        let schema_ok = p_shape.len() == 3
            && p_shape[2] == 3
            && p_shape[1] >= 2
            && matches!(s_shape.len(), 1 | 2)
            && s_shape[0] == p_shape[0];
        if !schema_ok {
            return Err(ArchiveError::SchemaMismatch(p_shape, s_shape));
        }

        Ok(Handle {
            len: p_shape[0],
            point_len: p_shape[1],
            score_ndim: s_shape.len(),
            score_width: if s_shape.len() == 2 { s_shape[1] } else { 1 },
            file,
            points,
            scores,
        })
    }
}

/// streamline 打分归档.
///
/// 封装单个 HDF5 容器文件的惰性只读句柄: 首次读取时打开, [`close`]
/// 之后的读取会按需重新打开. 容器布局为固定组 `streamlines` 下的两个
/// 平行数组 `data` (形状 (N, L, 3)) 与 `scores` (形状 (N,) 或 (N, K));
/// 存储顺序是唯一的寻址方式, 记录没有独立标识.
///
/// [`close`]: StreamlineArchive::close
#[derive(Debug)]
pub struct StreamlineArchive {
    path: PathBuf,
    handle: Option<Handle>,
}

impl StreamlineArchive {
    /// 构建归档访问对象. 不做任何 I/O.
    pub fn new<P: AsRef<Path>>(p: P) -> StreamlineArchive {
        Self {
            path: p.as_ref().to_owned(),
            handle: None,
        }
    }

    /// 构建归档访问对象并立即打开与校验. 文件缺失或布局不合法时构建失败.
    pub fn open<P: AsRef<Path>>(p: P) -> ArchiveResult<StreamlineArchive> {
        let mut ans = Self::new(p);
        ans.ensure_open()?;
        Ok(ans)
    }

    /// 归档文件路径.
    #[inline]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 底层句柄当前是否打开.
    #[inline]
    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// 关闭底层句柄. 幂等; 之后的读取会重新打开.
    pub fn close(&mut self) {
        if self.handle.take().is_some() {
            log::debug!("streamline archive closed: {}", self.path.display());
        }
    }

    fn ensure_open(&mut self) -> ArchiveResult<&Handle> {
        if self.handle.is_none() {
            log::debug!("opening streamline archive: {}", self.path.display());
            self.handle = Some(Handle::open(&self.path)?);
        }
        Ok(self.handle.as_ref().unwrap())
    }

    /// 记录总数 N.
    pub fn record_len(&mut self) -> ArchiveResult<usize> {
        Ok(self.ensure_open()?.len)
    }

    /// 每条 streamline 的点数 L.
    pub fn point_len(&mut self) -> ArchiveResult<usize> {
        Ok(self.ensure_open()?.point_len)
    }

    /// 建立索引空间. 每次数据集构建时运行一次, 返回稠密索引区间 `0..N`.
    pub fn build_index(&mut self) -> ArchiveResult<Range<usize>> {
        let h = self.ensure_open()?;
        log::info!("building index: {} records", h.len);
        Ok(0..h.len)
    }

    /// 归档文件的全部 top-level 键. 通常对应上游合并时的来源 subject
    /// 列表, 仅供参考.
    pub fn subject_keys(&mut self) -> ArchiveResult<Vec<String>> {
        let h = self.ensure_open()?;
        Ok(h.file.member_names()?)
    }

    /// 读取连续区间 `[start, end)` 的记录, 返回 (点序列, 打分).
    ///
    /// 要求 `0 <= start <= end <= N`, 否则返回 [`ArchiveError::OutOfRange`].
    pub fn read_range(
        &mut self,
        start: usize,
        end: usize,
    ) -> ArchiveResult<(Array3<f32>, ArrayD<f32>)> {
        let h = self.ensure_open()?;
        if start > end || end > h.len {
            return Err(ArchiveError::OutOfRange {
                start,
                end,
                len: h.len,
            });
        }
        if start == end {
            let points = Array3::zeros((0, h.point_len, 3));
            let scores = if h.score_ndim == 1 {
                ArrayD::zeros(IxDyn(&[0]))
            } else {
                ArrayD::zeros(IxDyn(&[0, h.score_width]))
            };
            return Ok((points, scores));
        }

        let points = h.points.read_slice::<f32, _, Ix3>(s![start..end, .., ..])?;
        let scores = if h.score_ndim == 1 {
            h.scores.read_slice_1d::<f32, _>(s![start..end])?.into_dyn()
        } else {
            h.scores
                .read_slice_2d::<f32, _>(s![start..end, ..])?
                .into_dyn()
        };
        Ok((points, scores))
    }

    /// 读取一个批量索引请求的记录.
    ///
    /// 首索引不大于末索引时, 整个请求按单段连续区间 `[first, last + 1)`
    /// 读取 (近似: 不检查中间空洞). 首索引大于末索引说明请求在洗牌窗口边界
    /// 处回卷, 此时请求必须恰好分解为两段递增连续区间, 两段分别读取后按
    /// 请求顺序拼接; 无法如此分解的请求返回
    /// [`ArchiveError::MalformedBatchRequest`].
    ///
    /// # 注意
    ///
    /// `indices` 不能为空, 否则程序 panic.
    pub fn read_batch(&mut self, indices: &[usize]) -> ArchiveResult<(Array3<f32>, ArrayD<f32>)> {
        assert!(!indices.is_empty());
        let first = indices[0];
        let last = indices[indices.len() - 1];

        if first <= last {
            return self.read_range(first, last + 1);
        }

        // 回卷: 找出请求中所有非连续断点.
        let mut breaks = indices.iter().tuple_windows().positions(|(&a, &b)| b != a + 1);
        let cut = match (breaks.next(), breaks.next()) {
            (Some(c), None) => c + 1,
            _ => return Err(ArchiveError::MalformedBatchRequest { first, last }),
        };

        let head = &indices[..cut];
        let tail = &indices[cut..];
        let (p0, s0) = self.read_range(head[0], head[head.len() - 1] + 1)?;
        let (p1, s1) = self.read_range(tail[0], tail[tail.len() - 1] + 1)?;

        // unwrap 安全: 两段的尾维形状一定一致.
        let points = ndarray::concatenate(Axis(0), &[p0.view(), p1.view()]).unwrap();
        let scores = ndarray::concatenate(Axis(0), &[s0.view(), s1.view()]).unwrap();
        Ok((points, scores))
    }
}
