//! 多通道归档连接池.

use super::archive::{ArchiveError, ArchiveResult, StreamlineArchive};
use ndarray::{Array3, ArrayD};
use std::num::NonZeroUsize;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// streamline 归档连接池.
///
/// 该结构可用于建模并行批量生产时对同一归档文件的多路只读访问:
/// 每个工作通道独立打开一次文件并持有自己的句柄 (HDF5 支持多句柄并发
/// 只读), 调用方以轮转方式取得通道, 因此除通道自身的排他入口点外,
/// 工作线程之间没有共享可变状态.
pub struct ArchivePool {
    entries: Vec<Mutex<StreamlineArchive>>,
    turn: AtomicUsize,
}

impl ArchivePool {
    /// 初始化.
    ///
    /// `workers` 指定了底层工作通道的个数, 最大为 64. 系统会从路径 `p` 打开文件
    /// `workers` 次, 并为每个打开通道指定一个排他入口点 (以期获得更高的并行度).
    /// 每个通道在此处立即完成打开与 schema 校验, 失败则整体构建失败.
    pub fn new<P: AsRef<Path>>(workers: NonZeroUsize, p: P) -> ArchiveResult<ArchivePool> {
        let workers = workers.get();
        if workers > 64 {
            return Err(ArchiveError::TooManyWorkers(64));
        }
        let mut v = Vec::with_capacity(workers);
        for _ in 0..workers {
            v.push(Mutex::new(StreamlineArchive::open(p.as_ref())?));
        }
        Ok(Self {
            entries: v,
            turn: AtomicUsize::new(0),
        })
    }

    /// 通过下一个入口点读取连续区间 `[start, end)`.
    pub fn read_range(&self, start: usize, end: usize) -> ArchiveResult<(Array3<f32>, ArrayD<f32>)> {
        let slot = self.next_slot();
        self.entries[slot].lock().unwrap().read_range(start, end)
    }

    /// 通过下一个入口点读取批量索引请求 (支持回卷语义, 见
    /// [`StreamlineArchive::read_batch`]).
    ///
    /// # 注意
    ///
    /// `indices` 不能为空, 否则程序 panic.
    pub fn read_batch(&self, indices: &[usize]) -> ArchiveResult<(Array3<f32>, ArrayD<f32>)> {
        let slot = self.next_slot();
        self.entries[slot].lock().unwrap().read_batch(indices)
    }

    /// 记录总数 N.
    pub fn record_len(&self) -> ArchiveResult<usize> {
        let slot = self.next_slot();
        self.entries[slot].lock().unwrap().record_len()
    }

    /// 工作通道个数.
    #[inline]
    pub fn worker_len(&self) -> usize {
        self.entries.len()
    }

    fn next_slot(&self) -> usize {
        self.turn.fetch_add(1, Ordering::Relaxed) % self.worker_len()
    }
}
