#![warn(missing_docs)] // <= 合适时移除它.

//! 核心库. 提供 tractography streamline 打分数据集的结构化访问, 弱洗牌采样与
//! 批量随机增强功能, 服务于 streamline 有效性打分模型的训练管线.
//!
//! 上游管线 (外部 tracking 与打分工具) 负责生成候选 tractogram, 按真值
//! bundle 打分后合并为单个 HDF5 容器文件; 本 crate 只消费该文件, 不负责生产.
//! 下游训练循环从本 crate 获得 (方向向量, 打分) 批并执行梯度更新.
//!
//! # 注意
//!
//! 1. 该 crate 目前主要适配上游合并管线产出的 `streamlines/{data, scores}`
//!    双平行数组布局, 没有对其它布局进行直接适配 (但如果新数据按照该模式
//!    组织, 也可以工作).
//! 2. 在非期望情况下, 程序会直接 panic, 而不会导致内存错误. As what Rust promises.
//!
//! # 开发计划
//!
//! ### 惰性句柄的归档访问层 ✅
//!
//! 惰性打开 / 显式关闭 / 按需重开, 连续区间读取与回卷批量读取.
//!
//! 实现位于 `trk-berry/src/dataset/archive.rs`.
//!
//! ### 多通道归档连接池 ✅
//!
//! 每个工作通道独立持有只读句柄, 轮转分配, 供并行批量生产使用.
//!
//! 实现位于 `trk-berry/src/dataset/pool.rs`.
//!
//! ### 批量随机增强 ✅
//!
//! 整批翻转 + 加性高斯噪声 + 相邻差分方向向量.
//!
//! 实现位于 `trk-berry/src/augment.rs`.
//!
//! ### 弱洗牌采样 ✅
//!
//! 窗口内连续, 窗口间洗牌的 epoch 索引序列; 支持显式种子.
//!
//! 实现位于 `trk-berry/src/sampler.rs`.
//!
//! ### 三分装载编排 ✅
//!
//! 0.7 / 0.2 / 0.1 索引区间划分, 每个子集独立的采样器与尾批策略,
//! `rayon` feature 下的并行 epoch 生产.
//!
//! 实现位于 `trk-berry/src/datamodule.rs`.
//!
//! ### 完善代码文档 ✅
//!
//! 给每个 public API 提供文档, 并视情况给 private API 提供文档.

use ndarray::{Array3, ArrayD};

/// 单个输出批次: (方向向量, 打分).
///
/// 方向向量形状为 (B, L-1, 3). 打分形状与归档中存储一致, 为 (B,) 或 (B, K).
pub type DirBatch = (Array3<f32>, ArrayD<f32>);

pub mod consts;

pub mod augment;

pub mod dataset;

pub mod sampler;

pub mod datamodule;

pub mod prelude;

pub use augment::AugmentSpec;
pub use datamodule::{BatchLoader, Split, SplitRanges, StreamlineDataModule};
pub use dataset::{
    ArchiveError, ArchivePool, ArchiveResult, StreamlineArchive, StreamlineDataset,
};
pub use sampler::{SequentialSampler, WeakShuffleSampler};
