//! 🍇欢迎光临🍓
//!
//! 涵盖了本 crate 一系列常用的功能.

pub use crate::DirBatch;

pub use crate::augment::{directions, AugmentSpec};

pub use crate::consts::score;
pub use crate::consts::{DEFAULT_FLIP_P, DEFAULT_NOISE_STD};

pub use crate::dataset::{self, home_dataset_dir_with};
pub use crate::dataset::{ArchivePool, StreamlineArchive, StreamlineDataset};

pub use crate::datamodule::{BatchLoader, Split, SplitRanges, StreamlineDataModule};

pub use crate::sampler::{SequentialSampler, WeakShuffleSampler};
