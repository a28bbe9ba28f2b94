//! 数据集操作.

use std::path::{Path, PathBuf};

mod archive;
mod pool;
mod streamline;

pub use archive::{ArchiveError, ArchiveResult, StreamlineArchive};
pub use pool::ArchivePool;
pub use streamline::StreamlineDataset;

/// 获取 `{用户主目录}/dataset` 目录.
pub fn home_dataset_dir() -> Option<PathBuf> {
    let mut ans = dirs::home_dir()?;
    ans.push("dataset");
    Some(ans)
}

/// 获取 `{用户主目录}/dataset` 目录下给定继续项组成的全路径.
pub fn home_dataset_dir_with<P: AsRef<Path>, I: IntoIterator<Item = P>>(it: I) -> Option<PathBuf> {
    let mut ans = dirs::home_dir()?;
    ans.push("dataset");
    ans.extend(it);
    Some(ans)
}

#[cfg(test)]
pub(crate) mod testutil {
    use ndarray::{Array1, Array3};
    use std::path::PathBuf;

    /// 在系统临时目录创建一个 `n` 条 streamline (每条 `l` 个点) 的测试归档.
    ///
    /// 点坐标为 `i * 100 + j * 3 + k`, 第 `i` 条的打分为 `i`.
    pub fn create_store(tag: &str, n: usize, l: usize) -> PathBuf {
        let path = std::env::temp_dir().join(format!("trk-berry-{tag}-{}.h5", std::process::id()));
        let file = hdf5::File::create(&path).unwrap();
        {
            let group = file.create_group("streamlines").unwrap();
            let points =
                Array3::from_shape_fn((n, l, 3), |(i, j, k)| (i * 100 + j * 3 + k) as f32);
            let scores = Array1::from_shape_fn(n, |i| i as f32);
            group
                .new_dataset_builder()
                .with_data(&points)
                .create("data")
                .unwrap();
            group
                .new_dataset_builder()
                .with_data(&scores)
                .create("scores")
                .unwrap();
        }
        drop(file);
        path
    }
}
