//! Parallel processing strategies

use rayon::prelude::*;
use tracing::warn;

/// Processing mode for algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessingMode {
    /// Single-threaded processing
    Sequential,
    /// Parallel processing using all available cores
    #[default]
    Parallel,
    /// Parallel with specified number of threads
    ParallelWith(usize),
}

impl ProcessingMode {
    /// Mode for an optional thread count (`None` = all cores, `Some(1)` = sequential).
    pub fn from_threads(threads: Option<usize>) -> Self {
        match threads {
            None => ProcessingMode::Parallel,
            Some(0) | Some(1) => ProcessingMode::Sequential,
            Some(n) => ProcessingMode::ParallelWith(n),
        }
    }

    /// Runs `op` inside a dedicated pool for `ParallelWith`, else on the
    /// global pool. Falls back to the global pool when the dedicated pool
    /// cannot be created.
    fn install<R, OP>(&self, op: OP) -> R
    where
        R: Send,
        OP: FnOnce() -> R + Send,
    {
        match self {
            ProcessingMode::ParallelWith(threads) => {
                match rayon::ThreadPoolBuilder::new().num_threads(*threads).build() {
                    Ok(pool) => pool.install(op),
                    Err(e) => {
                        warn!("Cannot build {}-thread pool ({}), using global pool", threads, e);
                        op()
                    }
                }
            }
            _ => op(),
        }
    }
}

/// Strategy for parallel execution
pub trait ParallelStrategy {
    /// Map a function over indices and collect results in index order
    fn par_map<T, F>(&self, range: std::ops::Range<usize>, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send;

    /// Map a function over slice items and collect results in slice order
    fn par_map_slice<S, T, F>(&self, items: &[S], f: F) -> Vec<T>
    where
        S: Sync,
        T: Send,
        F: Fn(&S) -> T + Sync + Send,
    {
        self.par_map(0..items.len(), |i| f(&items[i]))
    }
}

impl ParallelStrategy for ProcessingMode {
    fn par_map<T, F>(&self, range: std::ops::Range<usize>, f: F) -> Vec<T>
    where
        T: Send,
        F: Fn(usize) -> T + Sync + Send,
    {
        match self {
            ProcessingMode::Sequential => range.map(f).collect(),
            _ => self.install(|| range.into_par_iter().map(f).collect()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_par_map_preserves_order() {
        for mode in [
            ProcessingMode::Sequential,
            ProcessingMode::Parallel,
            ProcessingMode::ParallelWith(2),
        ] {
            let out = mode.par_map(0..100, |i| i * 2);
            assert_eq!(out, (0..100).map(|i| i * 2).collect::<Vec<_>>(), "mode {:?}", mode);
        }
    }

    #[test]
    fn test_from_threads() {
        assert_eq!(ProcessingMode::from_threads(None), ProcessingMode::Parallel);
        assert_eq!(ProcessingMode::from_threads(Some(1)), ProcessingMode::Sequential);
        assert_eq!(ProcessingMode::from_threads(Some(8)), ProcessingMode::ParallelWith(8));
    }

    #[test]
    fn test_par_map_slice() {
        let words = ["a", "bb", "ccc"];
        let lens = ProcessingMode::Parallel.par_map_slice(&words, |w| w.len());
        assert_eq!(lens, vec![1, 2, 3]);
    }
}
