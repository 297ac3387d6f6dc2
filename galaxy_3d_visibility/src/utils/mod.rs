mod pool;

pub use pool::{Pool, Poolable};
