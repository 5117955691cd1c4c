pub mod assets;
pub mod storage;
