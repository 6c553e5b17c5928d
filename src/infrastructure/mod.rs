pub mod cloud;
pub mod storage;
