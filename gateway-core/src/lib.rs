pub mod cloud;
pub mod device_state;
pub mod error;
pub mod model;
pub mod storage;
