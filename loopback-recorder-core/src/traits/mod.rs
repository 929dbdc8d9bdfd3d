pub mod delegate;
pub mod frame_source;
pub mod sink;
