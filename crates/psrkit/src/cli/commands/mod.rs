pub mod downsample;
pub mod logspace;
pub mod need_rerun;
pub mod observatory;
pub mod rise_set;
pub mod write_if_changed;
