pub mod dataset;
pub mod motion;
