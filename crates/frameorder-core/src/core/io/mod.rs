//! Reading frame order runs from disk.

pub mod run_file;
