pub mod geometry;
pub mod tensor;
