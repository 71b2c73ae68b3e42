pub mod fill;
pub mod shapes;
