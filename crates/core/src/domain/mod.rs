pub mod deal;
pub mod hunt;
