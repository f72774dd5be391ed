pub mod route;
pub mod serve;
pub mod sign;
