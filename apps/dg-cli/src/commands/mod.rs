pub mod audit;
pub mod decide;
pub mod resolve;
pub mod validate;
