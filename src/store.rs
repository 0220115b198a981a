pub mod gateway;
pub mod mock;
pub mod models;
pub mod postgres;
