pub mod account;
pub mod catalog;
pub mod common;
pub mod promotion;
pub mod record;
