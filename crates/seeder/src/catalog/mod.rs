pub mod apply;
pub mod models;
pub mod validator;
