pub mod cipher;
pub mod dealer;
pub mod engine;
pub mod error;
pub mod secret_space;
