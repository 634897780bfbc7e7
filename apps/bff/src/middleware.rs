//! # ミドルウェア
//!
//! BFF 用のミドルウェアを提供する。

mod cache_control;
pub mod request_id;

pub use cache_control::no_cache;
