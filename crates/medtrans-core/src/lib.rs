//! # medtrans Core
//!
//! 医疗转运规则引擎的核心模块，提供基础数据结构、错误定义和边界解析工具。

pub mod error;
pub mod models;
pub mod utils;

pub use error::{Result, RulesError};
pub use models::*;
