//! # medtrans
//!
//! 医疗转运与患者监护临床规则引擎的汇总入口，重新导出各子模块。

pub use medtrans_admin;
pub use medtrans_core;
pub use medtrans_rules;

pub use medtrans_core::{Result, RulesError};
pub use medtrans_rules::RuleEngine;
