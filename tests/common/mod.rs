#![allow(dead_code, unused_imports)]
//! 公共测试模块聚合
//!
//! - fixtures: 来源/存储/源存储的快速构造
//! - resolver: 可控的假 DNS 解析器
//! - test_env: 日志初始化

pub mod fixtures;
pub mod resolver;
pub mod test_env;
