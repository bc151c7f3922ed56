#![allow(dead_code)]

pub mod fixtures;
pub mod gradecast_env;
