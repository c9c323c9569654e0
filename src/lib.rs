#![forbid(unsafe_code)]

pub mod chapter;
pub mod cli;
pub mod config;
pub mod cookies;
pub mod error;
pub mod extract;
pub mod formats;
pub mod groups;
pub mod logging;
pub mod login;
pub mod pattern;
pub mod remote;
pub mod scan;
pub mod similarity;
pub mod store;
pub mod template;
pub mod upload;
