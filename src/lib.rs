pub mod archive;
pub mod cleanup;
pub mod commands;
pub mod config;
pub mod descriptor;
pub mod http;
pub mod interpreter;
pub mod module;
pub mod runtime;
pub mod scripts;
pub mod task;
pub mod version;
