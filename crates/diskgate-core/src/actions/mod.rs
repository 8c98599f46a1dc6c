//! One module per gateway action

pub mod download;
pub(crate) mod list;
pub(crate) mod manage;
pub mod upload;
