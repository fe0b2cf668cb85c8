//! CLI command implementations

pub(crate) mod apply;
pub(crate) mod check;
pub(crate) mod common;
pub(crate) mod init;
pub(crate) mod new;
pub(crate) mod resolve;
pub(crate) mod rollback;
pub(crate) mod status;
pub(crate) mod validate;
