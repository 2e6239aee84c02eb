#![allow(clippy::missing_errors_doc)]
#![allow(clippy::must_use_candidate)]

pub mod cli;
pub mod logging;
