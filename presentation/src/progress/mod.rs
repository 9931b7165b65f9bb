//! Progress and live output during a chat turn

pub mod reporter;
