//! Provider clients

pub mod lookup;
pub mod translator;
