//! Conversion between wire format types and internal types

pub mod openai;
