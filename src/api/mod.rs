//! Vendor wire formats. Each provider hard-codes its own JSON shape; nothing
//! here is shared between vendors.

pub mod gemini;
pub mod openai;
pub mod replicate;
