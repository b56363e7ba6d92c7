//! Types shared between the writeup client crates.
//!
//! Nothing here performs I/O: it defines the JSON bodies exchanged with the generation service
//! and the placeholder token grammar embedded in prompts.

pub mod data_url;
pub mod placeholder;
pub mod wire;

pub use placeholder::AttachmentKind;
pub use placeholder::PlaceholderMap;
pub use placeholder::PlaceholderToken;
