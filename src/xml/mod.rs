//! XML output utilities.

pub mod text;
pub mod writer;

pub use text::sanitize;
pub use writer::XmlElement;
