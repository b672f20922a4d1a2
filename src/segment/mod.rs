pub mod filenames;
pub(crate) mod format;
mod read;
mod write;

pub use filenames::{is_segment_filename, random_segment_filename};
pub use read::SegmentReader;
pub use write::{
    IpcSegmentBuilder, IpcSegmentWriter, SegmentFooterInfo, SegmentWriter, SegmentWriterBuilder,
};
