mod rotation;
mod tablet_writer;

pub use tablet_writer::{TabletWriter, WriterOutput};
