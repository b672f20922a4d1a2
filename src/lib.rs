//! Segment rotation and write finalization for lake tablets.
//!
//! A [`TabletWriter`](writer::TabletWriter) turns a stream of Arrow record
//! batches into size-bounded, immutable segment files under one tablet and
//! reports the files it produced so the caller can publish a new
//! [`TabletMetadata`](tablet::TabletMetadata) version.

pub mod conf;
pub mod core;
pub mod fs;
pub mod segment;
pub mod tablet;
pub mod writer;

#[cfg(any(test, feature = "testutil"))]
pub mod testutil;
