//! Core of a userspace filesystem exposing a two-level 8.3 namespace over a
//! fixed-size block image, mounted through [`fuser`].
//!
//! The modules below implement the layered design: [`device`] and
//! [`bitmap`] manage the raw block image; [`layout`] defines the byte-exact
//! on-disk records; [`root_table`] and [`dir_table`] read and write those
//! records; [`chain`] walks a file's linked data blocks; [`path`] parses
//! incoming paths; [`filesystem`] composes all of the above into the
//! path-oriented operations a mounted filesystem needs; and
//! [`fuse_adapter`] wires that core into `fuser::Filesystem`.

pub mod bitmap;
pub mod chain;
pub mod device;
pub mod dir_table;
pub mod error;
pub mod filesystem;
pub mod fuse_adapter;
pub mod layout;
pub mod param;
pub mod path;
pub mod root_table;
