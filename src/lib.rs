//! Materializes build-specific `.config` files from a base file plus a named
//! XDT overlay, mirroring the source tree into a target tree.

pub mod app;
