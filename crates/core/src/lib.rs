//! Core business logic for Agora post attachments.
//!
//! This crate contains the attachment lifecycle with ZERO web or database dependencies.
//! Persistence and authorization are reached through traits implemented elsewhere.
//!
//! # Modules
//!
//! - `attachment` - Upload/delete lifecycle and the extension allow-list
//! - `permission` - Post edit authorization
//! - `storage` - Flat blob directory on the local filesystem

pub mod attachment;
pub mod permission;
pub mod storage;
