//! stow-s3: aws-sdk-s3 backend for stow
//!
//! Implements the [`stow_core::ObjectStore`] trait on top of the AWS SDK. It
//! works with AWS S3 and S3-compatible services via a custom endpoint and
//! path-style addressing.

mod client;
mod error;

pub use client::S3Backend;
