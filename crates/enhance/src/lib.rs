//! Enhancement engines for the stillframe pipeline.
//!
//! Provides the REST client for the remote image-generation service, the
//! [`Enhancer`](stillframe_core::adapter::Enhancer) implementation built
//! on top of it, and the offline local upscaler.

pub mod api;
pub mod local;
pub mod remote;
