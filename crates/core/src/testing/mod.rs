//! Testing utilities and mock implementations for E2E tests.
//!
//! This module provides mock implementations of the external collaborator
//! traits, allowing the full publish pipeline to run without a build tool,
//! an artifact host or a content store.
//!
//! # Example
//!
//! ```rust,ignore
//! use pressroom_core::testing::{MockSiteBuilder, MockUploader};
//!
//! let builder = MockSiteBuilder::new(tmp.path().join("build"));
//! let uploader = MockUploader::new();
//!
//! // Make one content ref fail to produce output
//! builder.fail_for("broken").await;
//!
//! let worker = Worker::new(store, Arc::new(builder), Arc::new(uploader), &config);
//! ```

mod mock_builder;
mod mock_content_store;
mod mock_trigger;
mod mock_uploader;

pub use mock_builder::MockSiteBuilder;
pub use mock_content_store::MockContentStore;
pub use mock_trigger::{MockSiteHooks, MockTrigger};
pub use mock_uploader::MockUploader;
