// SPDX-License-Identifier: MIT
// Inline completion engine.
//
// The pipeline for one editor callback runs context extraction, a debounced
// and cancel-aware coordinator, a single HTTP round-trip to the completion
// service, and a deterministic sanitizer that turns free-form model output
// into an insertable code fragment. `provider::CompletionProvider` is the
// entry point; everything else is a leaf it composes.

pub mod cache;
pub mod classify;
pub mod client;
pub mod context;
pub mod coordinator;
pub mod model;
pub mod provider;
pub mod sanitize;
