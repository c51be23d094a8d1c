//! Primal-function extraction for reverse-mode automatic differentiation.
//!
//! Reverse-mode transcription produces an *interleaved* function: primal
//! and differential instructions side by side, tagged per instruction and
//! per block. This crate splits such a function into a primal-only
//! function that records the values the derivative needs into a
//! synthesized *intermediate context* struct, and rewrites the
//! interleaved function to read those values back instead of
//! recomputing them.
//!
//! This crate provides:
//!
//! - **Classification** ([`DiffClassifier`]): primal vs differential,
//!   from tags on instructions and their blocks.
//!
//! - **Storage policy** ([`StoragePolicy`]): which primal values must be
//!   persisted, and [`HoistedPrimalsInfo::from_policy`] to turn its
//!   answers into a store set.
//!
//! - **Context synthesis** ([`ContextBuilder`]): the context struct,
//!   including its generic envelope for generic functions.
//!
//! - **The pass** ([`DiffUnzipPass`]): the splitter itself.
//!
//! # Crate Dependencies
//!
//! `tangent_autodiff` depends only on `tangent_ir` for the instruction
//! graph. Differentiability of field types is answered through the
//! [`DifferentiableWitness`] seam so that callers can plug in their own
//! type rules.

use std::sync::Once;

mod classify;
mod config;
mod context;
mod hoist;
mod storage;
mod unzip;
mod witness;

pub use classify::DiffClassifier;
pub use config::UnzipConfig;
pub use context::{ContextBuilder, IntermediateContext};
pub use hoist::{HoistedPrimalsInfo, ParameterBlockTransposeInfo};
pub use storage::{is_deny_listed, is_view_like, StoragePolicy};
pub use unzip::{DiffUnzipPass, ExtractedPrimal};
pub use witness::{BuiltinWitness, DifferentiableWitness};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for debugging the pass.
///
/// Does nothing unless `RUST_LOG` is set, e.g.
/// `RUST_LOG=tangent_autodiff=debug`. Safe to call more than once.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        // Only initialize if RUST_LOG is set
        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}

#[cfg(test)]
mod test_helpers;
