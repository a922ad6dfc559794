//! Core library for rendering event-stream recordings into videos, sound
//! tracks, and still images by orchestrating external tools.
//!
//! The pipeline chains a frame generator (`es_to_frames`) into an encoder
//! (`ffmpeg`) over a raw-frame pipe, optionally runs a synthesizer (`synth`)
//! for sonification, and finalizes every artifact atomically: temporaries
//! live next to the final path and are renamed into place only once
//! complete.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use esrender_core::{render_file, RenderParameters};
//!
//! let mut params = RenderParameters::new("recording.es");
//! params.sonify = true;
//! let outcome = render_file(&params).unwrap();
//! println!("{}", outcome.plan.primary().display());
//! ```

pub mod batch;
pub mod config;
pub mod error;
pub mod external;
pub mod finalize;
pub mod outputs;
pub mod pipeline;
pub mod temp_files;
pub mod timecode;

// Re-exports for the public API
pub use batch::{render_tree, BatchReport};
pub use config::{Codec, DecayStyle, RenderParameters, SoundParams, Tools};
pub use error::{CoreError, CoreResult};
pub use external::ensure_available;
pub use outputs::{plan_outputs, OutputPlan};
pub use pipeline::{render_file, request_interrupt, RenderOutcome};
pub use timecode::Micros;
