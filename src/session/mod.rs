//! Generation sessions: request, stream consumption, phase tracking

pub mod controller;
pub mod error;
pub mod http_provider;
pub mod model;
pub mod phase;
pub mod provider;

pub use controller::{
    CompletedGeneration, ControllerOptions, GenerationController, SessionDelta, SessionOutcome,
};
pub use error::GenerationError;
pub use http_provider::HttpGenerationProvider;
pub use model::{ChatTurn, GenerationRequest, GenerationSession, SessionStatus, WireFile};
pub use phase::{GenerationPhase, Phase};
pub use provider::{ByteStream, FallbackPayload, GenerationProvider, GenerationResponse};
