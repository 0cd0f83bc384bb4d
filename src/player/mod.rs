//! Playback core: format resolution, backend selection, the session state
//! machine and the transport/input surfaces that drive it.

pub mod backend;
pub mod error;
pub mod input;
pub mod media;
pub mod resolver;
pub mod session;
pub mod state;
pub mod transport;
pub mod types;

#[cfg(test)]
mod testing;

pub use backend::{BackendKind, DashConfig, EngineFactory, HlsConfig};
pub use error::{BackendError, ErrorClass, PlayError, ResolveError};
pub use input::{InputAction, InputMapper, PlayerKey};
pub use media::{CanPlay, EventSink, ListenerId, MediaElement, MediaEvent, MediaEventKind};
pub use resolver::{FormatResolver, XtreamOrigin};
pub use session::{SessionConfig, SessionController, SessionState, SurfaceRequest};
pub use state::{format_time, PlaybackUiState, StatusKind, StatusLine, PLAYBACK_RATES};
pub use transport::TransportCommand;
pub use types::{CandidateSource, ContainerFormat, QualityLevel, QualitySelection};
