pub mod hidden;
pub mod morse;
pub mod playback;

pub use playback::Transmission;
