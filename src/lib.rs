pub mod api;
pub mod ar_detector;
pub mod core;

pub use api::{SessionHandle, VideoSession};
pub use ar_detector::{ArDetector, DetectionResult};
pub use crate::core::settings::{Settings, DEFAULT_SETTINGS};

pub fn init_logging() {
    #[cfg(target_os = "android")]
    {
        android_logger::init_once(
            android_logger::Config::default()
                .with_max_level(log::LevelFilter::Debug)
                .with_tag("autoar_lib"),
        );
    }

    #[cfg(not(target_os = "android"))]
    {
        // desktop hosts install their own `log` backend
    }
}
