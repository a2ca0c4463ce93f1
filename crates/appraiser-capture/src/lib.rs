//! Photo capture workflow
//!
//! [`PhotoCaptureSession`] drives one appraiser through taking and saving collateral
//! photos. Device capabilities sit behind [`LocationProvider`], [`ImageSource`] and
//! [`PermissionGate`] so the same session runs against real hardware, recorded files or
//! test doubles.

pub mod camera;
pub mod location;
pub mod permissions;
pub mod session;

pub use camera::{CapturedImage, FileImageSource, ImageSource};
pub use location::{
    FixedLocationProvider, LocationProvider, LocationSampler, ReplayLocationProvider,
};
pub use permissions::{PermissionGate, StaticPermissions};
pub use session::{
    CaptureDevices, PhotoCaptureSession, SaveReport, SessionContext, SessionState,
};
