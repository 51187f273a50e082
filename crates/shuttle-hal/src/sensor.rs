//! [`ProximitySensor`] – box-shaped detector around the shuttle.

use shuttle_types::{DetectedEntity, SensorSettings, ShuttleError};

/// A proximity sensor reporting the entities inside its detection box.
pub trait ProximitySensor: Send + Sync {
    fn id(&self) -> &str;

    fn is_enabled(&self) -> bool;

    /// Apply detection filters and box extents.
    fn configure(&mut self, settings: &SensorSettings) -> Result<(), ShuttleError>;

    /// Entities currently inside the detection box.
    fn detected_entities(&self) -> Vec<DetectedEntity>;
}
