pub mod aggregate;
pub mod auth;
pub mod cache;
pub mod detail;
pub mod dispatch;
pub mod error;
pub mod sensor;
pub mod transform;

pub use aggregate::{DeviceAggregator, DevicePage, DeviceQuery};
pub use auth::{AuthToken, TokenService};
pub use detail::DeviceResolver;
pub use dispatch::CommandDispatcher;
pub use error::ServiceError;
pub use sensor::{SensorData, SensorReader};
pub use transform::ResponseMode;
