//! Common types used across MemcLoad

mod device;
mod proto;
mod record;

pub use device::{DeviceMap, DeviceType};
pub use proto::UserApps;
pub use record::Record;
