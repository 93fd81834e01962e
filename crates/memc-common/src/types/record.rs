//! Parsed installation record

use serde::Serialize;

use super::device::DeviceType;
use super::proto::UserApps;
use crate::error::{MemcError, Result};

/// One device's installed-apps report
///
/// Fields are private: a `Record` can only be obtained through [`Record::new`],
/// which guarantees a non-empty device id, so every record in the pipeline is
/// routable and keyable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    device_type: DeviceType,
    device_id: String,
    lat: f64,
    lon: f64,
    apps: Vec<u32>,
}

impl Record {
    pub fn new(
        device_type: DeviceType,
        device_id: impl Into<String>,
        lat: f64,
        lon: f64,
        apps: Vec<u32>,
    ) -> Result<Self> {
        let device_id = device_id.into();
        if device_id.is_empty() {
            return Err(MemcError::InvalidRecord("device id is empty".to_string()));
        }

        Ok(Self {
            device_type,
            device_id,
            lat,
            lon,
            apps,
        })
    }

    pub fn device_type(&self) -> DeviceType {
        self.device_type
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }

    pub fn apps(&self) -> &[u32] {
        &self.apps
    }

    /// Cache key: `{device_type}:{device_id}`
    pub fn key(&self) -> String {
        format!("{}:{}", self.device_type, self.device_id)
    }

    pub fn to_user_apps(&self) -> UserApps {
        UserApps {
            apps: self.apps.clone(),
            lat: Some(self.lat),
            lon: Some(self.lon),
        }
    }

    /// Serialized cache value
    pub fn encode_value(&self) -> Vec<u8> {
        prost::Message::encode_to_vec(&self.to_user_apps())
    }
}
