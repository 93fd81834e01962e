//! Cache value wire format
//!
//! The value stored under each key is a protobuf `UserApps` message:
//!
//! ```text
//! message UserApps {
//!     repeated uint32 apps = 1;
//!     optional double lat = 2;
//!     optional double lon = 3;
//! }
//! ```
//!
//! The message is declared with the prost derive so no build script or
//! `protoc` install is needed. `apps` keeps the proto2 unpacked layout that
//! existing readers of the cache expect.

use std::fmt::Write as _;

use prost::Message;

use crate::error::Result;

#[derive(Clone, PartialEq, Message)]
pub struct UserApps {
    #[prost(uint32, repeated, packed = "false", tag = "1")]
    pub apps: Vec<u32>,
    #[prost(double, optional, tag = "2")]
    pub lat: Option<f64>,
    #[prost(double, optional, tag = "3")]
    pub lon: Option<f64>,
}

impl UserApps {
    pub fn decode_value(bytes: &[u8]) -> Result<Self> {
        Ok(Self::decode(bytes)?)
    }

    /// Single-line text rendering used when logging dry-run writes
    pub fn describe(&self) -> String {
        let mut out = String::new();
        for app in &self.apps {
            let _ = write!(out, "apps: {app} ");
        }
        if let Some(lat) = self.lat {
            let _ = write!(out, "lat: {lat} ");
        }
        if let Some(lon) = self.lon {
            let _ = write!(out, "lon: {lon} ");
        }
        out.truncate(out.trim_end().len());
        out
    }
}
