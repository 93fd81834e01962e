//! Device types and the per-device lookup table
//!
//! Every record names the device family that reported it. Each family is owned
//! by exactly one cache endpoint, so the set is closed and fan-out structures
//! are keyed by [`DeviceType`] rather than by free-form strings.

use serde::{Deserialize, Serialize};

use crate::error::MemcError;

/// Device family that owns a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    /// Apple advertising identifier
    Idfa,
    /// Google advertising identifier
    Gaid,
    /// Android device identifier
    Adid,
    /// Generic device identifier
    Dvid,
}

impl DeviceType {
    /// All device types, in the order used for fan-out and reporting
    pub const ALL: [DeviceType; 4] = [
        DeviceType::Idfa,
        DeviceType::Gaid,
        DeviceType::Adid,
        DeviceType::Dvid,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            DeviceType::Idfa => "idfa",
            DeviceType::Gaid => "gaid",
            DeviceType::Adid => "adid",
            DeviceType::Dvid => "dvid",
        }
    }
}

impl std::str::FromStr for DeviceType {
    type Err = MemcError;

    /// Matching is exact: the loader never normalizes the case of input data.
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "idfa" => Ok(DeviceType::Idfa),
            "gaid" => Ok(DeviceType::Gaid),
            "adid" => Ok(DeviceType::Adid),
            "dvid" => Ok(DeviceType::Dvid),
            _ => Err(MemcError::UnknownDeviceType(s.to_string())),
        }
    }
}

impl std::fmt::Display for DeviceType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Exactly one value per [`DeviceType`]
///
/// Used for endpoint addresses, per-device writer queues and per-device
/// outcomes. Lookups can never miss, so "not configured" has to be expressed
/// in `T` itself (for example `Option<String>`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceMap<T> {
    pub idfa: T,
    pub gaid: T,
    pub adid: T,
    pub dvid: T,
}

impl<T> DeviceMap<T> {
    /// Build a map by calling `f` once per device type
    pub fn from_fn(mut f: impl FnMut(DeviceType) -> T) -> Self {
        Self {
            idfa: f(DeviceType::Idfa),
            gaid: f(DeviceType::Gaid),
            adid: f(DeviceType::Adid),
            dvid: f(DeviceType::Dvid),
        }
    }

    pub fn get(&self, device: DeviceType) -> &T {
        match device {
            DeviceType::Idfa => &self.idfa,
            DeviceType::Gaid => &self.gaid,
            DeviceType::Adid => &self.adid,
            DeviceType::Dvid => &self.dvid,
        }
    }

    pub fn get_mut(&mut self, device: DeviceType) -> &mut T {
        match device {
            DeviceType::Idfa => &mut self.idfa,
            DeviceType::Gaid => &mut self.gaid,
            DeviceType::Adid => &mut self.adid,
            DeviceType::Dvid => &mut self.dvid,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (DeviceType, &T)> + '_ {
        DeviceType::ALL.into_iter().map(move |device| (device, self.get(device)))
    }

    /// Transform every value, keeping the device association
    pub fn map<U>(self, mut f: impl FnMut(DeviceType, T) -> U) -> DeviceMap<U> {
        DeviceMap {
            idfa: f(DeviceType::Idfa, self.idfa),
            gaid: f(DeviceType::Gaid, self.gaid),
            adid: f(DeviceType::Adid, self.adid),
            dvid: f(DeviceType::Dvid, self.dvid),
        }
    }
}

impl<T> IntoIterator for DeviceMap<T> {
    type Item = (DeviceType, T);
    type IntoIter = std::array::IntoIter<(DeviceType, T), 4>;

    fn into_iter(self) -> Self::IntoIter {
        [
            (DeviceType::Idfa, self.idfa),
            (DeviceType::Gaid, self.gaid),
            (DeviceType::Adid, self.adid),
            (DeviceType::Dvid, self.dvid),
        ]
        .into_iter()
    }
}
