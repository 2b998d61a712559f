//! Network interface enumeration and selection

use pcap::Device;
use sniffer_core::{EnumerationError, Error, Result};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Pseudo-device that captures on every interface at once (Linux)
pub const ANY_DEVICE: &str = "any";

/// A capturable network interface
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkDevice {
    /// Interface name as understood by the capture library (e.g. "eth0")
    pub name: String,
    /// Human-readable description, empty when the OS provides none
    pub description: String,
    /// Whether at least one address is assigned
    pub has_address: bool,
}

impl From<Device> for NetworkDevice {
    fn from(device: Device) -> Self {
        NetworkDevice {
            has_address: !device.addresses.is_empty(),
            description: device.desc.unwrap_or_default(),
            name: device.name,
        }
    }
}

impl fmt::Display for NetworkDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let description = if self.description.is_empty() {
            "No description available"
        } else {
            &self.description
        };
        write!(f, "{} ({})", self.name, description)?;
        if self.has_address {
            write!(f, " [has address]")?;
        }
        Ok(())
    }
}

/// List every interface the capture library can open
///
/// The order is the library's and is only meaningful within one call.
pub fn list_devices() -> std::result::Result<Vec<NetworkDevice>, EnumerationError> {
    let devices = Device::list().map_err(|e| EnumerationError(e.to_string()))?;
    debug!("Found {} capture devices", devices.len());
    Ok(devices.into_iter().map(NetworkDevice::from).collect())
}

/// Find a device by name
pub fn get_device(name: &str) -> Result<NetworkDevice> {
    list_devices()?
        .into_iter()
        .find(|device| device.name == name)
        .ok_or_else(|| Error::InterfaceNotFound(name.to_string()))
}

/// How a user picked the device to capture on
///
/// Indices follow the listing shown to the user: `0` is the `any`
/// pseudo-device and `1..=n` are the enumerated devices in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceSelector {
    Any,
    Index(usize),
    Name(String),
}

impl DeviceSelector {
    /// Turn the selection into a device name
    pub fn resolve(&self, devices: &[NetworkDevice]) -> Result<String> {
        match self {
            DeviceSelector::Any | DeviceSelector::Index(0) => Ok(ANY_DEVICE.to_string()),
            DeviceSelector::Index(index) => devices
                .get(index - 1)
                .map(|device| device.name.clone())
                .ok_or_else(|| {
                    Error::InterfaceNotFound(format!(
                        "#{} (only {} devices available)",
                        index,
                        devices.len()
                    ))
                }),
            // Names are passed through so devices missing from the listing
            // still get a diagnostic from the capture library itself
            DeviceSelector::Name(name) => Ok(name.clone()),
        }
    }
}

impl FromStr for DeviceSelector {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.is_empty() {
            return Err(Error::InterfaceNotFound(String::new()));
        }
        if s.eq_ignore_ascii_case(ANY_DEVICE) {
            return Ok(DeviceSelector::Any);
        }
        match s.parse::<usize>() {
            Ok(index) => Ok(DeviceSelector::Index(index)),
            Err(_) => Ok(DeviceSelector::Name(s.to_string())),
        }
    }
}

impl fmt::Display for DeviceSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceSelector::Any => f.write_str(ANY_DEVICE),
            DeviceSelector::Index(index) => write!(f, "#{}", index),
            DeviceSelector::Name(name) => f.write_str(name),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn devices() -> Vec<NetworkDevice> {
        vec![
            NetworkDevice {
                name: "eth0".to_string(),
                description: String::new(),
                has_address: true,
            },
            NetworkDevice {
                name: "wlan0".to_string(),
                description: "Wireless".to_string(),
                has_address: false,
            },
        ]
    }

    #[test]
    fn test_list_devices() {
        // Enumeration may need privileges or a working libpcap
        match list_devices() {
            Ok(devices) => {
                for device in devices {
                    assert!(!device.name.is_empty());
                }
            }
            Err(e) => println!("Could not list devices: {}", e),
        }
    }

    #[test]
    fn test_get_nonexistent_device() {
        match get_device("nonexistent_interface_xyz") {
            Err(Error::InterfaceNotFound(name)) => assert_eq!(name, "nonexistent_interface_xyz"),
            Err(e) => println!("Could not list devices: {}", e),
            Ok(_) => panic!("Expected InterfaceNotFound error"),
        }
    }

    #[test]
    fn test_selector_parse() {
        assert_eq!("any".parse::<DeviceSelector>().unwrap(), DeviceSelector::Any);
        assert_eq!("ANY".parse::<DeviceSelector>().unwrap(), DeviceSelector::Any);
        assert_eq!("2".parse::<DeviceSelector>().unwrap(), DeviceSelector::Index(2));
        assert_eq!(
            "eth0".parse::<DeviceSelector>().unwrap(),
            DeviceSelector::Name("eth0".to_string())
        );
        assert!("  ".parse::<DeviceSelector>().is_err());
    }

    #[test]
    fn test_selector_resolve() {
        let devices = devices();
        assert_eq!(DeviceSelector::Any.resolve(&devices).unwrap(), "any");
        assert_eq!(DeviceSelector::Index(0).resolve(&devices).unwrap(), "any");
        assert_eq!(DeviceSelector::Index(1).resolve(&devices).unwrap(), "eth0");
        assert_eq!(DeviceSelector::Index(2).resolve(&devices).unwrap(), "wlan0");
        assert!(matches!(
            DeviceSelector::Index(3).resolve(&devices),
            Err(Error::InterfaceNotFound(_))
        ));
        assert_eq!(
            DeviceSelector::Name("lo".to_string()).resolve(&[]).unwrap(),
            "lo"
        );
    }

    #[test]
    fn test_device_display() {
        let devices = devices();
        assert_eq!(
            devices[0].to_string(),
            "eth0 (No description available) [has address]"
        );
        assert_eq!(devices[1].to_string(), "wlan0 (Wireless)");
    }
}
