// Device registry model

use super::text_enum;
use serde::{Deserialize, Serialize};

text_enum! {
    /// Device classification.
    DeviceType {
        Router => "router",
        Switch => "switch",
        AccessPoint => "access-point",
        Server => "server",
        Desktop => "desktop",
        Laptop => "laptop",
        Printer => "printer",
        Phone => "phone",
        Tablet => "tablet",
        Iot => "iot",
        Camera => "camera",
        Nas => "nas",
        Unknown => "unknown",
    }
}

text_enum! {
    DeviceStatus {
        Online => "online",
        Offline => "offline",
        Degraded => "degraded",
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Device {
    pub id: String,
    pub ip_address: String,
    /// Lowercase, colon separated, two hex digits per octet. Unique.
    pub mac_address: String,
    pub hostname: Option<String>,
    pub custom_name: Option<String>,
    pub vendor: Option<String>,
    pub device_type: DeviceType,
    pub status: DeviceStatus,
    pub is_gateway: bool,
    pub is_monitored: bool,
    pub first_seen: i64,
    pub last_seen: i64,
    pub latency_ms: Option<f64>,
    pub packet_loss: Option<f64>,
    #[serde(default)]
    pub open_ports: Vec<u16>,
    pub notes: Option<String>,
}

impl Device {
    /// Fresh online, monitored, unclassified device seen at `now`.
    pub fn new(ip_address: impl Into<String>, mac_address: impl Into<String>, now: i64) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            ip_address: ip_address.into(),
            mac_address: mac_address.into(),
            hostname: None,
            custom_name: None,
            vendor: None,
            device_type: DeviceType::Unknown,
            status: DeviceStatus::Online,
            is_gateway: false,
            is_monitored: true,
            first_seen: now,
            last_seen: now,
            latency_ms: None,
            packet_loss: None,
            open_ports: Vec::new(),
            notes: None,
        }
    }

    /// Custom name, then hostname, then IP.
    pub fn display_name(&self) -> &str {
        self.custom_name
            .as_deref()
            .or(self.hostname.as_deref())
            .unwrap_or(&self.ip_address)
    }
}
