// Device-type classification. Ordered by confidence: gateway flag, vendor/hostname keywords,
// hostname prefixes, OUI blocks, open-port signatures.

use crate::models::DeviceType;
use crate::probes::vendor::oui_prefix;

pub struct ClassifyInput<'a> {
    pub is_gateway: bool,
    pub vendor: Option<&'a str>,
    pub hostname: Option<&'a str>,
    pub mac: &'a str,
    pub open_ports: &'a [u16],
}

const KEYWORDS: &[(DeviceType, &[&str])] = &[
    (
        DeviceType::Router,
        &[
            "mikrotik", "routerboard", "router", "openwrt", "pfsense", "opnsense", "fritz",
            "draytek", "fortinet", "fortigate", "edgerouter",
        ],
    ),
    (DeviceType::Switch, &["switch", "procurve", "catalyst"]),
    (
        DeviceType::AccessPoint,
        &["ubiquiti", "unifi", "ruckus", "aruba", "meraki", "access point", "access-point"],
    ),
    (
        DeviceType::Server,
        &[
            "vmware", "hyper-v", "proxmox", "esxi", "super micro", "supermicro", "poweredge",
            "proliant", "virtualbox", "parallels", "server",
        ],
    ),
    (
        DeviceType::Nas,
        &["synology", "qnap", "diskstation", "drobo", "my cloud", "truenas", "freenas"],
    ),
    (
        DeviceType::Printer,
        &[
            "printer", "epson", "canon", "brother", "lexmark", "xerox", "kyocera", "ricoh",
            "laserjet", "officejet",
        ],
    ),
    (
        DeviceType::Camera,
        &["hikvision", "dahua", "axis communications", "reolink", "amcrest", "foscam", "camera", "ipcam"],
    ),
    (
        DeviceType::Phone,
        &[
            "phone", "pixel", "oneplus", "xiaomi", "huawei", "galaxy-s", "galaxy s", "grandstream",
            "polycom", "yealink",
        ],
    ),
    (DeviceType::Tablet, &["ipad", "tablet", "galaxy-tab", "galaxy tab", "kindle"]),
    (
        DeviceType::Laptop,
        &["laptop", "macbook", "thinkpad", "notebook", "latitude", "surface"],
    ),
    (
        DeviceType::Iot,
        &[
            "espressif", "raspberry", "philips lighting", "nest", "sonos", "amazon", "echo",
            "roku", "tuya", "shelly", "tasmota", "esp32", "esp8266", "chromecast",
        ],
    ),
    (
        DeviceType::Desktop,
        &[
            "intel", "realtek", "gigabyte", "asustek", "micro-star", "nvidia", "desktop", "imac",
            "optiplex",
        ],
    ),
];

/// Hostname prefixes; a prefix only counts when followed by a non-letter or the end of the name.
const HOSTNAME_PREFIXES: &[(DeviceType, &[&str])] = &[
    (DeviceType::Router, &["rtr", "gw", "fw"]),
    (DeviceType::Switch, &["sw"]),
    (DeviceType::AccessPoint, &["ap", "wap"]),
    (DeviceType::Server, &["srv", "server", "vm"]),
    (DeviceType::Nas, &["nas"]),
    (DeviceType::Printer, &["prn", "print"]),
    (DeviceType::Camera, &["cam", "ipcam", "nvr"]),
    (DeviceType::Phone, &["phone"]),
    (DeviceType::Laptop, &["nb"]),
    (DeviceType::Desktop, &["pc", "ws"]),
];

const OUI_TYPES: &[(&str, DeviceType)] = &[
    ("00:50:56", DeviceType::Server),
    ("00:0C:29", DeviceType::Server),
    ("00:05:69", DeviceType::Server),
    ("00:15:5D", DeviceType::Server),
    ("08:00:27", DeviceType::Server),
    ("00:25:90", DeviceType::Server),
    ("B8:27:EB", DeviceType::Iot),
    ("DC:A6:32", DeviceType::Iot),
    ("E4:5F:01", DeviceType::Iot),
    ("D8:3A:DD", DeviceType::Iot),
    ("24:0A:C4", DeviceType::Iot),
    ("30:AE:A4", DeviceType::Iot),
    ("A4:CF:12", DeviceType::Iot),
    ("00:17:88", DeviceType::Iot),
    ("18:B4:30", DeviceType::Iot),
    ("00:0E:58", DeviceType::Iot),
    ("5C:AA:FD", DeviceType::Iot),
    ("00:11:32", DeviceType::Nas),
    ("24:5E:BE", DeviceType::Nas),
    ("00:08:9B", DeviceType::Nas),
    ("CC:2D:E0", DeviceType::Router),
    ("4C:5E:0C", DeviceType::Router),
    ("6C:3B:6B", DeviceType::Router),
    ("E4:8D:8C", DeviceType::Router),
    ("28:57:BE", DeviceType::Camera),
    ("44:19:B6", DeviceType::Camera),
    ("3C:EF:8C", DeviceType::Camera),
    ("00:80:77", DeviceType::Printer),
    ("00:00:48", DeviceType::Printer),
    ("64:EB:8C", DeviceType::Printer),
    ("00:0B:82", DeviceType::Phone),
    ("00:04:F2", DeviceType::Phone),
    ("80:5E:C0", DeviceType::Phone),
];

/// (type, service ports, minimum matches). Checked in order.
const PORT_SIGNATURES: &[(DeviceType, &[u16], usize)] = &[
    (DeviceType::Printer, &[9100, 631, 515], 1),
    (DeviceType::Camera, &[554, 8554], 1),
    (DeviceType::Nas, &[5000, 5001], 2),
    (DeviceType::Server, &[22, 3306, 5432, 8080, 80, 443], 2),
    (DeviceType::Router, &[80, 443, 8080, 8443], 3),
    (DeviceType::Desktop, &[445, 139, 3389, 5900, 548], 2),
];

fn contains_any(text: &str, needles: &[&str]) -> bool {
    needles.iter().any(|n| text.contains(n))
}

fn by_keyword(text: &str) -> Option<DeviceType> {
    KEYWORDS
        .iter()
        .find(|(_, words)| contains_any(text, words))
        .map(|(t, _)| *t)
}

fn has_prefix_token(hostname: &str, prefix: &str) -> bool {
    hostname
        .strip_prefix(prefix)
        .is_some_and(|rest| rest.chars().next().is_none_or(|c| !c.is_ascii_alphabetic()))
}

fn by_hostname_prefix(hostname: &str) -> Option<DeviceType> {
    HOSTNAME_PREFIXES
        .iter()
        .find(|(_, prefixes)| prefixes.iter().any(|p| has_prefix_token(hostname, p)))
        .map(|(t, _)| *t)
}

fn by_oui(mac: &str) -> Option<DeviceType> {
    let prefix = oui_prefix(mac)?;
    OUI_TYPES
        .iter()
        .find(|(p, _)| *p == prefix)
        .map(|(_, t)| *t)
}

fn by_ports(open_ports: &[u16]) -> Option<DeviceType> {
    PORT_SIGNATURES
        .iter()
        .find(|(_, ports, min)| ports.iter().filter(|p| open_ports.contains(p)).count() >= *min)
        .map(|(t, _, _)| *t)
}

/// First match wins; `Unknown` when nothing matches.
pub fn classify(input: &ClassifyInput<'_>) -> DeviceType {
    if input.is_gateway {
        return DeviceType::Router;
    }
    let hostname = input.hostname.map(str::to_ascii_lowercase);
    let text = format!(
        "{} {}",
        input.vendor.unwrap_or_default().to_ascii_lowercase(),
        hostname.as_deref().unwrap_or_default()
    );
    by_keyword(&text)
        .or_else(|| hostname.as_deref().and_then(by_hostname_prefix))
        .or_else(|| by_oui(input.mac))
        .or_else(|| by_ports(input.open_ports))
        .unwrap_or(DeviceType::Unknown)
}
