// MAC vendor lookup: the IEEE OUI database, with a built-in table for when it cannot load.

use super::VendorLookup;
use mac_oui::Oui;
use std::sync::OnceLock;

static OUI_DB: OnceLock<Option<Oui>> = OnceLock::new();

fn oui_db() -> Option<&'static Oui> {
    OUI_DB
        .get_or_init(|| match Oui::default() {
            Ok(db) => Some(db),
            Err(e) => {
                tracing::warn!(error = ?e, "OUI database unavailable, using built-in vendor table");
                None
            }
        })
        .as_ref()
}

pub const RANDOMIZED_VENDOR: &str = "Private (randomized MAC)";

/// Uppercase `AA:BB:CC` prefix -> manufacturer. Fallback only.
const KNOWN_VENDORS: &[(&str, &str)] = &[
    ("00:50:56", "VMware"),
    ("00:0C:29", "VMware"),
    ("00:05:69", "VMware"),
    ("00:15:5D", "Microsoft Hyper-V"),
    ("08:00:27", "Oracle VirtualBox"),
    ("00:1C:42", "Parallels"),
    ("B8:27:EB", "Raspberry Pi Foundation"),
    ("DC:A6:32", "Raspberry Pi Trading"),
    ("E4:5F:01", "Raspberry Pi Trading"),
    ("D8:3A:DD", "Raspberry Pi Trading"),
    ("00:11:32", "Synology"),
    ("24:5E:BE", "QNAP Systems"),
    ("00:08:9B", "QNAP Systems"),
    ("B4:FB:E4", "Ubiquiti"),
    ("24:A4:3C", "Ubiquiti"),
    ("78:8A:20", "Ubiquiti"),
    ("FC:EC:DA", "Ubiquiti"),
    ("80:2A:A8", "Ubiquiti"),
    ("04:18:D6", "Ubiquiti"),
    ("CC:2D:E0", "Routerboard (MikroTik)"),
    ("4C:5E:0C", "Routerboard (MikroTik)"),
    ("6C:3B:6B", "Routerboard (MikroTik)"),
    ("E4:8D:8C", "Routerboard (MikroTik)"),
    ("00:18:0A", "Cisco Meraki"),
    ("00:1B:54", "Cisco Systems"),
    ("00:40:96", "Cisco Systems"),
    ("00:09:0F", "Fortinet"),
    ("00:1D:AA", "DrayTek"),
    ("50:C7:BF", "TP-Link"),
    ("98:DA:C4", "TP-Link"),
    ("B0:4E:26", "TP-Link"),
    ("00:14:6C", "Netgear"),
    ("A0:40:A0", "Netgear"),
    ("1C:7E:E5", "D-Link"),
    ("00:1B:21", "Intel Corporate"),
    ("3C:97:0E", "Intel Corporate"),
    ("8C:8D:28", "Intel Corporate"),
    ("00:E0:4C", "Realtek Semiconductor"),
    ("1C:1B:0D", "Gigabyte Technology"),
    ("00:1F:C6", "ASUSTek Computer"),
    ("04:D4:C4", "ASUSTek Computer"),
    ("00:25:90", "Super Micro Computer"),
    ("00:04:4B", "NVIDIA"),
    ("00:1C:B3", "Apple"),
    ("00:1B:63", "Apple"),
    ("3C:07:54", "Apple"),
    ("F0:18:98", "Apple"),
    ("AC:BC:32", "Apple"),
    ("00:12:FB", "Samsung Electronics"),
    ("5C:0A:5B", "Samsung Electronics"),
    ("3C:D9:2B", "Hewlett Packard"),
    ("00:1F:29", "Hewlett Packard"),
    ("00:00:48", "Seiko Epson"),
    ("64:EB:8C", "Seiko Epson"),
    ("00:1E:8F", "Canon"),
    ("00:80:77", "Brother Industries"),
    ("28:57:BE", "Hangzhou Hikvision"),
    ("44:19:B6", "Hangzhou Hikvision"),
    ("3C:EF:8C", "Zhejiang Dahua"),
    ("00:0D:4B", "Roku"),
    ("00:1A:11", "Google"),
    ("F4:F5:D8", "Google"),
    ("18:B4:30", "Nest Labs"),
    ("44:65:0D", "Amazon Technologies"),
    ("F0:27:2D", "Amazon Technologies"),
    ("00:17:88", "Philips Lighting"),
    ("00:0E:58", "Sonos"),
    ("5C:AA:FD", "Sonos"),
    ("24:0A:C4", "Espressif"),
    ("30:AE:A4", "Espressif"),
    ("A4:CF:12", "Espressif"),
    ("00:0B:82", "Grandstream Networks"),
    ("00:04:F2", "Polycom"),
    ("80:5E:C0", "Yealink"),
];

/// `AA:BB:CC` form of the first three octets, or None for malformed input.
pub fn oui_prefix(mac: &str) -> Option<String> {
    let prefix = mac.get(..8)?.to_ascii_uppercase().replace('-', ":");
    let valid = prefix.split(':').count() == 3
        && prefix
            .split(':')
            .all(|o| o.len() == 2 && o.chars().all(|c| c.is_ascii_hexdigit()));
    valid.then_some(prefix)
}

/// Bit 0x02 of the first octet marks a locally administered (randomized or virtual) address.
pub fn is_locally_administered(mac: &str) -> bool {
    mac.get(..2)
        .and_then(|o| u8::from_str_radix(o, 16).ok())
        .is_some_and(|b| b & 0x02 != 0)
}

/// Manufacturer from the built-in table.
pub fn fallback_vendor(mac: &str) -> Option<String> {
    let prefix = oui_prefix(mac)?;
    KNOWN_VENDORS
        .iter()
        .find(|(p, _)| *p == prefix)
        .map(|(_, v)| v.to_string())
}

pub fn lookup_vendor(mac: &str) -> Option<String> {
    if is_locally_administered(mac) {
        return Some(RANDOMIZED_VENDOR.to_string());
    }
    oui_prefix(mac)?;
    let from_db = oui_db().and_then(|db| match db.lookup_by_mac(mac) {
        Ok(entry) => entry.map(|e| e.company_name.trim().to_string()),
        Err(e) => {
            tracing::debug!(error = ?e, mac, "OUI lookup failed");
            None
        }
    });
    from_db
        .filter(|name| !name.is_empty())
        .or_else(|| fallback_vendor(mac))
}

pub struct OuiTable;

impl VendorLookup for OuiTable {
    fn resolve_vendor(&self, mac: &str) -> Option<String> {
        lookup_vendor(mac)
    }
}
