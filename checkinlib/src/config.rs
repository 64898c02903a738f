//! Startup configuration of the access point, the HTTP listener and the display.
//!
//! Everything that used to be a hardware literal lives here, so the protocol code stays
//! parametric. The firmware builds a [`Config`] at boot and refuses to start when
//! [`Config::validate`] fails.

use core::fmt;

use crate::dhcp::MAX_LEASES;
use crate::ssd1306::{MAX_HEIGHT, MAX_WIDTH, PAGE_HEIGHT};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkConfig {
    pub ssid: &'static str,
    /// WPA2 passphrase, 8 to 63 characters
    pub passphrase: &'static str,
    /// Address of the device, which is also the gateway handed to clients
    pub gateway: [u8; 4],
    pub prefix_len: u8,
    pub http_port: u16,
    /// Host part of the first address the DHCP responder leases out
    pub dhcp_first_host: u8,
    /// Number of addresses in the DHCP pool, at most [`MAX_LEASES`]
    pub dhcp_pool_size: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisplayConfig {
    /// 7-bit I2C bus address
    pub address: u8,
    pub width: u8,
    pub height: u8,
    /// Set the segment remap and COM scan direction bits, for a module mounted upside down
    pub flip: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Config {
    pub network: NetworkConfig,
    pub display: DisplayConfig,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        NetworkConfig {
            ssid: "BitDog",
            passphrase: "12345678",
            gateway: [192, 168, 4, 1],
            prefix_len: 24,
            http_port: 80,
            dhcp_first_host: 16,
            dhcp_pool_size: 8,
        }
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        DisplayConfig {
            address: 0x3C,
            width: 128,
            height: 64,
            flip: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// SSID must be 1 to 32 bytes
    SsidLength,
    /// Passphrase must be 8 to 63 characters
    PassphraseLength,
    PrefixLength,
    HttpPort,
    /// The lease pool must fit in the subnet and leave out the gateway
    DhcpPool,
    DisplayAddress,
    DisplayGeometry,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::SsidLength => write!(f, "ssid must be between 1 and 32 bytes"),
            ConfigError::PassphraseLength => {
                write!(f, "passphrase must be between 8 and 63 characters")
            }
            ConfigError::PrefixLength => write!(f, "prefix length must be between 1 and 30"),
            ConfigError::HttpPort => write!(f, "http port must not be 0"),
            ConfigError::DhcpPool => write!(
                f,
                "dhcp pool must hold 1 to {MAX_LEASES} host addresses of the subnet, without the gateway"
            ),
            ConfigError::DisplayAddress => write!(f, "display address must be a 7-bit address"),
            ConfigError::DisplayGeometry => write!(
                f,
                "display must be at most {MAX_WIDTH}x{MAX_HEIGHT} with a height divisible by {PAGE_HEIGHT}"
            ),
        }
    }
}

impl NetworkConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ssid.is_empty() || self.ssid.len() > 32 {
            return Err(ConfigError::SsidLength);
        }
        if !(8..=63).contains(&self.passphrase.chars().count()) {
            return Err(ConfigError::PassphraseLength);
        }
        if !(1..=30).contains(&self.prefix_len) {
            return Err(ConfigError::PrefixLength);
        }
        if self.http_port == 0 {
            return Err(ConfigError::HttpPort);
        }
        if !self.dhcp_pool_fits() {
            return Err(ConfigError::DhcpPool);
        }
        Ok(())
    }

    pub fn netmask(&self) -> u32 {
        match self.prefix_len {
            0 => 0,
            len => u32::MAX << (32 - len.min(32) as u32),
        }
    }

    /// First address of the DHCP pool.
    pub fn dhcp_pool_start(&self) -> u32 {
        (u32::from_be_bytes(self.gateway) & self.netmask()) | self.dhcp_first_host as u32
    }

    fn dhcp_pool_fits(&self) -> bool {
        let host_mask = !self.netmask();
        let first = self.dhcp_first_host as u32;
        let size = self.dhcp_pool_size as u32;
        let gateway_host = u32::from_be_bytes(self.gateway) & host_mask;
        // Host part 0 is the network, all ones is broadcast
        (1..=MAX_LEASES as u32).contains(&size)
            && first >= 1
            && first + size - 1 < host_mask
            && !(first..first + size).contains(&gateway_host)
    }
}

impl DisplayConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.address > 0x7F {
            return Err(ConfigError::DisplayAddress);
        }
        if !geometry_fits(self.width, self.height) {
            return Err(ConfigError::DisplayGeometry);
        }
        Ok(())
    }
}

impl Config {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.network.validate()?;
        self.display.validate()
    }
}

/// Whether a `width` x `height` panel fits the framebuffer.
pub(crate) fn geometry_fits(width: u8, height: u8) -> bool {
    let (width, height) = (width as usize, height as usize);
    width > 0
        && width <= MAX_WIDTH
        && height > 0
        && height <= MAX_HEIGHT
        && height % PAGE_HEIGHT == 0
}
