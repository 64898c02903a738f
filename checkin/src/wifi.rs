use checkinlib::config::NetworkConfig;
use embassy_executor::Spawner;
use embassy_net::{Config, Ipv4Address, Ipv4Cidr, Runner, Stack, StackResources, StaticConfigV4};
use embassy_time::{Duration, Timer};
use esp_hal::peripherals::{RNG, SYSTIMER, WIFI};
use esp_hal::rng::Rng;
use esp_hal::timer::systimer::SystemTimer;
use esp_wifi::wifi::{
    AccessPointConfiguration, AuthMethod, Configuration, WifiController, WifiDevice, WifiEvent,
    WifiState,
};
use esp_wifi::{init, EspWifiController};

use crate::http::MAX_CONNECTIONS;
use crate::responders::{setup_responders, RESPONDER_SOCKETS};

/// One socket per web task plus the DHCP and DNS sockets.
const MAX_SOCKETS: usize = MAX_CONNECTIONS + RESPONDER_SOCKETS;

/// Bring up the access point and a network stack with a static address on it.
/// Clients lease their address from the DHCP responder.
pub async fn setup_wifi(
    config: &'static NetworkConfig,
    systimer: SYSTIMER<'static>,
    rng: RNG<'static>,
    wifi: WIFI<'static>,
    spawner: Spawner,
) -> Stack<'static> {
    let timer = SystemTimer::new(systimer).alarm0;
    let mut rng = Rng::new(rng);
    let init: &'static EspWifiController<'static> =
        make_static!(EspWifiController<'static>, init(timer, rng).unwrap());

    let (controller, interfaces) = esp_wifi::wifi::new(init, wifi).unwrap();

    let address = Ipv4Address::from(config.gateway);
    let net_config = Config::ipv4_static(StaticConfigV4 {
        address: Ipv4Cidr::new(address, config.prefix_len),
        gateway: None,
        dns_servers: Default::default(),
    });
    let (stack, runner): (Stack<'static>, Runner<_>) = embassy_net::new(
        interfaces.ap,
        net_config,
        make_static!(
            StackResources<MAX_SOCKETS>,
            StackResources::<MAX_SOCKETS>::new()
        ),
        (rng.random() as u64) << 32 | rng.random() as u64,
    );
    spawner.must_spawn(access_point_task(controller, config));
    spawner.must_spawn(net_task(runner));
    setup_responders(stack, config, spawner);

    log::info!("Waiting for access point...");
    loop {
        if stack.is_link_up() {
            break;
        }
        Timer::after(Duration::from_millis(500)).await;
    }
    log::info!("Serving on {address}/{}", config.prefix_len);

    stack
}

/// Task that keeps the access point up
#[embassy_executor::task]
async fn access_point_task(mut controller: WifiController<'static>, config: &'static NetworkConfig) {
    log::info!("Start access point task...");

    loop {
        if let WifiState::ApStarted = esp_wifi::wifi::wifi_state() {
            // wait until the access point goes down
            controller.wait_for_event(WifiEvent::ApStop).await;
            log::warn!("Access point stopped, restarting in 5 seconds...");
            Timer::after(Duration::from_millis(5000)).await
        }
        if !matches!(controller.is_started(), Ok(true)) {
            let ap_config = Configuration::AccessPoint(AccessPointConfiguration {
                ssid: config.ssid.into(),
                password: config.passphrase.into(),
                auth_method: AuthMethod::WPA2Personal,
                ..Default::default()
            });
            controller.set_configuration(&ap_config).unwrap();

            log::info!("Starting access point {:?}...", config.ssid);
            match controller.start_async().await {
                Ok(()) => log::info!("Access point started!"),
                Err(e) => {
                    log::warn!("Failed to start access point: {e:?}");
                    Timer::after(Duration::from_millis(5000)).await
                }
            }
        } else {
            Timer::after(Duration::from_millis(500)).await
        }
    }
}

/// Task that runs the network stack
#[embassy_executor::task]
async fn net_task(mut runner: Runner<'static, WifiDevice<'static>>) {
    runner.run().await
}
