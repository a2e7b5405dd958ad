//! # Async MQTT client for embedded systems
//!
//! `no_std`, allocation-free MQTT v3.1.1 client built on the Embassy
//! ecosystem. Buffers are fixed-size arrays sized through const generics.
//!
//! - CONNECT with username and password, CONNACK return codes
//! - PUBLISH and SUBSCRIBE with QoS 0 and 1, PUBACK handling
//! - PINGREQ keep-alive driven from [`MqttClient::poll`]
//! - Any reliable byte stream through [`MqttTransport`]; [`StreamTransport`]
//!   adapts `embedded-io-async` streams such as TCP sockets or TLS sessions
//!
//! ## Usage
//!
//! ```no_run
//! # use myrtio_mqtt::{MqttClient, MqttEvent, MqttOptions, QoS};
//! # use myrtio_mqtt::transport::MqttTransport;
//! # struct MyTransport;
//! # impl MqttTransport for MyTransport {
//! #     type Error = ();
//! #     async fn send(&mut self, _buf: &[u8]) -> Result<(), Self::Error> { Ok(()) }
//! #     async fn recv(&mut self, _buf: &mut [u8]) -> Result<usize, Self::Error> { Ok(0) }
//! # }
//! # async fn run() -> Result<(), myrtio_mqtt::error::MqttError<()>> {
//! let options = MqttOptions::new("my-device-id").with_credentials("user", "secret");
//! let mut client = MqttClient::<_, 4, 512>::new(MyTransport, options);
//!
//! client.connect().await?;
//! client.subscribe("devices/my-device-id/commands/#", QoS::AtLeastOnce).await?;
//! client.publish("sensors/temperature", b"25.3", QoS::AtLeastOnce).await?;
//!
//! loop {
//!     if let Some(MqttEvent::Publish(msg)) = client.poll().await? {
//!         let _ = (msg.topic, msg.payload);
//!     }
//! }
//! # }
//! ```

#![no_std]
pub mod client;
pub mod error;
pub mod packet;
pub mod transport;
pub mod util;

pub use client::{MqttClient, MqttEvent, MqttOptions, PublishMessage};
pub use error::{MqttError, PacketError};
pub use packet::{ConnectReturnCode, QoS};
pub use transport::{MqttTransport, StreamTransport};
