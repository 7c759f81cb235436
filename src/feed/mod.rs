//! MQTT telemetry feed.
//!
//! Connects to the broker, subscribes to the controller topic, and hands
//! raw payloads to a registered callback. The feed owns reconnection: poll
//! errors surface as a status change and a delayed retry, never as a crash.

pub mod stats;

use anyhow::{Context, Result};
use rumqttc::{AsyncClient, Event, MqttOptions, Packet, QoS};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::config::MqttConfig;

/// Callback invoked with each raw payload received on the topic.
pub type MessageHandler = Box<dyn Fn(&[u8]) + Send + Sync>;

/// Callback invoked when broker connectivity changes.
pub type StatusHandler = Box<dyn Fn(bool) + Send + Sync>;

pub struct MqttFeed {
    cfg: MqttConfig,
    on_message: Option<MessageHandler>,
    on_status: Option<StatusHandler>,
    client: Option<AsyncClient>,
    poll_task: Option<tokio::task::JoinHandle<()>>,
}

impl MqttFeed {
    pub fn new(cfg: MqttConfig) -> Self {
        Self {
            cfg,
            on_message: None,
            on_status: None,
            client: None,
            poll_task: None,
        }
    }

    /// Registers the payload callback. Must be set before `start`.
    pub fn on_message(&mut self, handler: MessageHandler) {
        self.on_message = Some(handler);
    }

    /// Registers the connectivity callback.
    pub fn on_status(&mut self, handler: StatusHandler) {
        self.on_status = Some(handler);
    }

    /// Connects to the broker and spawns the poll loop.
    pub async fn start(&mut self, ctx: CancellationToken) -> Result<()> {
        let on_message = self
            .on_message
            .take()
            .context("message handler not registered")?;
        let on_status = self.on_status.take();

        let mut options = MqttOptions::new(
            self.cfg.client_id.clone(),
            self.cfg.host.clone(),
            self.cfg.port,
        );
        options.set_keep_alive(self.cfg.keep_alive);
        if !self.cfg.username.is_empty() {
            options.set_credentials(self.cfg.username.clone(), self.cfg.password.clone());
        }

        let (client, mut eventloop) = AsyncClient::new(options, 64);
        self.client = Some(client.clone());

        let topic = self.cfg.topic.clone();
        let reconnect_delay = self.cfg.reconnect_delay;

        let poll_task = tokio::spawn(async move {
            let mut connected = false;

            loop {
                tokio::select! {
                    _ = ctx.cancelled() => {
                        let _ = client.disconnect().await;
                        info!("feed poll loop stopped");
                        return;
                    }

                    event = eventloop.poll() => match event {
                        // Subscribe on every ConnAck so reconnects restore
                        // the subscription.
                        Ok(Event::Incoming(Packet::ConnAck(_))) => {
                            info!(topic = %topic, "broker connected, subscribing");
                            if let Err(e) = client.subscribe(&topic, QoS::AtLeastOnce).await {
                                error!(error = %e, topic = %topic, "subscribe failed");
                            }
                            connected = true;
                            if let Some(handler) = &on_status {
                                handler(true);
                            }
                        }

                        Ok(Event::Incoming(Packet::Publish(publish))) => {
                            debug!(topic = %publish.topic, bytes = publish.payload.len(), "payload received");
                            on_message(&publish.payload);
                        }

                        Ok(_) => {}

                        Err(e) => {
                            if connected {
                                warn!(error = %e, "broker connection lost");
                            } else {
                                warn!(error = %e, delay = ?reconnect_delay, "broker connect failed, retrying");
                            }
                            connected = false;
                            if let Some(handler) = &on_status {
                                handler(false);
                            }

                            tokio::select! {
                                _ = ctx.cancelled() => return,
                                _ = tokio::time::sleep(reconnect_delay) => {}
                            }
                        }
                    }
                }
            }
        });

        self.poll_task = Some(poll_task);

        info!(
            host = %self.cfg.host,
            port = self.cfg.port,
            topic = %self.cfg.topic,
            "feed started"
        );
        Ok(())
    }

    /// Waits for the poll loop to exit. The cancellation token passed to
    /// `start` must already be cancelled.
    pub async fn stop(&mut self) -> Result<()> {
        if let Some(poll_task) = self.poll_task.take() {
            if let Err(e) = poll_task.await {
                warn!(error = %e, "feed poll task join failed");
            }
        }
        self.client.take();
        Ok(())
    }
}
