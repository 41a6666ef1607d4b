mod config;
mod email;
mod handler;

use anyhow::Result;
use futures_util::StreamExt;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, BasicNackOptions, BasicQosOptions, QueueDeclareOptions,
};
use lapin::types::FieldTable;
use lapin::{Connection, ConnectionProperties};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use shared::queue::EMAIL_QUEUE;

use crate::{config::Config, email::SmtpSender, handler::Disposition};

#[tokio::main]
async fn main() -> Result<()> {
    // Install rustls crypto provider before any TLS operations
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    let config = envy::prefixed("BANKD_").from_env::<Config>()?;

    // Initialize Sentry for error tracking (must be done early, guard must stay alive)
    let _sentry_guard = config.sentry_dsn.as_ref().map(|dsn| {
        sentry::init((
            dsn.as_str(),
            sentry::ClientOptions {
                release: sentry::release_name!(),
                environment: Some(config.env.clone().into()),
                ..Default::default()
            },
        ))
    });

    // Set up tracing: JSON in production, human-readable otherwise
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if config.is_production() {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt::layer())
            .init();
    }

    let sender = SmtpSender::new(&config.smtp_url, &config.smtp_from)?;

    let connection = Connection::connect(&config.amqp_url, ConnectionProperties::default()).await?;
    let channel = connection.create_channel().await?;

    // Same durable declaration as the publisher; whichever side starts first
    // creates the queue.
    channel
        .queue_declare(
            EMAIL_QUEUE,
            QueueDeclareOptions {
                durable: true,
                ..Default::default()
            },
            FieldTable::default(),
        )
        .await?;

    // One unacked message at a time; a slow SMTP server backs up the queue,
    // not this process.
    channel.basic_qos(1, BasicQosOptions::default()).await?;

    let mut consumer = channel
        .basic_consume(
            EMAIL_QUEUE,
            "bankd-consumer",
            BasicConsumeOptions::default(),
            FieldTable::default(),
        )
        .await?;

    tracing::info!(queue = EMAIL_QUEUE, "waiting for messages");

    loop {
        let delivery = tokio::select! {
            delivery = consumer.next() => delivery,
            _ = shutdown_signal() => {
                tracing::info!("shutting down");
                break;
            }
        };

        let Some(delivery) = delivery else {
            tracing::warn!("consumer stream closed");
            break;
        };

        let delivery = match delivery {
            Ok(delivery) => delivery,
            Err(e) => {
                tracing::error!("consumer stream error: {}", e);
                break;
            }
        };

        match handler::process(&delivery.data, &sender) {
            Disposition::Ack => delivery.ack(BasicAckOptions::default()).await?,
            Disposition::Drop => {
                delivery
                    .nack(BasicNackOptions {
                        requeue: false,
                        ..Default::default()
                    })
                    .await?
            }
            Disposition::Requeue => {
                delivery
                    .nack(BasicNackOptions {
                        requeue: true,
                        ..Default::default()
                    })
                    .await?
            }
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
