//! Types shared between the API server and the notification consumer.

pub mod queue;
