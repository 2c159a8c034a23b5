pub use broccoli_queue::{error::BroccoliError, queue::BroccoliQueue};

pub type Mq = BroccoliQueue;

/// Message-queue connection settings.
pub struct MqConfig {
    pub url: String,
    pub pool_size: u8,
}

pub async fn init_mq(config: MqConfig) -> Result<Mq, BroccoliError> {
    BroccoliQueue::builder(&config.url)
        .pool_connections(config.pool_size)
        .build()
        .await
}
