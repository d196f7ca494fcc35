use crate::domain::model::OutboundMessage;
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: Vec<u8>,
}

/// 遠端圖片來源。timeout 由呼叫端逐次給定
#[async_trait]
pub trait ImageTransport: Send + Sync {
    async fn get(&self, url: &str, timeout: Duration) -> Result<TransportResponse>;
}

/// 訊息傳送端（聊天平台）。負責編碼與實際送出
pub trait MessageSink: Send + Sync {
    fn send(&self, message: OutboundMessage)
        -> impl std::future::Future<Output = Result<()>> + Send;
}
