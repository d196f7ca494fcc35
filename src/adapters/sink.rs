use std::path::PathBuf;

use crate::domain::model::OutboundMessage;
use crate::domain::ports::MessageSink;
use crate::utils::error::Result;

/// CLI 用的傳送端：圖片依牌陣位置寫入輸出目錄，文字寫到 stdout 並另存 reading.txt
#[derive(Debug)]
pub struct LocalDirSink {
    output_dir: PathBuf,
    echo: bool,
}

impl LocalDirSink {
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            echo: true,
        }
    }

    pub fn quiet(mut self) -> Self {
        self.echo = false;
        self
    }
}

impl MessageSink for LocalDirSink {
    async fn send(&self, message: OutboundMessage) -> Result<()> {
        tokio::fs::create_dir_all(&self.output_dir).await?;

        match message {
            OutboundMessage::Image { slot, bytes } => {
                let path = self.output_dir.join(format!("card_{:02}.png", slot));
                tokio::fs::write(&path, &bytes).await?;
                tracing::info!("🖼️ Saved card image to {}", path.display());
            }
            OutboundMessage::Text(text) => {
                let path = self.output_dir.join("reading.txt");
                tokio::fs::write(&path, text.as_bytes()).await?;
                if self.echo {
                    println!("{}", text);
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_image_files_follow_formation_slots() {
        let dir = TempDir::new().unwrap();
        let out = dir.path().join("reading");
        let sink = LocalDirSink::new(&out).quiet();

        sink.send(OutboundMessage::Image {
            slot: 1,
            bytes: vec![1, 2, 3],
        })
        .await
        .unwrap();
        // 第 2 張缺圖，第 3 張仍寫到 card_03
        sink.send(OutboundMessage::Image {
            slot: 3,
            bytes: vec![4, 5],
        })
        .await
        .unwrap();
        sink.send(OutboundMessage::Text("[single]\n".to_string()))
            .await
            .unwrap();

        assert_eq!(std::fs::read(out.join("card_01.png")).unwrap(), vec![1, 2, 3]);
        assert!(!out.join("card_02.png").exists());
        assert_eq!(std::fs::read(out.join("card_03.png")).unwrap(), vec![4, 5]);
        assert_eq!(
            std::fs::read_to_string(out.join("reading.txt")).unwrap(),
            "[single]\n"
        );
    }
}
