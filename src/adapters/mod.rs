// 對外部系統的具體實作（HTTP 圖片來源、本地輸出）

pub mod http;
pub mod sink;
