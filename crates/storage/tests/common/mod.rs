#![allow(dead_code)]

use bytes::Bytes;
use easel_storage::ByteStream;
use futures::TryStreamExt;
use std::net::TcpListener;

pub fn can_bind_localhost() -> bool {
    TcpListener::bind("127.0.0.1:0").is_ok()
}

/// Smallest valid PNG signature plus a marker so tests can tell images apart.
pub fn png(marker: &[u8]) -> Vec<u8> {
    let mut data = b"\x89PNG\r\n\x1a\n".to_vec();
    data.extend_from_slice(marker);
    data
}

pub async fn collect(stream: ByteStream) -> Vec<u8> {
    let chunks: Vec<Bytes> = stream.try_collect().await.unwrap();
    chunks.concat()
}
