//! Bidirectional byte relay.
//!
//! Once a connection pair exists, each direction is copied independently.
//! When one direction reaches end-of-stream its destination gets a
//! half-close, so the peer observes EOF promptly while the other direction
//! keeps flowing; both streams are released once both directions finish or
//! either one fails.

use std::io;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

/// Relay bytes between the client and upstream legs until completion.
///
/// Returns bytes copied client→upstream and upstream→client. An I/O error in
/// either direction tears down both legs; proxied streams are not resumable.
pub async fn pipe<C, U>(client: C, upstream: U) -> io::Result<(u64, u64)>
where
    C: AsyncRead + AsyncWrite,
    U: AsyncRead + AsyncWrite,
{
    let (mut client_rd, mut client_wr) = tokio::io::split(client);
    let (mut upstream_rd, mut upstream_wr) = tokio::io::split(upstream);

    let client_to_upstream = async {
        let n = tokio::io::copy(&mut client_rd, &mut upstream_wr).await?;
        upstream_wr.shutdown().await.ok();
        Ok::<u64, io::Error>(n)
    };

    let upstream_to_client = async {
        let n = tokio::io::copy(&mut upstream_rd, &mut client_wr).await?;
        client_wr.shutdown().await.ok();
        Ok::<u64, io::Error>(n)
    };

    tokio::try_join!(client_to_upstream, upstream_to_client)
}
