use async_stream::stream;
use bytes::Bytes;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, Stream, StreamExt};
use prost::Message;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LengthDelimitedCodec};

use crate::error::RpcSendError;

/// Largest frame accepted by default, in bytes.
pub const DEFAULT_MAX_FRAME_LENGTH: usize = 64 * 1024;

type FramedTcp = Framed<TcpStream, LengthDelimitedCodec>;

/// Frame a TCP stream and split it into its write and read halves.
pub(crate) fn split(stream: TcpStream, max_frame_length: usize) -> (RpcOutbound, RpcInbound) {
    let codec = LengthDelimitedCodec::builder()
        .max_frame_length(max_frame_length)
        .new_codec();
    let (sink, frames) = Framed::new(stream, codec).split();
    (RpcOutbound::new(sink), RpcInbound::new(frames))
}

/// A stream of raw frames read from a connection.
///
/// Ends after the first I/O error or when the peer closes its side.
pub struct RpcInbound {
    inner: Pin<Box<dyn Stream<Item = Result<Bytes, io::Error>> + Send>>,
}

impl RpcInbound {
    fn new(mut frames: SplitStream<FramedTcp>) -> Self {
        let inner = stream! {
            while let Some(frame) = frames.next().await {
                match frame {
                    Ok(frame) => yield Ok(frame.freeze()),
                    Err(e) => {
                        yield Err(e);
                        break;
                    }
                }
            }
        };

        Self {
            inner: Box::pin(inner),
        }
    }
}

impl Stream for RpcInbound {
    type Item = Result<Bytes, io::Error>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.inner.as_mut().poll_next(cx)
    }
}

/// The write half of a connection.
pub struct RpcOutbound {
    sink: SplitSink<FramedTcp, Bytes>,
}

impl RpcOutbound {
    fn new(sink: SplitSink<FramedTcp, Bytes>) -> Self {
        Self { sink }
    }

    /// Send a protobuf message as one frame.
    pub async fn send<M: Message>(&mut self, msg: &M) -> Result<(), RpcSendError> {
        self.send_raw(msg.encode_to_vec()).await
    }

    /// Send raw bytes as one frame.
    pub async fn send_raw(&mut self, bytes: impl Into<Bytes>) -> Result<(), RpcSendError> {
        self.sink.send(bytes.into()).await?;
        Ok(())
    }

    /// Flush pending frames and shut down the write side.
    pub async fn close(&mut self) -> Result<(), RpcSendError> {
        self.sink.close().await?;
        Ok(())
    }
}
