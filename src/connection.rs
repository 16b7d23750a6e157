use futures::{SinkExt, StreamExt};
use std::net::SocketAddr;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use uuid::Uuid;

use crate::codec::{CodecError, TcpCodec};
use crate::commands::TcpCommand;
use crate::reply::TcpReply;

/// A client connection on the reporting port.
pub struct Connection {
    pub id: Uuid,
    pub client_address: SocketAddr,
    framed: Framed<TcpStream, TcpCodec>,
}

impl Connection {
    pub fn new(stream: TcpStream, client_address: SocketAddr) -> Connection {
        Connection {
            id: Uuid::new_v4(),
            client_address,
            framed: Framed::new(stream, TcpCodec),
        }
    }

    /// Reads the next request. Returns `None` if the client closed the
    /// connection without sending anything.
    pub async fn read_request(&mut self) -> Result<Option<TcpCommand>, CodecError> {
        self.framed.next().await.transpose()
    }

    pub async fn write_reply(&mut self, reply: TcpReply) -> Result<(), CodecError> {
        self.framed.send(reply).await
    }
}
