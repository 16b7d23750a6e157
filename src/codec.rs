use bytes::{Buf, BytesMut};
use std::io;
use thiserror::Error as ThisError;
use tokio_util::codec::{Decoder, Encoder};

use crate::commands::{CommandParserError, TcpCommand};
use crate::reply::TcpReply;

/// Longest TCP request accepted, newline included.
pub const MAX_REQUEST_LEN: usize = 64;

/// Frames TCP requests by newline and decodes each line into a command.
pub struct TcpCodec;

impl Decoder for TcpCodec {
    type Item = TcpCommand;
    type Error = CodecError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let newline = src.iter().position(|&b| b == b'\n');

        let len = match newline {
            Some(position) => position + 1,
            None if src.len() >= MAX_REQUEST_LEN => return Err(CodecError::TooLong(src.len())),
            None => return Ok(None), // Not enough data to decode a request.
        };
        if len > MAX_REQUEST_LEN {
            return Err(CodecError::TooLong(len));
        }

        let line = src.split_to(len);
        let command = TcpCommand::try_from(&line[..])?;

        Ok(Some(command))
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.decode(src)? {
            Some(command) => Ok(Some(command)),
            None if src.has_remaining() => Err(CodecError::Incomplete),
            None => Ok(None),
        }
    }
}

impl Encoder<TcpReply> for TcpCodec {
    type Error = CodecError;

    fn encode(&mut self, reply: TcpReply, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let bytes: Vec<u8> = reply.into();
        dst.extend_from_slice(&bytes);
        Ok(())
    }
}

#[derive(Debug, ThisError)]
pub enum CodecError {
    #[error(transparent)]
    Parse(#[from] CommandParserError),
    #[error("protocol error; request of {0} bytes exceeds the limit")]
    TooLong(usize),
    #[error("protocol error; connection closed in the middle of a request")]
    Incomplete,
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl CodecError {
    /// Errors caused by what the client sent, which are answered with `ERR`.
    pub fn is_protocol(&self) -> bool {
        !matches!(self, CodecError::Io(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::scoreboard::Scoreboard;
    use crate::reply::ScoreboardReply;

    #[test]
    fn decode_waits_for_newline() {
        let mut codec = TcpCodec;
        let mut buf = BytesMut::from("SS");

        assert!(codec.decode(&mut buf).unwrap().is_none());

        buf.extend_from_slice(b"B\n");
        let command = codec.decode(&mut buf).unwrap();

        assert_eq!(command, Some(TcpCommand::Scoreboard(Scoreboard)));
        assert!(buf.is_empty());
    }

    #[test]
    fn decode_rejects_long_request() {
        let mut codec = TcpCodec;
        let mut buf = BytesMut::from(&[b'S'; MAX_REQUEST_LEN][..]);

        assert!(matches!(
            codec.decode(&mut buf),
            Err(CodecError::TooLong(MAX_REQUEST_LEN))
        ));
    }

    #[test]
    fn decode_rejects_unknown_command() {
        let mut codec = TcpCodec;
        let mut buf = BytesMut::from("SNG 106485 60\n");

        let err = codec.decode(&mut buf).unwrap_err();

        assert!(matches!(err, CodecError::Parse(_)));
        assert!(err.is_protocol());
    }

    #[test]
    fn decode_eof_with_partial_request() {
        let mut codec = TcpCodec;

        let mut buf = BytesMut::from("STR 1064");
        assert!(matches!(
            codec.decode_eof(&mut buf),
            Err(CodecError::Incomplete)
        ));

        let mut buf = BytesMut::new();
        assert!(codec.decode_eof(&mut buf).unwrap().is_none());
    }

    #[test]
    fn encode_reply() {
        let mut codec = TcpCodec;
        let mut buf = BytesMut::new();

        codec
            .encode(TcpReply::Scoreboard(ScoreboardReply::Empty), &mut buf)
            .unwrap();

        assert_eq!(&buf[..], b"RSS EMPTY\n");
    }
}
