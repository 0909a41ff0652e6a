use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};

use crate::protocol::{ProtocolError, Request, Response};
use crate::Error;

/// Maximum payload size accepted on either side of the wire. Frames above
/// this limit are a fatal protocol error for the connection.
pub const MAX_FRAME_SIZE: usize = 1024 * 1024;

const LENGTH_PREFIX_SIZE: usize = 4;

/// Server side of the wire: decodes [`Request`] frames, encodes [`Response`]
/// frames. Each frame is a 4-byte big-endian payload length followed by the
/// payload itself.
pub struct ServerCodec;

/// Client side of the wire: the mirror image of [`ServerCodec`].
pub struct ClientCodec;

fn decode_frame(src: &mut BytesMut) -> Result<Option<BytesMut>, ProtocolError> {
    if src.len() < LENGTH_PREFIX_SIZE {
        return Ok(None);
    }

    let mut length_bytes = [0u8; LENGTH_PREFIX_SIZE];
    length_bytes.copy_from_slice(&src[..LENGTH_PREFIX_SIZE]);
    let length = u32::from_be_bytes(length_bytes) as usize;

    if length > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge(length));
    }

    if src.len() < LENGTH_PREFIX_SIZE + length {
        src.reserve(LENGTH_PREFIX_SIZE + length - src.len());
        return Ok(None);
    }

    src.advance(LENGTH_PREFIX_SIZE);
    Ok(Some(src.split_to(length)))
}

fn encode_frame(payload: &[u8], dst: &mut BytesMut) -> Result<(), ProtocolError> {
    if payload.len() > MAX_FRAME_SIZE {
        return Err(ProtocolError::FrameTooLarge(payload.len()));
    }
    dst.reserve(LENGTH_PREFIX_SIZE + payload.len());
    dst.put_u32(payload.len() as u32);
    dst.put_slice(payload);
    Ok(())
}

impl Decoder for ServerCodec {
    type Item = Request;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match decode_frame(src)? {
            Some(payload) => Ok(Some(Request::decode(&payload)?)),
            None => Ok(None),
        }
    }
}

impl Encoder<Response> for ServerCodec {
    type Error = Error;

    fn encode(&mut self, response: Response, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_frame(&response.encode(), dst)?;
        Ok(())
    }
}

impl Decoder for ClientCodec {
    type Item = Response;
    type Error = Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match decode_frame(src)? {
            Some(payload) => Ok(Some(Response::decode(&payload)?)),
            None => Ok(None),
        }
    }
}

impl Encoder<Request> for ClientCodec {
    type Error = Error;

    fn encode(&mut self, request: Request, dst: &mut BytesMut) -> Result<(), Self::Error> {
        encode_frame(&request.encode(), dst)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use bytes::Bytes;

    use super::*;
    use crate::protocol::Opcode;

    fn framed(payload: &[u8]) -> Vec<u8> {
        let mut buf = Vec::with_capacity(4 + payload.len());
        buf.extend_from_slice(&(payload.len() as u32).to_be_bytes());
        buf.extend_from_slice(payload);
        buf
    }

    #[test]
    fn decode_single_request_frame() {
        let request = Request::new(Opcode::Get, "mykey");
        let mut src = BytesMut::from(&framed(&request.encode())[..]);

        let decoded = ServerCodec.decode(&mut src).unwrap();

        assert_eq!(decoded, Some(request));
        assert!(src.is_empty());
    }

    #[test]
    fn decode_partial_frame_waits_for_more() {
        let request = Request::new(Opcode::Set, "mykey").with_args(vec![Bytes::from("myvalue")]);
        let bytes = framed(&request.encode());

        let mut src = BytesMut::from(&bytes[..3]);
        assert_eq!(ServerCodec.decode(&mut src).unwrap(), None);

        src.extend_from_slice(&bytes[3..bytes.len() - 1]);
        assert_eq!(ServerCodec.decode(&mut src).unwrap(), None);

        src.extend_from_slice(&bytes[bytes.len() - 1..]);
        assert_eq!(ServerCodec.decode(&mut src).unwrap(), Some(request));
    }

    #[test]
    fn decode_concatenated_frames_in_order() {
        let requests = vec![
            Request::new(Opcode::Incr, "counter"),
            Request::new(Opcode::Incr, "counter"),
            Request::new(Opcode::Get, "counter"),
        ];

        let mut bytes = Vec::new();
        for request in &requests {
            bytes.extend_from_slice(&framed(&request.encode()));
        }
        let mut src = BytesMut::from(&bytes[..]);

        for request in &requests {
            assert_eq!(ServerCodec.decode(&mut src).unwrap(), Some(request.clone()));
        }
        assert_eq!(ServerCodec.decode(&mut src).unwrap(), None);
    }

    #[test]
    fn truncated_trailing_frame_is_an_error_at_eof() {
        let request = Request::new(Opcode::Get, "mykey");
        let frame = framed(&request.encode());

        let mut bytes = frame.clone();
        bytes.extend_from_slice(&frame[..frame.len() - 1]);
        let mut src = BytesMut::from(&bytes[..]);

        assert_eq!(ServerCodec.decode(&mut src).unwrap(), Some(request));
        assert_eq!(ServerCodec.decode(&mut src).unwrap(), None);
        // The stream ends mid-frame: that is an I/O error, not a silent drop.
        assert!(ServerCodec.decode_eof(&mut src).is_err());
    }

    #[test]
    fn decode_rejects_oversized_frame() {
        let mut src = BytesMut::from(&((MAX_FRAME_SIZE as u32 + 1).to_be_bytes())[..]);

        let err = ServerCodec.decode(&mut src).unwrap_err();

        let err = err.downcast_ref::<ProtocolError>().unwrap();
        assert_eq!(*err, ProtocolError::FrameTooLarge(MAX_FRAME_SIZE + 1));
    }

    #[test]
    fn encode_rejects_oversized_payload() {
        let response = Response::Str(Bytes::from(vec![0u8; MAX_FRAME_SIZE + 1]));
        let mut dst = BytesMut::new();

        let err = ServerCodec.encode(response, &mut dst).unwrap_err();

        let err = err.downcast_ref::<ProtocolError>().unwrap();
        assert!(matches!(err, ProtocolError::FrameTooLarge(_)));
    }

    #[test]
    fn client_codec_roundtrip() {
        let response = Response::Array(vec![Bytes::from("a"), Bytes::from("b")]);
        let mut wire = BytesMut::new();
        ServerCodec.encode(response.clone(), &mut wire).unwrap();

        let decoded = ClientCodec.decode(&mut wire).unwrap();

        assert_eq!(decoded, Some(response));
    }
}
