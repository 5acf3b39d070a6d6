//! Length-prefixed frame codec.
//!
//! Each frame is a 4-byte little-endian length followed by an rkyv payload:
//!
//! ```text
//! +----------------+------------------+
//! | length (4 LE)  | rkyv payload     |
//! +----------------+------------------+
//! ```

use rkyv::ser::serializers::AllocSerializer;
use rkyv::validation::validators::DefaultValidator;
use rkyv::{Archive, CheckBytes, Deserialize, Infallible, Serialize};
use std::io::{BufReader, BufWriter, Read, Write};
use thiserror::Error;

/// Upper bound on a single frame. Engine messages are tens of bytes, so a
/// length anywhere near this limit means a corrupted prefix.
pub const MAX_FRAME_SIZE: usize = 64 * 1024;

/// Buffer capacity for the reader/writer wrappers.
const BUF_CAPACITY: usize = 4 * 1024;

/// Errors surfaced by the frame codec.
#[derive(Debug, Error)]
pub enum FrameError {
    /// Underlying pipe or file I/O failed.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// The message could not be serialized.
    #[error("serialization error: {0}")]
    Serialize(String),

    /// The payload failed validation or could not be deserialized.
    #[error("deserialization error: {0}")]
    Deserialize(String),

    /// A length prefix exceeded [`MAX_FRAME_SIZE`].
    #[error("frame of {size} bytes exceeds the {max} byte limit")]
    TooLarge {
        /// Claimed frame size.
        size: usize,
        /// The enforced limit.
        max: usize,
    },

    /// A zero-length frame was read.
    #[error("zero-length frame")]
    Empty,

    /// The peer closed the stream between frames.
    #[error("end of stream")]
    EndOfStream,
}

/// Serialize `message` and write it as one flushed frame.
pub fn write_frame<W, T>(writer: &mut BufWriter<W>, message: &T) -> Result<(), FrameError>
where
    W: Write,
    T: Serialize<AllocSerializer<256>>,
{
    let bytes =
        rkyv::to_bytes::<_, 256>(message).map_err(|e| FrameError::Serialize(e.to_string()))?;
    if bytes.len() > MAX_FRAME_SIZE {
        return Err(FrameError::TooLarge {
            size: bytes.len(),
            max: MAX_FRAME_SIZE,
        });
    }

    writer.write_all(&(bytes.len() as u32).to_le_bytes())?;
    writer.write_all(&bytes)?;
    // Flush per frame; the peer blocks on whole messages.
    writer.flush()?;
    Ok(())
}

/// Read one frame and deserialize it into `T`.
pub fn read_frame<R, T>(reader: &mut BufReader<R>) -> Result<T, FrameError>
where
    R: Read,
    T: Archive,
    T::Archived: for<'a> CheckBytes<DefaultValidator<'a>> + Deserialize<T, Infallible>,
{
    let mut len_buf = [0u8; 4];
    match reader.read_exact(&mut len_buf) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
            return Err(FrameError::EndOfStream);
        }
        Err(e) => return Err(FrameError::Io(e)),
    }

    let len = u32::from_le_bytes(len_buf) as usize;
    if len > MAX_FRAME_SIZE {
        return Err(FrameError::TooLarge {
            size: len,
            max: MAX_FRAME_SIZE,
        });
    }
    if len == 0 {
        return Err(FrameError::Empty);
    }

    // rkyv needs an aligned buffer to validate against.
    let mut buf = rkyv::AlignedVec::with_capacity(len);
    buf.resize(len, 0);
    reader.read_exact(&mut buf)?;

    let archived = rkyv::check_archived_root::<T>(&buf)
        .map_err(|e| FrameError::Deserialize(e.to_string()))?;
    let value: T = archived
        .deserialize(&mut Infallible)
        .expect("infallible deserialization");
    Ok(value)
}

/// Owning wrapper that writes framed messages to a stream.
pub struct FrameWriter<W: Write> {
    writer: BufWriter<W>,
}

impl<W: Write> FrameWriter<W> {
    /// Wrap a raw writer.
    pub fn new(writer: W) -> Self {
        Self {
            writer: BufWriter::with_capacity(BUF_CAPACITY, writer),
        }
    }

    /// Write one framed message.
    pub fn send<T>(&mut self, message: &T) -> Result<(), FrameError>
    where
        T: Serialize<AllocSerializer<256>>,
    {
        write_frame(&mut self.writer, message)
    }
}

/// Owning wrapper that reads framed messages from a stream.
pub struct FrameReader<R: Read> {
    reader: BufReader<R>,
}

impl<R: Read> FrameReader<R> {
    /// Wrap a raw reader.
    pub fn new(reader: R) -> Self {
        Self {
            reader: BufReader::with_capacity(BUF_CAPACITY, reader),
        }
    }

    /// Read one framed message.
    pub fn recv<T>(&mut self) -> Result<T, FrameError>
    where
        T: Archive,
        T::Archived: for<'a> CheckBytes<DefaultValidator<'a>> + Deserialize<T, Infallible>,
    {
        read_frame(&mut self.reader)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{WorkItem, WorkerMessage};
    use std::io::Cursor;

    #[test]
    fn roundtrip_work_item() {
        let mut buffer = Vec::new();
        {
            let mut writer = FrameWriter::new(&mut buffer);
            writer
                .send(&WorkItem::Segment {
                    start: 500,
                    end: 1000,
                })
                .unwrap();
        }

        let mut reader = FrameReader::new(Cursor::new(buffer));
        let decoded: WorkItem = reader.recv().unwrap();
        assert_eq!(
            decoded,
            WorkItem::Segment {
                start: 500,
                end: 1000
            }
        );
    }

    #[test]
    fn frames_preserve_order() {
        let messages = vec![
            WorkerMessage::Hello {
                protocol_version: 1,
            },
            WorkerMessage::Ready,
            WorkerMessage::Partial { value: 0.25 },
        ];

        let mut buffer = Vec::new();
        {
            let mut writer = FrameWriter::new(&mut buffer);
            for msg in &messages {
                writer.send(msg).unwrap();
            }
        }

        let mut reader = FrameReader::new(Cursor::new(buffer));
        assert!(matches!(
            reader.recv::<WorkerMessage>().unwrap(),
            WorkerMessage::Hello {
                protocol_version: 1
            }
        ));
        assert!(matches!(
            reader.recv::<WorkerMessage>().unwrap(),
            WorkerMessage::Ready
        ));
        match reader.recv::<WorkerMessage>().unwrap() {
            WorkerMessage::Partial { value } => assert_eq!(value, 0.25),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn empty_stream_is_end_of_stream() {
        let mut reader = FrameReader::new(Cursor::new(Vec::new()));
        let result: Result<WorkItem, _> = reader.recv();
        assert!(matches!(result, Err(FrameError::EndOfStream)));
    }

    #[test]
    fn oversized_prefix_is_rejected() {
        let mut buffer = Vec::new();
        buffer.extend_from_slice(&(u32::MAX).to_le_bytes());
        let mut reader = FrameReader::new(Cursor::new(buffer));
        let result: Result<WorkItem, _> = reader.recv();
        assert!(matches!(result, Err(FrameError::TooLarge { .. })));
    }
}
