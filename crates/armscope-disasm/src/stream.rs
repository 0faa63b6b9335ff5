//! Streaming disassembly over a byte source.
//!
//! Each stream owns its source on a producer thread and hands results to
//! the consumer over a rendezvous channel, so at most one record is in
//! flight. Dropping a stream raises its cancellation flag, drops the
//! receiver and joins the producer.

use std::io::{self, Read, Seek, SeekFrom};
use std::iter::FusedIterator;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use armscope_core::{annotate, Instruction};

use crate::options::{address_for, ImmediateFormat, Options};
use crate::{decode, render, DisasmError};

/// One streamed word.
#[derive(Debug)]
pub struct Record {
    /// `<addr>:  <bytes>\t<asm>`, `<unknown>` in place of the assembly, or
    /// `<addr>:  <read error>` when the source failed.
    pub text: String,
    /// Register and control-flow summary; empty unless fully decoded.
    pub annotation: String,
    /// Present on success and when only rendering failed.
    pub instruction: Option<Instruction>,
    pub error: Option<DisasmError>,
}

impl Record {
    /// Returns true if the word decoded and rendered.
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Returns true if this record ended its stream.
    pub fn is_fatal(&self) -> bool {
        self.error.as_ref().is_some_and(DisasmError::is_fatal)
    }

    fn unknown(
        address: u64,
        word: u32,
        instruction: Option<Instruction>,
        error: DisasmError,
    ) -> Self {
        Self {
            text: line(address, word, "<unknown>"),
            annotation: String::new(),
            instruction,
            error: Some(error),
        }
    }

    fn read_failure(address: u64, source: io::Error) -> Self {
        Self {
            text: format!("{:#010x}:  <read error>", address),
            annotation: String::new(),
            instruction: None,
            error: Some(DisasmError::Read { address, source }),
        }
    }
}

/// Formats the bytes of `word` in memory order.
pub fn byte_string(word: u32) -> String {
    let [a, b, c, d] = word.to_le_bytes();
    format!("{:02x} {:02x} {:02x} {:02x}", a, b, c, d)
}

fn line(address: u64, word: u32, asm: &str) -> String {
    format!("{:#010x}:  {}\t{}", address, byte_string(word), asm)
}

/// Reads one little-endian word. `Ok(None)` at a clean end of input.
fn read_word<R: Read>(source: &mut R) -> io::Result<Option<u32>> {
    let mut buf = [0u8; 4];
    let mut filled = 0;
    while filled < buf.len() {
        match source.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        }
    }
    match filled {
        0 => Ok(None),
        4 => Ok(Some(u32::from_le_bytes(buf))),
        n => Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("partial instruction word: {} of 4 bytes", n),
        )),
    }
}

// ============================================================================
// Producer plumbing
// ============================================================================

/// Producer half: the sending end plus the cancellation flag.
struct Sink<T> {
    tx: SyncSender<T>,
    cancel: Arc<AtomicBool>,
}

impl<T> Sink<T> {
    fn cancelled(&self) -> bool {
        self.cancel.load(Ordering::Acquire)
    }

    /// Hands one item to the consumer; false once the consumer is gone.
    fn send(&self, item: T) -> bool {
        !self.cancelled() && self.tx.send(item).is_ok()
    }
}

/// Consumer half shared by [`Disassembly`] and [`Instructions`].
struct Producer<T> {
    rx: Option<Receiver<T>>,
    cancel: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl<T: Send + 'static> Producer<T> {
    fn spawn<F>(work: F) -> Self
    where
        F: FnOnce(Sink<T>) + Send + 'static,
    {
        let (tx, rx) = mpsc::sync_channel(0);
        let cancel = Arc::new(AtomicBool::new(false));
        let sink = Sink {
            tx,
            cancel: Arc::clone(&cancel),
        };
        let handle = thread::spawn(move || work(sink));
        Self {
            rx: Some(rx),
            cancel,
            handle: Some(handle),
        }
    }
}

impl<T> Producer<T> {
    fn recv(&mut self) -> Option<T> {
        let item = self.rx.as_ref()?.recv().ok();
        if item.is_none() {
            self.finish();
        }
        item
    }

    fn finish(&mut self) {
        self.cancel.store(true, Ordering::Release);
        // unblocks a producer parked in `send`
        self.rx.take();
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                log::error!("disassembly producer thread panicked");
            }
        }
    }
}

impl<T> Drop for Producer<T> {
    fn drop(&mut self) {
        self.finish();
    }
}

// ============================================================================
// Full disassembly
// ============================================================================

/// Lazy stream of [`Record`]s, one per word.
pub struct Disassembly {
    inner: Producer<Record>,
}

impl Disassembly {
    /// Stops the stream and waits for the producer to exit.
    pub fn cancel(&mut self) {
        self.inner.finish();
    }
}

impl Iterator for Disassembly {
    type Item = Record;

    fn next(&mut self) -> Option<Record> {
        self.inner.recv()
    }
}

impl FusedIterator for Disassembly {}

/// Disassembles `source` from its current position to the end.
///
/// Per-word decode and render failures produce a placeholder record and the
/// stream continues; a read failure produces one final record.
pub fn disassemble<R>(source: R, options: Options) -> Disassembly
where
    R: Read + Seek + Send + 'static,
{
    Disassembly {
        inner: Producer::spawn(move |sink| produce_records(source, options, sink)),
    }
}

fn produce_records<R: Read + Seek>(mut source: R, options: Options, sink: Sink<Record>) {
    let origin = match source.stream_position() {
        Ok(origin) => origin,
        Err(e) => {
            log::error!("failed to query stream position: {}", e);
            sink.send(Record::read_failure(options.address_for(0), e));
            return;
        }
    };
    log::debug!(
        "disassembly started at offset {:#x}, base {:#x}",
        origin,
        options.base_address
    );

    let mut offset = 0u64;
    while !sink.cancelled() {
        let address = options.address_for(offset);
        let word = match read_word(&mut source) {
            Ok(Some(word)) => word,
            Ok(None) => break,
            Err(e) => {
                log::error!(
                    "failed to read instruction at offset {:#x}: {}",
                    origin.wrapping_add(offset),
                    e
                );
                sink.send(Record::read_failure(address, e));
                break;
            }
        };
        offset += 4;

        if !sink.send(record(word, address, options.immediate_format)) {
            break;
        }
    }
    log::debug!("disassembly finished after {} words", offset / 4);
}

fn record(word: u32, address: u64, format: ImmediateFormat) -> Record {
    let insn = match decode(word, address) {
        Ok(insn) => insn,
        Err(e) => {
            let error = DisasmError::from_decode(address, e);
            log::warn!("{}", error);
            return Record::unknown(address, word, None, error);
        }
    };
    match render(&insn, format) {
        Ok(asm) => Record {
            text: line(address, word, &asm),
            annotation: annotate(&insn),
            instruction: Some(insn),
            error: None,
        },
        Err(e) => {
            let error = DisasmError::from_render(address, word, e);
            log::warn!("{}", error);
            Record::unknown(address, word, Some(insn), error)
        }
    }
}

// ============================================================================
// Decode-only stream
// ============================================================================

/// Lazy stream of decoded instructions that stops at the first failure.
pub struct Instructions {
    inner: Producer<Result<Instruction, DisasmError>>,
}

impl Instructions {
    /// Stops the stream and waits for the producer to exit.
    pub fn cancel(&mut self) {
        self.inner.finish();
    }
}

impl Iterator for Instructions {
    type Item = Result<Instruction, DisasmError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.inner.recv()
    }
}

impl FusedIterator for Instructions {}

/// Decodes `source` from its current position without rendering.
///
/// Yields each decoded instruction; the first decode or read failure is
/// yielded once and ends the stream.
pub fn instructions<R>(source: R, base_address: u64) -> Instructions
where
    R: Read + Seek + Send + 'static,
{
    Instructions {
        inner: Producer::spawn(move |sink| produce_instructions(source, base_address, sink)),
    }
}

fn produce_instructions<R: Read>(
    mut source: R,
    base_address: u64,
    sink: Sink<Result<Instruction, DisasmError>>,
) {
    let mut offset = 0u64;
    while !sink.cancelled() {
        let address = address_for(base_address, offset);
        let item = match read_word(&mut source) {
            Ok(Some(word)) => decode(word, address).map_err(|e| DisasmError::from_decode(address, e)),
            Ok(None) => break,
            Err(e) => Err(DisasmError::Read { address, source: e }),
        };
        offset += 4;

        let stop = item.is_err();
        if let Err(e) = &item {
            log::warn!("instruction stream stopped: {}", e);
        }
        if !sink.send(item) || stop {
            break;
        }
    }
    log::debug!("instruction stream finished after {} words", offset / 4);
}

// ============================================================================
// Single shot
// ============================================================================

/// A fully disassembled word.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    pub instruction: Instruction,
    /// Rendered assembly, hex immediates.
    pub text: String,
    pub annotation: String,
}

/// Seeks to `offset`, then decodes, renders and annotates one word as if it
/// were located at `address`.
pub fn disassemble_at<R: Read + Seek>(
    source: &mut R,
    offset: u64,
    address: u64,
) -> Result<Decoded, DisasmError> {
    let position = source
        .seek(SeekFrom::Start(offset))
        .map_err(|e| DisasmError::Seek { offset, source: e })?;
    if position != offset {
        return Err(DisasmError::Seek {
            offset,
            source: io::Error::other(format!("seek landed at {:#x}", position)),
        });
    }

    let word = match read_word(source) {
        Ok(Some(word)) => word,
        Ok(None) => {
            return Err(DisasmError::Read {
                address,
                source: io::Error::new(io::ErrorKind::UnexpectedEof, "no instruction at offset"),
            });
        }
        Err(e) => return Err(DisasmError::Read { address, source: e }),
    };

    let instruction = decode(word, address).map_err(|e| DisasmError::from_decode(address, e))?;
    let text = render(&instruction, ImmediateFormat::Hex)
        .map_err(|e| DisasmError::from_render(address, word, e))?;
    let annotation = annotate(&instruction);

    Ok(Decoded {
        instruction,
        text,
        annotation,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_byte_string() {
        assert_eq!(byte_string(0xD503_201F), "1f 20 03 d5");
    }

    #[test]
    fn test_read_word() {
        let mut cursor = Cursor::new(vec![0x1F, 0x20, 0x03, 0xD5, 0x00]);
        assert_eq!(read_word(&mut cursor).unwrap(), Some(0xD503_201F));
        let err = read_word(&mut cursor).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        assert_eq!(read_word(&mut cursor).unwrap(), None);
    }

    #[test]
    fn test_record_placeholder() {
        let record = record(0x0000_0000, 0x1000, ImmediateFormat::Hex);
        assert_eq!(record.text, "0x00001000:  00 00 00 00\t<unknown>");
        assert!(record.instruction.is_none());
        assert!(matches!(record.error, Some(DisasmError::Undefined { .. })));
    }

    #[test]
    fn test_record_success() {
        let record = record(0xD503_201F, 0x1000, ImmediateFormat::Hex);
        assert_eq!(record.text, "0x00001000:  1f 20 03 d5\tnop");
        assert!(record.is_ok());
        assert!(!record.is_fatal());
    }
}
