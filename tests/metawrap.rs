use std::{
    fs::File,
    io::{self, Read, Write},
};

use similar_asserts::assert_eq;

use metawrap::{
    stream::read_to_end, FileStream, MetawrapState, MetawrapStream, ReadOutcome, Stream,
    StreamError, StreamReader,
};

fn tempfile_with(content: &[u8]) -> File {
    let mut file = tempfile::tempfile().unwrap();
    file.write_all(content).unwrap();
    file
}

fn discard(_: &[u8], _: &[u8]) {}

type Pairs = Vec<(String, String)>;

fn push_pair(pairs: &mut Pairs, key: &[u8], value: &[u8]) {
    pairs.push((
        String::from_utf8_lossy(key).into_owned(),
        String::from_utf8_lossy(value).into_owned(),
    ));
}

fn pairs_of(list: &[(&str, &str)]) -> Pairs {
    list.iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

#[test]
fn test_regular_file() {
    let file = tempfile_with(b"Content-Type:text/plain\nX-Id:42\n\nhello, world\n");
    let mut pairs = Pairs::new();
    let mut stream = MetawrapStream::new(
        FileStream::new(file).unwrap().with_chunk_size(5),
        |k: &[u8], v: &[u8]| push_pair(&mut pairs, k, v),
    );

    assert!(stream.get_ref().is_seekable());
    assert!(!stream.is_seekable());
    assert_eq!(stream.stat(true).unwrap(), Some(13));
    assert_eq!(stream.header_len(), Some(33));

    let mut payload = String::new();
    StreamReader::new(&mut stream).read_to_string(&mut payload).unwrap();
    assert_eq!(payload.as_str(), "hello, world\n");

    // rewind within the payload
    stream.seek(7).unwrap();
    let mut tail = Vec::new();
    assert_eq!(read_to_end(&mut stream, &mut tail).unwrap(), ReadOutcome::Eof);
    assert_eq!(tail, b"world\n".to_vec());
    assert_eq!(stream.abs_offset(), 33 + 13);
    drop(stream);

    assert_eq!(
        pairs,
        pairs_of(&[("Content-Type", "text/plain"), ("X-Id", "42")])
    );
}

#[test]
fn test_io_copy_of_payload() {
    let payload: Vec<u8> = (0..100_000u32).map(|i| (i % 251) as u8).collect();
    let mut input = b"Size:100000\n\n".to_vec();
    input.extend_from_slice(&payload);

    let stream = MetawrapStream::new(
        FileStream::new(tempfile_with(&input)).unwrap(),
        discard,
    );
    let mut out = Vec::new();
    io::copy(&mut StreamReader::new(stream), &mut out).unwrap();
    assert_eq!(out, payload);
}

#[test]
fn test_malformed_file_reports_invalid_data() {
    let stream = MetawrapStream::new(
        FileStream::new(tempfile_with(b"nothing to split\n\nbody")).unwrap(),
        |_: &[u8], _: &[u8]| panic!("callback must not run"),
    );
    let mut reader = StreamReader::new(stream);
    let mut buf = Vec::new();
    let err = reader.read_to_end(&mut buf).unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    assert!(buf.is_empty());
    assert_eq!(reader.get_ref().state(), MetawrapState::Failed);
}

#[test]
fn test_truncated_file() {
    let mut stream = MetawrapStream::new(
        FileStream::new(tempfile_with(b"Key:value\nKey2:value2")).unwrap(),
        discard,
    );
    assert!(matches!(
        stream.stat(false),
        Err(StreamError::TruncatedHeader { offset: 21 })
    ));
    let mut buf = [0u8; 8];
    assert!(matches!(
        stream.read_into(&mut buf),
        Err(StreamError::TruncatedHeader { offset: 21 })
    ));
}

#[test]
fn test_nonblocking_pipe_in_pieces() {
    let (reader, writer) = rustix::pipe::pipe().unwrap();
    let mut writer = File::from(writer);
    let mut pairs = Pairs::new();
    let mut stream = MetawrapStream::new(
        FileStream::nonblocking(reader).unwrap(),
        |k: &[u8], v: &[u8]| push_pair(&mut pairs, k, v),
    );
    assert!(!stream.is_blocking());

    let mut payload = Vec::new();
    assert_eq!(read_to_end(&mut stream, &mut payload).unwrap(), ReadOutcome::Pending);
    assert_eq!(stream.stat(false).unwrap(), None);

    for piece in [&b"From:al"[..], b"ice\nSubj", b"ect:hi\n", b"\nBO"] {
        writer.write_all(piece).unwrap();
        assert_eq!(read_to_end(&mut stream, &mut payload).unwrap(), ReadOutcome::Pending);
    }
    assert_eq!(stream.state(), MetawrapState::PassThrough);
    assert_eq!(payload, b"BO".to_vec());

    writer.write_all(b"DY").unwrap();
    drop(writer);
    assert_eq!(read_to_end(&mut stream, &mut payload).unwrap(), ReadOutcome::Eof);
    assert_eq!(payload, b"BODY".to_vec());

    // pipes have no size, but the header is known
    assert_eq!(stream.stat(true).unwrap(), None);
    assert_eq!(stream.header_len(), Some(23));
    drop(stream);

    assert_eq!(pairs, pairs_of(&[("From", "alice"), ("Subject", "hi")]));
}

#[test]
fn test_nonblocking_reader_would_block() {
    let (reader, writer) = rustix::pipe::pipe().unwrap();
    let mut writer = File::from(writer);
    let stream = MetawrapStream::new(FileStream::nonblocking(reader).unwrap(), discard);
    let mut reader = StreamReader::new(stream);
    let mut buf = [0u8; 16];

    writer.write_all(b"a:b\n").unwrap();
    let err = reader.read(&mut buf).unwrap_err();
    assert_eq!(err.kind(), io::ErrorKind::WouldBlock);

    writer.write_all(b"\nxyz").unwrap();
    assert_eq!(reader.read(&mut buf).unwrap(), 3);
    assert_eq!(&buf[..3], &b"xyz"[..]);
}

#[test]
fn test_boxed_parent() {
    let parent: Box<dyn Stream> =
        Box::new(FileStream::new(tempfile_with(b"k:v\n\nboxed")).unwrap());
    let mut stream = MetawrapStream::new(parent, discard);
    let mut out = Vec::new();
    read_to_end(&mut stream, &mut out).unwrap();
    assert_eq!(out, b"boxed".to_vec());
}
