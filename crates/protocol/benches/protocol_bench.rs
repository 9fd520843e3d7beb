use bytes::{Bytes, BytesMut};
use criterion::{Criterion, black_box, criterion_group, criterion_main};
use std::io::Cursor;

use memdb_protocol::{Frame, Request, Response, decode_line};

fn bench_parse_request_line(c: &mut Criterion) {
    c.bench_function("parse_request_line", |b| {
        b.iter(|| Request::parse(black_box("SETX session abcdef 3600000")))
    });
}

fn bench_decode_line(c: &mut Criterion) {
    let data = b"LPUSH queue job-1 job-2 job-3\r\nGET queue\r\n".to_vec();

    c.bench_function("decode_line", |b| {
        b.iter(|| decode_line(black_box(&data)).unwrap())
    });
}

fn bench_parse_bulk_1kb(c: &mut Criterion) {
    let data = vec![b'x'; 1024];
    let frame = Frame::Bulk(Bytes::from(data));
    let mut buf = BytesMut::new();
    frame.encode(&mut buf);
    let encoded = buf.freeze();

    c.bench_function("parse_bulk_1kb", |b| {
        b.iter(|| {
            let mut cursor = Cursor::new(black_box(encoded.as_ref()));
            Frame::parse(&mut cursor).unwrap()
        })
    });
}

fn bench_encode_bulk_1kb(c: &mut Criterion) {
    let data = vec![b'x'; 1024];
    let frame = Frame::Bulk(Bytes::from(data));

    c.bench_function("encode_bulk_1kb", |b| {
        b.iter(|| {
            let mut buf = BytesMut::with_capacity(2048);
            black_box(&frame).encode(&mut buf);
            buf
        })
    });
}

fn bench_roundtrip_response(c: &mut Criterion) {
    let resp = Response::fail("WRONGTYPE Operation against a key holding the wrong kind of value");

    c.bench_function("roundtrip_error_response", |b| {
        b.iter(|| {
            let mut buf = BytesMut::with_capacity(128);
            black_box(&resp).to_frame().encode(&mut buf);
            let data = buf.freeze();
            let mut cursor = Cursor::new(data.as_ref());
            Response::from_frame(Frame::parse(&mut cursor).unwrap()).unwrap()
        })
    });
}

criterion_group!(
    benches,
    bench_parse_request_line,
    bench_decode_line,
    bench_parse_bulk_1kb,
    bench_encode_bulk_1kb,
    bench_roundtrip_response,
);
criterion_main!(benches);
