use std::collections::VecDeque;
use std::sync::Arc;

use hdfile::*;
use rand::Rng;

fn memory_fs() -> (Arc<MemoryClient>, FileSystem) {
    let client = Arc::new(MemoryClient::new());
    let fs = FileSystem::new(client.clone());
    (client, fs)
}

fn sample(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 31 % 251) as u8).collect()
}

#[test]
fn hello_world_example() -> Result<()> {
    let (_client, fs) = memory_fs();
    let mut f = fs.create("/tmp/t1")?;
    assert_eq!(f.write(b"hello world")?, 11);
    f.close()?;

    let mut f = fs.open("/tmp/t1")?;
    assert_eq!(f.available()?, 11);
    assert_eq!(f.pread(6, 5)?, b"world".to_vec());
    f.seek(0)?;
    assert_eq!(f.tell()?, 0);
    f.close()?;
    Ok(())
}

#[test]
fn read_matches_pread_at_previous_cursor() -> Result<()> {
    let (client, fs) = memory_fs();
    let data = sample(4096);
    client.insert("/data", data.clone());
    let mut f = fs.open("/data")?;

    let mut rng = rand::thread_rng();
    for _ in 0..200 {
        let pos = rng.gen_range(0, data.len() as u64 + 1);
        let len = rng.gen_range(0, 600);
        f.seek(pos)?;
        assert_eq!(f.tell()?, pos);

        let got = f.read(len)?;
        assert!(got.len() <= len);
        assert_eq!(got, f.pread(pos, len)?);
        assert_eq!(f.tell()?, pos + got.len() as u64);
    }
    Ok(())
}

#[test]
fn pread_does_not_move_cursor() -> Result<()> {
    let (client, fs) = memory_fs();
    client.insert("/data", sample(100));
    let mut f = fs.open("/data")?;
    f.seek(42)?;
    let _ = f.pread(0, 10)?;
    let _ = f.pread(90, 50)?;
    let _ = f.pread(500, 1)?;
    assert_eq!(f.tell()?, 42);
    Ok(())
}

#[test]
fn short_read_at_end_is_not_an_error() -> Result<()> {
    let (client, fs) = memory_fs();
    client.insert("/data", sample(10));
    let mut f = fs.open("/data")?;
    f.seek(7)?;
    assert_eq!(f.read(100)?.len(), 3);
    assert_eq!(f.read(100)?, Vec::<u8>::new());
    assert_eq!(f.available()?, 0);
    Ok(())
}

#[test]
fn read_chunk_matches_read() -> Result<()> {
    let (client, fs) = memory_fs();
    let data = sample(1000);
    client.insert("/data", data.clone());
    let mut chunked = fs.open("/data")?;
    let mut plain = fs.open("/data")?;

    for &cap in &[0usize, 1, 17, 256, 4096] {
        let mut buf = vec![0u8; cap];
        let n = chunked.read_chunk(&mut buf)?;
        assert!(n <= cap);
        assert_eq!(&buf[..n], plain.read(cap)?.as_slice());
    }
    Ok(())
}

#[test]
fn pread_chunk_into_array() -> Result<()> {
    let (client, fs) = memory_fs();
    client.insert("/data", b"0123456789".to_vec());
    let f = fs.open("/data")?;
    let mut buf = [0u8; 4];
    assert_eq!(f.pread_chunk(3, &mut buf)?, 4);
    assert_eq!(&buf, b"3456");
    assert_eq!(f.pread_chunk(8, &mut buf[..])?, 2);
    assert_eq!(&buf[..2], b"89");
    Ok(())
}

#[test]
fn unusable_buffers_are_rejected_before_the_native_call() -> Result<()> {
    let (client, fs) = memory_fs();
    client.insert("/data", sample(10));
    let mut f = fs.open("/data")?;

    let mut dq = VecDeque::with_capacity(8);
    let cap = dq.capacity();
    dq.extend(std::iter::repeat(0u8).take(cap));
    dq.pop_front();
    dq.push_back(1);

    match f.read_chunk(&mut dq).unwrap_err() {
        Error::Buffer { op, path } => {
            assert_eq!(op, FileOp::Read);
            assert_eq!(path, "/data");
        }
        e => panic!("Expected Error::Buffer, got {:?}", e),
    }
    let data = [1u8, 2, 3];
    assert!(matches!(
        f.pread_chunk(0, &mut ReadOnly(&data)),
        Err(Error::Buffer { .. })
    ));
    assert_eq!(f.tell()?, 0);

    let mut w = fs.create("/out")?;
    assert!(matches!(w.write_chunk(&dq), Err(Error::Buffer { op: FileOp::Write, .. })));
    assert_eq!(w.write_chunk(&ReadOnly(&data))?, 3);
    w.close()?;
    assert_eq!(client.contents("/out").unwrap(), data.to_vec());
    Ok(())
}

#[test]
fn append_extends_existing_file() -> Result<()> {
    let (client, fs) = memory_fs();
    let mut f = fs.create("/log")?;
    f.write(b"first;")?;
    assert!(matches!(fs.append("/log"), Err(Error::Open { .. })));
    f.close()?;

    let mut f = fs.append("/log")?;
    assert_eq!(f.tell()?, 6);
    f.write_chunk(&b"second;".to_vec())?;
    f.flush()?;
    f.close()?;
    assert_eq!(client.contents("/log").unwrap(), b"first;second;".to_vec());
    Ok(())
}

#[test]
fn write_stream_rejects_seek() -> Result<()> {
    let (_client, fs) = memory_fs();
    let mut f = fs.create("/w")?;
    f.write(b"abc")?;
    match f.seek(0).unwrap_err() {
        Error::Failure { op, path, .. } => {
            assert_eq!(op, FileOp::Seek);
            assert_eq!(path, "/w");
        }
        e => panic!("Expected Error::Failure, got {:?}", e),
    }
    Ok(())
}

#[test]
fn double_close_never_fails() -> Result<()> {
    let (client, fs) = memory_fs();
    let mut f = fs.create("/c")?;
    f.close()?;
    f.close()?;

    let mut f = fs.open("/c")?;
    client.inject_failure(FileOp::Close);
    assert!(f.close().is_err());
    f.close()?;
    assert_eq!(client.open_sessions(), 0);
    Ok(())
}

#[test]
fn dropped_handles_release_their_sessions() -> Result<()> {
    let (client, fs) = memory_fs();
    {
        let mut f = fs.create("/d")?;
        f.write(b"x")?;
        let _g = fs.open("/d")?;
        assert_eq!(client.open_sessions(), 2);
    }
    assert_eq!(client.open_sessions(), 0);
    // The writer lease went away with the dropped handle.
    let _f = fs.append("/d")?;
    Ok(())
}

#[test]
fn concurrent_positional_reads() -> Result<()> {
    let (client, fs) = memory_fs();
    let data = sample(64 * 1024);
    client.insert("/big", data.clone());
    let f = fs.open("/big")?;

    std::thread::scope(|scope| {
        for t in 0..8usize {
            let f = &f;
            let data = &data;
            scope.spawn(move || {
                for i in 0..64usize {
                    let pos = (t * 8 * 1024 + i * 128) % data.len();
                    let got = f.pread(pos as u64, 128).unwrap();
                    assert_eq!(got.as_slice(), &data[pos..pos + 128]);
                }
            });
        }
    });
    Ok(())
}

#[test]
fn std_io_traits_round_trip() -> std::io::Result<()> {
    use std::io::{Read, Seek, SeekFrom, Write};

    let (_client, fs) = memory_fs();
    let mut f = fs.create("/io")?;
    f.write_all(b"line one\nline two\n")?;
    Write::flush(&mut f)?;
    f.close()?;

    let mut f = fs.open("/io")?;
    Seek::seek(&mut f, SeekFrom::Start(9))?;
    let mut rest = String::new();
    f.read_to_string(&mut rest)?;
    assert_eq!(rest, "line two\n");
    Ok(())
}

#[test]
fn local_backend_round_trip() -> Result<()> {
    let dir = tempfile::tempdir().unwrap();
    let fs = FileSystem::new(Arc::new(LocalClient::new(dir.path()).unwrap()));
    let data = sample(10_000);

    let mut f = fs.create("/tmp/round")?;
    let mut written = 0;
    while written < data.len() {
        written += f.write(&data[written..])?;
    }
    f.close()?;

    let mut f = fs.open("/tmp/round")?;
    assert_eq!(f.available()?, data.len());
    assert_eq!(f.read(data.len())?, data);
    assert_eq!(f.pread(9_990, 100)?, data[9_990..].to_vec());
    f.seek(0)?;
    assert_eq!(f.tell()?, 0);
    f.close()?;
    f.close()?;
    Ok(())
}
