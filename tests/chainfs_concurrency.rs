//! ChainFS Concurrency Tests
//!
//! Several threads share one mounted instance: creating and deleting
//! disjoint names, hammering one node with readers and a writer, and racing
//! growth against a nearly full store.

use std::sync::Arc;
use std::thread;

use chainfs::{ChainFs, FsConfig, FsError, MountFlags};

const THREADS: usize = 8;

fn mount(block_count: usize) -> Arc<ChainFs> {
    let config = FsConfig::default().with_block_count(block_count);
    Arc::new(ChainFs::new(config, MountFlags::empty()).unwrap())
}

#[test]
fn test_parallel_create_write_delete() {
    let fs = mount(4096);
    let before = fs.free_blocks();

    let workers: Vec<_> = (0..THREADS)
        .map(|t| {
            let fs = fs.clone();
            thread::spawn(move || {
                for round in 0..20 {
                    let name = format!("t{}-{}", t, round);
                    let file = fs.mknod(&name, 0, 0, 0).unwrap();
                    let data = vec![(t * 31 + round) as u8; 5000 + round * 100];
                    fs.write(&file, 0, &data).unwrap();
                    assert_eq!(fs.read(&file, 0, data.len()).unwrap(), data);
                    if round % 2 == 0 {
                        fs.delete(&name).unwrap();
                    }
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().unwrap();
    }

    // odd rounds survive: 10 per thread
    assert_eq!(fs.list().len(), 2 + THREADS * 10);
    for t in 0..THREADS {
        for round in (1..20).step_by(2) {
            fs.delete(&format!("t{}-{}", t, round)).unwrap();
        }
    }
    assert_eq!(fs.free_blocks(), before);
}

#[test]
fn test_readers_never_see_torn_blocks() {
    let fs = mount(256);
    let file = fs.mknod("shared", 0, 0, 0).unwrap();
    let len = 3 * 4088;
    fs.write(&file, 0, &vec![0u8; len]).unwrap();

    let writer = {
        let fs = fs.clone();
        let file = file.clone();
        thread::spawn(move || {
            for fill in 1..=50u8 {
                fs.write(&file, 0, &vec![fill; len]).unwrap();
            }
        })
    };
    let readers: Vec<_> = (0..THREADS)
        .map(|_| {
            let fs = fs.clone();
            let file = file.clone();
            thread::spawn(move || {
                for _ in 0..50 {
                    let data = fs.read(&file, 0, len).unwrap();
                    assert_eq!(data.len(), len);
                    // each write replaces the whole range under the node lock
                    assert!(data.iter().all(|&b| b == data[0]));
                }
            })
        })
        .collect();

    writer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(fs.read(&file, 0, 1).unwrap(), [50u8]);
}

#[test]
fn test_racing_growth_respects_capacity() {
    // 8 records + 16 content blocks
    let fs = mount(24);
    let files: Vec<_> = (0..THREADS)
        .map(|t| fs.mknod(&format!("f{}", t), 0, 0, 0).unwrap())
        .collect();

    let workers: Vec<_> = files
        .into_iter()
        .map(|file| {
            let fs = fs.clone();
            thread::spawn(move || {
                // three blocks each: only some of the writers can fit
                match fs.write(&file, 0, &vec![1u8; 3 * 4088]) {
                    Ok(n) => {
                        assert_eq!(n, 3 * 4088);
                        true
                    }
                    Err(e) => {
                        assert_eq!(e, FsError::Exhausted);
                        assert_eq!(fs.chain_blocks(&file), 0);
                        false
                    }
                }
            })
        })
        .collect();

    let succeeded = workers
        .into_iter()
        .map(|w| w.join().unwrap())
        .filter(|&ok| ok)
        .count();
    assert_eq!(succeeded, 5);
    assert_eq!(fs.free_blocks(), 1);
}

#[test]
fn test_delete_races_with_writer() {
    let fs = mount(512);
    for _ in 0..20 {
        let file = fs.mknod("victim", 0, 0, 0).unwrap();
        let writer = {
            let fs = fs.clone();
            let file = file.clone();
            thread::spawn(move || {
                let mut offset = 0u64;
                for _ in 0..20 {
                    match fs.write(&file, offset, &[7u8; 1000]) {
                        Ok(n) => offset += n as u64,
                        Err(e) => {
                            assert_eq!(e, FsError::NotFound);
                            break;
                        }
                    }
                }
            })
        };
        fs.delete("victim").unwrap();
        writer.join().unwrap();
        assert_eq!(fs.used_blocks(), 0);
    }
}
