use std::time::Duration;

use super::*;
use crate::symbols::Symbols;

fn queue(body: &[u8]) -> FormatQueue {
    let mut data = vec![0x00, 0x08];
    data.extend_from_slice(body);
    let mut listing = Listing::new(Symbols::new());
    listing.load(data, false, 0).unwrap();
    FormatQueue::new(
        listing,
        QueueConfig {
            slice_size: 5,
            slice_yield: Duration::from_millis(1),
            poll_interval: Duration::from_millis(1),
        },
    )
}

fn byte_at(address: u16) -> FormatRequest {
    FormatRequest {
        address,
        format: Format::Byte,
    }
}

#[test]
fn slices_take_the_remainder_first() {
    let queue = queue(&[0xEA; 8]);
    queue.enqueue_all((0x0800..0x0807).map(byte_at));
    let mut engine = queue.lock();
    assert_eq!(engine.drain_slice(5), 2);
    assert_eq!(engine.pending(), 5);
    assert_eq!(engine.drain_slice(5), 5);
    assert_eq!(engine.pending(), 0);
    assert_eq!(engine.drain_slice(5), 0);
    assert_eq!(engine.listing().lines()[0].operand, ".BYTE $EA");
    assert_eq!(engine.listing().lines()[6].operand, ".BYTE $EA");
    assert_eq!(engine.listing().lines()[7].operand, "NOP");
}

#[test]
fn even_queues_drain_in_one_slice() {
    let queue = queue(&[0xEA; 10]);
    queue.enqueue_all((0x0800..0x080A).map(byte_at));
    let mut engine = queue.lock();
    assert_eq!(engine.drain_slice(5), 10);
    assert_eq!(engine.pending(), 0);
    assert!(engine
        .listing()
        .lines()
        .iter()
        .all(|line| line.operand == ".BYTE $EA"));
}

#[test]
fn requests_off_line_starts_become_faults() {
    let queue = queue(&[0xA9, 0x01, 0x60]);
    queue.enqueue(byte_at(0x0801));
    queue.enqueue(byte_at(0x0802));
    queue.flush();

    let faults = queue.take_faults();
    assert_eq!(faults.len(), 1);
    assert!(matches!(faults[0], DisasmError::UnknownAddress(0x0801)));
    assert!(queue.take_faults().is_empty());

    let engine = queue.lock();
    assert_eq!(engine.listing().lines()[1].operand, ".BYTE $60");
}

#[test]
fn requests_apply_in_order() {
    let queue = queue(&[0xA9, 0x01, 0x60]);
    queue.enqueue(byte_at(0x0800));
    queue.enqueue(FormatRequest {
        address: 0x0800,
        format: Format::Text(3),
    });
    queue.flush();
    let engine = queue.lock();
    let operands = engine
        .listing()
        .lines()
        .iter()
        .map(|line| line.operand.as_str())
        .collect::<Vec<_>>();
    assert_eq!(operands, vec![".TEXT $A9,$01,\"`\""]);
}

#[test]
fn worker_lifecycle() {
    let mut queue = queue(&[0xA9, 0x01, 0xA9, 0x02, 0x60]);
    assert_eq!(queue.state(), QueueState::Stopped);

    queue.pause();
    assert_eq!(queue.state(), QueueState::Paused);
    queue.enqueue(byte_at(0x0800));
    thread::sleep(Duration::from_millis(20));
    assert_eq!(queue.pending(), 1);

    queue.start();
    assert_eq!(queue.state(), QueueState::Running);
    queue.flush();
    let requests = queue.lock().listing().plan_selection(&[2, 3], Format::Word);
    queue.enqueue_all(requests);
    queue.flush();
    assert_eq!(queue.pending(), 0);
    {
        let engine = queue.lock();
        let operands = engine
            .listing()
            .lines()
            .iter()
            .map(|line| line.operand.as_str())
            .collect::<Vec<_>>();
        assert_eq!(operands, vec![".BYTE $A9", ".BYTE $01", ".WORD $02A9", ".BYTE $60"]);
    }

    queue.stop();
    assert_eq!(queue.state(), QueueState::Stopped);
    assert!(queue.take_faults().is_empty());
}
