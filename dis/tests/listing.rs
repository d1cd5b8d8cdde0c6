use std::time::Duration;

use dis6502::{Format, FormatQueue, Listing, QueueConfig, Symbols};
use pretty_assertions::assert_eq;

// Prints "HELLO" through CHROUT:
//   LDX #$00
//   LDA $080F,X
//   BEQ to the RTS
//   JSR CHROUT
//   INX
//   BNE back to the LDA
//   RTS
//   "HELLO",0
const HELLO: &[u8] = &[
    0x01, 0x08, 0xA2, 0x00, 0xBD, 0x0F, 0x08, 0xF0, 0x06, 0x20, 0xD2, 0xFF, 0xE8, 0xD0, 0xF5,
    0x60, 0x48, 0x45, 0x4C, 0x4C, 0x4F, 0x00,
];

fn queue() -> FormatQueue {
    let mut listing = Listing::new(Symbols::c64());
    listing.load(HELLO.to_vec(), false, 0).unwrap();
    FormatQueue::new(
        listing,
        QueueConfig {
            slice_size: 5,
            slice_yield: Duration::from_millis(1),
            poll_interval: Duration::from_millis(1),
        },
    )
}

fn source(listing: &Listing) -> String {
    let mut out = Vec::new();
    listing.write_source(&mut out, "hello.prg").unwrap();
    String::from_utf8(out).unwrap()
}

#[test]
fn hello_world_through_the_worker() {
    let mut queue = queue();
    {
        let engine = queue.lock();
        let listing = engine.listing();
        assert_eq!(listing.load_address(), 0x0801);
        assert_eq!(listing.len(), 10);
        assert_eq!(listing.lines()[1].operand, "LDA L_0007,X");
        assert_eq!(listing.lines()[7].operand, "PHA");
    }

    queue.start();
    let requests = {
        let engine = queue.lock();
        let listing = engine.listing();
        let first = listing.row_of(0x080F).unwrap();
        let rows = (first..listing.len()).collect::<Vec<_>>();
        listing.plan_selection(&rows, Format::Text(1))
    };
    queue.enqueue_all(requests);
    queue.flush();
    queue.stop();
    assert!(queue.take_faults().is_empty());

    let engine = queue.lock();
    let listing = engine.listing();
    let operands = listing
        .lines()
        .iter()
        .map(|line| line.operand.as_str())
        .collect::<Vec<_>>();
    assert_eq!(
        operands,
        vec![
            "LDX #$00",
            "LDA L_0007,X",
            "BEQ L_0006",
            "JSR CHROUT",
            "INX",
            "BNE L_0001",
            "RTS",
            ".TEXT \"HELLO\",$00",
        ]
    );
    let labels = listing
        .lines()
        .iter()
        .map(|line| line.label.as_str())
        .collect::<Vec<_>>();
    assert_eq!(labels, vec!["", "L_0001", "", "", "", "", "L_0006", "L_0007"]);
    assert_eq!(
        listing.external_symbols(),
        &[
            "          CHROUT = $FFD2".to_string(),
            String::new(),
            "          .ORG $0801".to_string(),
        ]
    );
    assert!(listing.validate().is_ok());
}

#[test]
fn exported_source_survives_a_snapshot() {
    let queue = queue();
    queue.enqueue(dis6502::FormatRequest {
        address: 0x080F,
        format: Format::Text(6),
    });
    queue.flush();

    let engine = queue.lock();
    let listing = engine.listing();
    let snapshot = listing.snapshot();
    let mut restored = Listing::new(Symbols::c64());
    restored.restore(snapshot).unwrap();

    let text = source(listing);
    assert_eq!(source(&restored), text);
    assert!(text.starts_with("; File created from hello.prg by dis6502\n\n          CHROUT = $FFD2\n"));
    assert!(text.contains(".TEXT \"HELLO\",$00"));
}
