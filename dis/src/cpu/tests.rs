use super::*;

#[test]
fn legal_opcode_count() {
    let legal = (0..=255u8).filter(|&b| decode(b).is_legal()).count();
    assert_eq!(legal, 151);
}

#[test]
fn decodes_common_opcodes() {
    assert_eq!(
        decode(0xA9),
        Instruction {
            mnemonic: "LDA",
            mode: Mode::Immediate
        }
    );
    assert_eq!(decode(0x60).mnemonic, "RTS");
    assert_eq!(decode(0x6C).mode, Mode::Indirect);
    assert_eq!(decode(0x96).mode, Mode::ZeroPageY);
    assert_eq!(decode(0x0A).mode, Mode::Accumulator);
    assert_eq!(decode(0xD0).mode, Mode::Relative);
}

#[test]
fn undefined_opcodes_are_illegal() {
    for byte in [0x02, 0x03, 0x1A, 0x80, 0x9E, 0xFF] {
        let ins = decode(byte);
        assert!(!ins.is_legal(), "${byte:02X} should be undefined");
        assert_eq!(ins, Instruction::ILLEGAL);
    }
}

#[test]
fn mode_sizes() {
    assert_eq!(Mode::Implied.size(), 1);
    assert_eq!(Mode::Accumulator.size(), 1);
    assert_eq!(Mode::Immediate.size(), 2);
    assert_eq!(Mode::ZeroPageIndirectY.size(), 2);
    assert_eq!(Mode::Relative.size(), 2);
    assert_eq!(Mode::Absolute.size(), 3);
    assert_eq!(Mode::Indirect.size(), 3);
    assert_eq!(decode(0x20).size(), 3);
}

#[test]
fn no_opcode_is_listed_twice() {
    let mut seen = [false; 256];
    for (name, modes) in OPS {
        for (_, opcode) in *modes {
            assert!(!seen[*opcode as usize], "{name} reuses ${opcode:02X}");
            seen[*opcode as usize] = true;
        }
    }
}
