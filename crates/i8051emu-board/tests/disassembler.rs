use i8051emu_board::{Dsm51Disassembler, ImageFormat};
use i8051emu_core::{DisassembleError, Disassembler};
use proptest::prelude::*;

const DISPLAY_DEMO: &[u8] = b":03000000020100FA\n:10010000AE00783879307420F37400F2C29674200F\n:00000001FF\n";

#[test]
fn display_demo_listing() {
    let rows = Dsm51Disassembler::default().disassemble(DISPLAY_DEMO).unwrap();
    let listing: Vec<_> = rows
        .iter()
        .map(|row| (row.address, row.bytes.clone(), row.mnemonic.as_str()))
        .collect();
    assert_eq!(
        listing,
        vec![
            (0x000, vec![0x02, 0x01, 0x00], "LJMP 100h"),
            (0x100, vec![0xAE, 0x00], "MOV R6, 0h"),
            (0x102, vec![0x78, 0x38], "MOV R0, #56"),
            (0x104, vec![0x79, 0x30], "MOV R1, #48"),
            (0x106, vec![0x74, 0x20], "MOV A, #32"),
            (0x108, vec![0xF3], "MOVX @R1, A"),
            (0x109, vec![0x74, 0x00], "MOV A, #0"),
            (0x10B, vec![0xF2], "MOVX @R0, A"),
            (0x10C, vec![0xC2, 0x96], "CLR 96h"),
            (0x10E, vec![0x74, 0x20], "MOV A, #32"),
        ]
    );
}

#[test]
fn binary_images_load_at_zero() {
    let rows = Dsm51Disassembler::new(ImageFormat::Binary)
        .disassemble(&[0x80, 0xFE, 0xD5, 0x07, 0xFD])
        .unwrap();
    let listing: Vec<_> = rows.iter().map(|r| (r.address, r.mnemonic.as_str())).collect();
    assert_eq!(listing, vec![(0, "SJMP 0h"), (2, "DJNZ 7h, 2h")]);
}

#[test]
fn reserved_opcode_is_listed_as_data() {
    let rows = Dsm51Disassembler::new(ImageFormat::Binary)
        .disassemble(&[0xA5, 0x00])
        .unwrap();
    assert_eq!(rows[0].mnemonic, "DB A5h");
    assert_eq!(rows[1].mnemonic, "NOP");
}

#[test]
fn hex_errors_are_reported() {
    let disasm = Dsm51Disassembler::new(ImageFormat::IntelHex);
    assert_eq!(disasm.disassemble(b""), Err(DisassembleError::Empty));
    let Err(DisassembleError::Image(message)) = disasm.disassemble(b":0300000002010\n") else {
        panic!("truncated record accepted");
    };
    assert!(message.contains("line 1"), "{message}");
}

proptest! {
    #[test]
    fn rows_tile_the_image(bytes in proptest::collection::vec(any::<u8>(), 1..256)) {
        let rows = Dsm51Disassembler::new(ImageFormat::Binary).disassemble(&bytes).unwrap();
        let mut next = 0usize;
        for row in &rows {
            prop_assert_eq!(row.address as usize, next);
            prop_assert!(!row.bytes.is_empty());
            prop_assert_eq!(&row.bytes[..], &bytes[next..next + row.bytes.len()]);
            next += row.bytes.len();
        }
        prop_assert_eq!(next, bytes.len());
    }
}
